use serde_json::Value;

/// A single record in a collection: a JSON object carrying an integer
/// `id` unique within its collection.
pub type Record = serde_json::Map<String, Value>;

/// Returns the record's `id` if it is present and integral.
pub fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

/// Allocates the id for a record about to be appended: one past the
/// highest existing id, starting from 1 for an empty collection.
pub fn next_id(records: &[Record]) -> i64 {
    records.iter().filter_map(record_id).max().unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn record_with_id(id: i64) -> Record {
        let mut record = Record::new();
        record.insert("id".to_owned(), json!(id));
        record
    }

    #[test]
    fn first_id_is_one() {
        assert_eq!(next_id(&[]), 1);
    }

    #[test]
    fn ignores_records_without_an_id() {
        let blank = Record::new();
        assert_eq!(next_id(&[blank]), 1);
    }

    proptest! {
        #[test]
        fn allocated_id_exceeds_every_existing_id(ids in proptest::collection::vec(0i64..1_000_000, 0..20)) {
            let records = ids.iter().copied().map(record_with_id).collect::<Vec<_>>();
            let allocated = next_id(&records);

            prop_assert!(ids.iter().all(|&id| allocated > id));
        }
    }
}
