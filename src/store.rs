use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::errors::BackendError;
use crate::persistence::Persistence;
use crate::record::{next_id, record_id, Record};
use crate::schema::{FilterKind, FilterSpec, ResourceSchema};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A filter taken from the query string, bound to its schema entry.
#[derive(Debug)]
pub struct ActiveFilter {
    pub spec: &'static FilterSpec,
    pub value: String,
}

/// What a list read should return: the records satisfying every
/// filter, optionally sorted by the schema's display-name field.
#[derive(Debug, Default)]
pub struct ListSelection {
    pub filters: Vec<ActiveFilter>,
    pub sort: Option<SortDirection>,
}

/// The generic CRUD engine over one collection. Every operation
/// re-reads the backing document through the persistence adapter;
/// there is no cached state across requests.
pub struct ResourceStore {
    schema: &'static ResourceSchema,
    persistence: Arc<dyn Persistence>,
    // warp dispatches handlers across threads, so the load-modify-save
    // cycle of each mutating operation is a critical section
    write_lock: Mutex<()>,
}

impl ResourceStore {
    pub fn new(schema: &'static ResourceSchema, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            schema,
            persistence,
            write_lock: Mutex::new(()),
        }
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        self.schema
    }

    /// Returns the records satisfying every filter in the selection,
    /// in insertion order unless a sort direction is given.
    pub async fn list(&self, selection: &ListSelection) -> Result<Vec<Record>, BackendError> {
        let mut records = self.persistence.load(self.schema.name).await?;

        records.retain(|record| selection.filters.iter().all(|filter| matches(record, filter)));

        if let Some(direction) = selection.sort {
            let field = self.schema.sort_field;

            records.sort_by(|a, b| {
                let ordering = compare_names(field_str(a, field), field_str(b, field));

                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        Ok(records)
    }

    pub async fn get(&self, id: i64) -> Result<Record, BackendError> {
        let records = self.persistence.load(self.schema.name).await?;

        records
            .into_iter()
            .find(|record| record_id(record) == Some(id))
            .ok_or_else(|| BackendError::not_found(id))
    }

    /// Appends a validated body as a new record under a freshly
    /// allocated id and returns it.
    pub async fn create(&self, body: Record) -> Result<Record, BackendError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.persistence.load(self.schema.name).await?;
        let record = self.build_record(next_id(&records), &body);

        records.push(record.clone());
        self.persistence.save(self.schema.name, records).await?;

        Ok(record)
    }

    /// Overwrites every field of the record with the given id from a
    /// validated body. The body's id must restate the path id.
    pub async fn replace(&self, id: i64, body: Record) -> Result<Record, BackendError> {
        if record_id(&body) != Some(id) {
            return Err(BackendError::validation("id in body must match id in path"));
        }

        let _guard = self.write_lock.lock().await;

        let mut records = self.persistence.load(self.schema.name).await?;
        let index = position_of(&records, id).ok_or_else(|| BackendError::not_found(id))?;
        let record = self.build_record(id, &body);

        records[index] = record.clone();
        self.persistence.save(self.schema.name, records).await?;

        Ok(record)
    }

    /// Merges the supplied fields into the record with the given id,
    /// leaving every other field untouched. The id itself is
    /// immutable.
    pub async fn patch(&self, id: i64, body: Record) -> Result<Record, BackendError> {
        if let Some(value) = body.get("id") {
            if value.as_i64() != Some(id) {
                return Err(BackendError::validation("id cannot be changed"));
            }
        }

        let _guard = self.write_lock.lock().await;

        let mut records = self.persistence.load(self.schema.name).await?;
        let index = position_of(&records, id).ok_or_else(|| BackendError::not_found(id))?;

        let mut record = records[index].clone();
        for field in self.schema.fields {
            if let Some(value) = body.get(field.name) {
                record.insert(field.name.to_owned(), value.clone());
            }
        }

        records[index] = record.clone();
        self.persistence.save(self.schema.name, records).await?;

        Ok(record)
    }

    /// Removes and returns the record with the given id. A missing id
    /// never mutates the collection.
    pub async fn delete(&self, id: i64) -> Result<Record, BackendError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.persistence.load(self.schema.name).await?;
        let index = position_of(&records, id).ok_or_else(|| BackendError::not_found(id))?;

        let removed = records.remove(index);
        self.persistence.save(self.schema.name, records).await?;

        Ok(removed)
    }

    // Records are rebuilt from schema fields only, so stray client
    // fields never reach the persisted document.
    fn build_record(&self, id: i64, body: &Record) -> Record {
        let mut record = Record::new();
        record.insert("id".to_owned(), Value::from(id));

        for field in self.schema.fields {
            match body.get(field.name) {
                Some(value) => {
                    record.insert(field.name.to_owned(), value.clone());
                }
                None => {
                    if let Some(default) = field.default {
                        record.insert(field.name.to_owned(), Value::from(default));
                    }
                }
            }
        }

        record
    }
}

fn position_of(records: &[Record], id: i64) -> Option<usize> {
    records
        .iter()
        .position(|record| record_id(record) == Some(id))
}

fn field_str<'a>(record: &'a Record, field: &str) -> &'a str {
    record.get(field).and_then(Value::as_str).unwrap_or("")
}

fn matches(record: &Record, filter: &ActiveFilter) -> bool {
    let spec = filter.spec;
    let value = record.get(spec.field);

    match spec.kind {
        FilterKind::Substring => value
            .and_then(Value::as_str)
            .map(|s| contains_insensitive(s, &filter.value))
            .unwrap_or(false),
        FilterKind::ListSubstring => value
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|s| contains_insensitive(s, &filter.value))
            })
            .unwrap_or(false),
        FilterKind::IntEquals => match filter.value.parse::<i64>() {
            Ok(wanted) => value.and_then(Value::as_i64) == Some(wanted),
            // a non-numeric value matches nothing
            Err(_) => false,
        },
        FilterKind::Equals => value
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase() == filter.value.to_lowercase())
            .unwrap_or(false),
    }
}

fn contains_insensitive(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Compares display names the way a locale-aware collation would:
/// case-insensitive and ignoring diacritics, with the raw strings as
/// the tie-break.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    fold(a).cmp(&fold(b)).then_with(|| a.cmp(b))
}

fn fold(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::persistence::mock::MockPersistence;
    use crate::record::Record;
    use crate::resource::{PLAYLISTS, TRACKS};

    fn body(value: serde_json::Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test body must be an object"),
        }
    }

    fn track_body(naam: &str, jaar: i64, artiest: &str) -> Record {
        body(json!({
            "naam": naam,
            "bpm": 120,
            "duur": 180,
            "jaar": jaar,
            "artiesten": [artiest],
            "genres": ["Pop"],
        }))
    }

    fn tracks_store() -> (Arc<MockPersistence>, ResourceStore) {
        let persistence = Arc::new(MockPersistence::new());
        let store = ResourceStore::new(&TRACKS, persistence.clone());

        (persistence, store)
    }

    #[tokio::test]
    async fn create_allocates_sequential_ids() {
        let (_, store) = tracks_store();

        let first = store
            .create(track_body("Eerste", 2020, "A"))
            .await
            .expect("create first track");
        let second = store
            .create(track_body("Tweede", 2021, "B"))
            .await
            .expect("create second track");

        assert_eq!(record_id(&first), Some(1));
        assert_eq!(record_id(&second), Some(2));
    }

    #[tokio::test]
    async fn create_applies_defaults_for_optional_fields() {
        let (_, store) = tracks_store();

        let created = store
            .create(track_body("Eerste", 2020, "A"))
            .await
            .expect("create track");

        assert_eq!(created.get("spotify_url"), Some(&json!("")));
    }

    #[tokio::test]
    async fn created_record_round_trips_through_get() {
        let (_, store) = tracks_store();

        let created = store
            .create(track_body("Eerste", 2020, "A"))
            .await
            .expect("create track");
        let id = record_id(&created).expect("created record has an id");

        let fetched = store.get(id).await.expect("fetch created track");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn get_of_unknown_id_is_not_found() {
        let (_, store) = tracks_store();

        match store.get(99_999).await {
            Err(BackendError::NotFound { id }) => assert_eq!(id, "99999"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn patch_preserves_untouched_fields() {
        let (_, store) = tracks_store();

        let created = store
            .create(track_body("Eerste", 2020, "A"))
            .await
            .expect("create track");

        let patched = store
            .patch(1, body(json!({ "naam": "Patched Track" })))
            .await
            .expect("patch track");

        assert_eq!(patched.get("naam"), Some(&json!("Patched Track")));

        let mut expected = created;
        expected.insert("naam".to_owned(), json!("Patched Track"));
        assert_eq!(patched, expected);
    }

    #[tokio::test]
    async fn patch_refuses_to_change_the_id() {
        let (persistence, store) = tracks_store();

        store
            .create(track_body("Eerste", 2020, "A"))
            .await
            .expect("create track");

        let result = store.patch(1, body(json!({ "id": 2 }))).await;
        match result {
            Err(BackendError::Validation { message }) => {
                assert_eq!(message, "id cannot be changed");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        assert_eq!(record_id(&persistence.snapshot("tracks")[0]), Some(1));
    }

    #[tokio::test]
    async fn replace_overwrites_every_field() {
        let (_, store) = tracks_store();

        let mut original = track_body("Eerste", 2020, "A");
        original.insert("spotify_url".to_owned(), json!("https://example.com/1"));
        store.create(original).await.expect("create track");

        let mut replacement = track_body("Vervangen", 1999, "B");
        replacement.insert("id".to_owned(), json!(1));

        let replaced = store.replace(1, replacement).await.expect("replace track");

        assert_eq!(replaced.get("naam"), Some(&json!("Vervangen")));
        assert_eq!(replaced.get("jaar"), Some(&json!(1999)));
        // absent optional fields fall back to their defaults
        assert_eq!(replaced.get("spotify_url"), Some(&json!("")));
    }

    #[tokio::test]
    async fn replace_rejects_a_mismatched_body_id() {
        let (_, store) = tracks_store();

        store
            .create(track_body("Eerste", 2020, "A"))
            .await
            .expect("create track");

        let mut replacement = track_body("Vervangen", 1999, "B");
        replacement.insert("id".to_owned(), json!(2));

        match store.replace(1, replacement).await {
            Err(BackendError::Validation { message }) => {
                assert_eq!(message, "id in body must match id in path");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_returns_the_removed_record() {
        let (persistence, store) = tracks_store();

        let created = store
            .create(track_body("Eerste", 2020, "A"))
            .await
            .expect("create track");

        let removed = store.delete(1).await.expect("delete track");
        assert_eq!(removed, created);
        assert!(persistence.snapshot("tracks").is_empty());
    }

    #[tokio::test]
    async fn deleting_a_missing_id_never_mutates_the_collection() {
        let (persistence, store) = tracks_store();

        store
            .create(track_body("Eerste", 2020, "A"))
            .await
            .expect("create track");
        let before = persistence.snapshot("tracks");

        match store.delete(99_999).await {
            Err(BackendError::NotFound { .. }) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }

        assert_eq!(persistence.snapshot("tracks"), before);
    }

    #[tokio::test]
    async fn filters_are_case_insensitive_and_conjunctive() {
        let (_, store) = tracks_store();

        store
            .create(track_body("Zomerhit", 2020, "De Banden"))
            .await
            .expect("create track");
        store
            .create(track_body("Winterlied", 2020, "De Banden"))
            .await
            .expect("create track");
        store
            .create(track_body("Zomerregen", 2021, "Anders"))
            .await
            .expect("create track");

        let selection = ListSelection {
            filters: vec![
                ActiveFilter {
                    spec: &TRACKS.filters[0],
                    value: "ZOMER".to_owned(),
                },
                ActiveFilter {
                    spec: &TRACKS.filters[3],
                    value: "2020".to_owned(),
                },
            ],
            sort: None,
        };

        let records = store.list(&selection).await.expect("list tracks");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("naam"), Some(&json!("Zomerhit")));
    }

    #[tokio::test]
    async fn artist_filter_matches_any_list_element() {
        let (_, store) = tracks_store();

        let mut duo = track_body("Duet", 2020, "Eerste Artiest");
        duo.insert(
            "artiesten".to_owned(),
            json!(["Eerste Artiest", "Tweede Artiest"]),
        );
        store.create(duo).await.expect("create track");
        store
            .create(track_body("Solo", 2020, "Derde"))
            .await
            .expect("create track");

        let selection = ListSelection {
            filters: vec![ActiveFilter {
                spec: &TRACKS.filters[1],
                value: "tweede".to_owned(),
            }],
            sort: None,
        };

        let records = store.list(&selection).await.expect("list tracks");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("naam"), Some(&json!("Duet")));
    }

    #[tokio::test]
    async fn non_numeric_year_filter_matches_nothing() {
        let (_, store) = tracks_store();

        store
            .create(track_body("Eerste", 2020, "A"))
            .await
            .expect("create track");

        let selection = ListSelection {
            filters: vec![ActiveFilter {
                spec: &TRACKS.filters[3],
                value: "vorig jaar".to_owned(),
            }],
            sort: None,
        };

        let records = store.list(&selection).await.expect("list tracks");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn visibility_filter_matches_whole_values() {
        let persistence = Arc::new(MockPersistence::new());
        let store = ResourceStore::new(&PLAYLISTS, persistence);

        store
            .create(body(json!({
                "naam": "Openbaar",
                "beschrijving": "",
                "author": "a",
                "visibility": "public",
            })))
            .await
            .expect("create playlist");
        store
            .create(body(json!({
                "naam": "Geheim",
                "beschrijving": "",
                "author": "a",
                "visibility": "private",
            })))
            .await
            .expect("create playlist");

        let selection = ListSelection {
            filters: vec![ActiveFilter {
                spec: &PLAYLISTS.filters[2],
                value: "Private".to_owned(),
            }],
            sort: None,
        };

        let records = store.list(&selection).await.expect("list playlists");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("naam"), Some(&json!("Geheim")));
    }

    #[tokio::test]
    async fn sorting_folds_case_and_diacritics() {
        let (_, store) = tracks_store();

        for naam in &["Zebra", "Édith", "apfel"] {
            store
                .create(track_body(naam, 2020, "A"))
                .await
                .expect("create track");
        }

        let ascending = store
            .list(&ListSelection {
                filters: vec![],
                sort: Some(SortDirection::Ascending),
            })
            .await
            .expect("list tracks ascending");
        let names = ascending
            .iter()
            .map(|r| r.get("naam").and_then(Value::as_str).unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["apfel", "Édith", "Zebra"]);

        let descending = store
            .list(&ListSelection {
                filters: vec![],
                sort: Some(SortDirection::Descending),
            })
            .await
            .expect("list tracks descending");
        let names = descending
            .iter()
            .map(|r| r.get("naam").and_then(Value::as_str).unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Zebra", "Édith", "apfel"]);
    }

    #[tokio::test]
    async fn unsorted_lists_preserve_insertion_order() {
        let (_, store) = tracks_store();

        for naam in &["Charlie", "Alpha", "Bravo"] {
            store
                .create(track_body(naam, 2020, "A"))
                .await
                .expect("create track");
        }

        let records = store
            .list(&ListSelection::default())
            .await
            .expect("list tracks");
        let names = records
            .iter()
            .map(|r| r.get("naam").and_then(Value::as_str).unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Charlie", "Alpha", "Bravo"]);
    }

    proptest! {
        #[test]
        fn name_comparison_is_antisymmetric(a in ".*", b in ".*") {
            prop_assert_eq!(compare_names(&a, &b), compare_names(&b, &a).reverse());
        }

        #[test]
        fn sorting_by_names_is_monotone(mut names in proptest::collection::vec(".*", 0..12)) {
            names.sort_by(|a, b| compare_names(a, b));

            for pair in names.windows(2) {
                prop_assert_ne!(compare_names(&pair[0], &pair[1]), Ordering::Greater);
            }
        }
    }
}
