use std::collections::HashMap;

use crate::schema::ResourceSchema;
use crate::store::{ActiveFilter, ListSelection, SortDirection};

/// Decodes the raw query string of a list request into a selection.
/// Unknown parameters and unrecognized sort directions are ignored;
/// filter values are taken as-is (format checking is deliberately
/// left to the match itself).
pub fn list_selection(
    schema: &'static ResourceSchema,
    query: &HashMap<String, String>,
) -> ListSelection {
    let sort = query.get("sort").and_then(|value| match value.as_str() {
        "asc" => Some(SortDirection::Ascending),
        "desc" => Some(SortDirection::Descending),
        _ => None,
    });

    let filters = schema
        .filters
        .iter()
        .filter_map(|spec| {
            query.get(spec.param).map(|value| ActiveFilter {
                spec,
                value: value.clone(),
            })
        })
        .collect();

    ListSelection { filters, sort }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::TRACKS;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn picks_up_known_filters_and_sort() {
        let selection = list_selection(
            &TRACKS,
            &query(&[("naam", "zomer"), ("jaar", "2020"), ("sort", "asc")]),
        );

        assert_eq!(selection.sort, Some(SortDirection::Ascending));
        assert_eq!(selection.filters.len(), 2);
    }

    #[test]
    fn ignores_unknown_parameters_and_bad_sort_values() {
        let selection = list_selection(
            &TRACKS,
            &query(&[("onbekend", "x"), ("sort", "sideways")]),
        );

        assert_eq!(selection.sort, None);
        assert!(selection.filters.is_empty());
    }
}
