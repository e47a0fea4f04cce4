//! Metadata key flattening.
//!
//! Dotted metadata keys are promoted to top-level search fields by replacing
//! every `.` with `_`. The mapping is total and pure:
//!
//! - one occurrence of a key produces a scalar string value;
//! - repeated occurrences produce an array, in source order;
//! - distinct keys that flatten to the same alias (`dc.title` and `dc_title`)
//!   are treated as repeats of one key.

use serde_json::{Map, Value};

use crate::source_item::MetadataEntry;

/// Flatten a single metadata key into its search-field alias.
pub fn flatten_key(key: &str) -> String {
    key.replace('.', "_")
}

/// Flatten a list of metadata entries into search-field aliases.
pub fn flatten_metadata(entries: &[MetadataEntry]) -> Map<String, Value> {
    let mut fields: Map<String, Value> = Map::new();

    for entry in entries {
        let alias = flatten_key(&entry.key);
        let value = Value::String(entry.value.clone());

        match fields.get_mut(&alias) {
            None => {
                fields.insert(alias, value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_key() {
        assert_eq!(flatten_key("dc.contributor.author"), "dc_contributor_author");
        assert_eq!(flatten_key("dc.title"), "dc_title");
        assert_eq!(flatten_key("plain"), "plain");
    }

    #[test]
    fn test_repeated_key_becomes_array() {
        let entries = vec![
            MetadataEntry::new("dc.contributor.author", "A"),
            MetadataEntry::new("dc.contributor.author", "B"),
        ];

        let fields = flatten_metadata(&entries);

        assert_eq!(fields["dc_contributor_author"], json!(["A", "B"]));
    }

    #[test]
    fn test_single_key_stays_scalar() {
        let entries = vec![MetadataEntry::new("dc.contributor.author", "A")];

        let fields = flatten_metadata(&entries);

        assert_eq!(fields["dc_contributor_author"], json!("A"));
    }

    #[test]
    fn test_three_repeats_keep_order() {
        let entries = vec![
            MetadataEntry::new("dc.subject", "oceans"),
            MetadataEntry::new("dc.title", "Survey"),
            MetadataEntry::new("dc.subject", "fisheries"),
            MetadataEntry::new("dc.subject", "climate"),
        ];

        let fields = flatten_metadata(&entries);

        assert_eq!(fields["dc_subject"], json!(["oceans", "fisheries", "climate"]));
        assert_eq!(fields["dc_title"], json!("Survey"));
    }

    #[test]
    fn test_colliding_aliases_merge() {
        let entries = vec![
            MetadataEntry::new("dc.title", "First"),
            MetadataEntry::new("dc_title", "Second"),
        ];

        let fields = flatten_metadata(&entries);

        assert_eq!(fields.len(), 1);
        assert_eq!(fields["dc_title"], json!(["First", "Second"]));
    }

    #[test]
    fn test_empty_input() {
        assert!(flatten_metadata(&[]).is_empty());
    }
}
