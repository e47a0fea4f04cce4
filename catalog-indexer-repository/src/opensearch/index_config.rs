//! OpenSearch index settings and mappings.
//!
//! Two indices back the catalog: the documents index, whose mapping is
//! dynamic because flattened metadata aliases vary per repository, and the
//! stored-query index, whose `query` field is a percolator.

use serde_json::{json, Value};

/// Field holding the percolator query in the stored-query index.
pub const PERCOLATOR_FIELD: &str = "query";

/// Settings and mappings for the documents index.
///
/// - `id` and the attachment descriptors are keywords for exact lookups
///   and reconciliation projections.
/// - `extractedText` and `dc_title` are full-text fields.
/// - Flattened `dc_*` aliases are mapped dynamically as text with a keyword
///   sub-field.
pub fn documents_index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "dynamic_templates": [
                {
                    "metadata_aliases": {
                        "match_mapping_type": "string",
                        "match": "dc_*",
                        "mapping": {
                            "type": "text",
                            "fields": { "raw": { "type": "keyword", "ignore_above": 512 } }
                        }
                    }
                }
            ],
            "properties": {
                "id": { "type": "keyword" },
                "uuid": { "type": "keyword" },
                "handle": { "type": "keyword" },
                "name": {
                    "type": "text",
                    "fields": { "raw": { "type": "keyword", "ignore_above": 512 } }
                },
                "lastModified": { "type": "keyword" },
                "extractedText": { "type": "text" },
                "thumbnail": { "type": "keyword", "index": false },
                "metadata": { "type": "object", "enabled": false },
                "bitstreams": {
                    "properties": {
                        "uuid": { "type": "keyword" },
                        "name": { "type": "keyword" },
                        "bundleName": { "type": "keyword" },
                        "mimeType": { "type": "keyword" },
                        "retrieveLink": { "type": "keyword", "index": false },
                        "checkSum": {
                            "properties": {
                                "value": { "type": "keyword" },
                                "checkSumAlgorithm": { "type": "keyword" }
                            }
                        }
                    }
                },
                "tags": {
                    "type": "nested",
                    "properties": {
                        "label": { "type": "keyword" },
                        "uri": { "type": "keyword" },
                        "sourceVocabulary": { "type": "keyword" },
                        "namedGraphReference": { "type": "keyword" }
                    }
                }
            }
        }
    })
}

/// Settings and mappings for the stored-query (percolator) index.
///
/// `title` and `body` mirror the candidate document fields submitted at
/// percolate time; stored queries are written against them.
pub fn stored_queries_index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "properties": {
                PERCOLATOR_FIELD: { "type": "percolator" },
                "title": { "type": "text" },
                "body": { "type": "text" },
                "label": { "type": "keyword" },
                "uri": { "type": "keyword" },
                "sourceVocabulary": { "type": "keyword" },
                "namedGraphReference": { "type": "keyword" }
            }
        }
    })
}
