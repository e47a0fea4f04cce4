//! OpenSearch request builders and response parsers.
//!
//! Kept free of I/O so request shapes and response handling can be tested
//! without a cluster.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::SearchError;
use crate::opensearch::index_config::PERCOLATOR_FIELD;
use crate::types::{BulkDeleteSummary, PercolateDocument, ScrollHit, ScrollPage, StoredQuery};
use catalog_indexer_shared::TagMatch;

const TAG_FIELDS: &[&str] = &["label", "uri", "sourceVocabulary", "namedGraphReference"];

/// Body for opening a full-index scroll with a `_source` projection.
///
/// Sorting on `_doc` is the cheapest scroll order.
pub fn build_scroll_query(fields: &[&str]) -> Value {
    json!({
        "_source": fields,
        "query": { "match_all": {} },
        "sort": ["_doc"]
    })
}

/// Body for the percolate search against the stored-query index.
pub fn build_percolate_query(document: &PercolateDocument, size: usize) -> Value {
    json!({
        "size": size,
        "_source": TAG_FIELDS,
        "query": {
            "percolate": {
                "field": PERCOLATOR_FIELD,
                "document": {
                    "title": document.title,
                    "body": document.body
                }
            }
        }
    })
}

/// Stored-query document for one vocabulary term.
///
/// The label is matched as a phrase against both candidate fields, so a term
/// tags a document whenever its label occurs verbatim in the title or text.
pub fn build_stored_query_document(query: &StoredQuery) -> Value {
    json!({
        PERCOLATOR_FIELD: {
            "multi_match": {
                "query": query.label,
                "type": "phrase",
                "fields": ["title", "body"]
            }
        },
        "label": query.label,
        "uri": query.uri,
        "sourceVocabulary": query.source_vocabulary,
        "namedGraphReference": query.named_graph
    })
}

/// Query clause selecting every stored query of one named graph.
pub fn build_named_graph_query(named_graph: &str) -> Value {
    json!({ "term": { "namedGraphReference": named_graph } })
}

/// Bulk action lines deleting each id from `index`.
pub fn build_bulk_delete_lines(index: &str, ids: &[Uuid]) -> Vec<Value> {
    ids.iter()
        .map(|id| json!({ "delete": { "_index": index, "_id": id.to_string() } }))
        .collect()
}

/// Bulk action and source lines indexing each stored query into `index`.
pub fn build_bulk_stored_query_lines(index: &str, queries: &[StoredQuery]) -> Vec<Value> {
    let mut lines = Vec::with_capacity(queries.len() * 2);
    for query in queries {
        lines.push(json!({ "index": { "_index": index, "_id": query.id } }));
        lines.push(build_stored_query_document(query));
    }
    lines
}

/// Parse a search or scroll response into a page.
pub fn parse_scroll_page(response: &Value) -> Result<ScrollPage, SearchError> {
    let hits = response["hits"]["hits"]
        .as_array()
        .ok_or_else(|| SearchError::parse("scroll response has no hits array"))?;

    let hits = hits
        .iter()
        .filter_map(|hit| {
            let doc_id = hit["_id"].as_str()?.to_string();
            Some(ScrollHit {
                doc_id,
                source: hit.get("_source").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    Ok(ScrollPage {
        scroll_id: response["_scroll_id"].as_str().map(str::to_string),
        hits,
    })
}

/// Parse the stored queries that matched a percolate request.
pub fn parse_percolate_matches(response: &Value) -> Result<Vec<TagMatch>, SearchError> {
    let hits = response["hits"]["hits"]
        .as_array()
        .ok_or_else(|| SearchError::parse("percolate response has no hits array"))?;

    Ok(hits
        .iter()
        .filter_map(|hit| serde_json::from_value::<TagMatch>(hit["_source"].clone()).ok())
        .collect())
}

/// Summarize a bulk delete response. A per-item 404 means the document was
/// already gone.
pub fn parse_bulk_delete(response: &Value, total: usize) -> BulkDeleteSummary {
    let mut summary = BulkDeleteSummary {
        total,
        ..Default::default()
    };

    let items = match response["items"].as_array() {
        Some(items) => items,
        None => return summary,
    };

    for item in items {
        let action = &item["delete"];
        let status = action["status"].as_u64().unwrap_or(0);
        let id = action["_id"].as_str().unwrap_or_default().to_string();

        match status {
            200..=299 => summary.deleted += 1,
            404 => summary.not_found += 1,
            _ => summary.failed.push(id),
        }
    }

    summary
}

/// Collect error reasons from a bulk response that reported `errors: true`.
pub fn bulk_error_reasons(response: &Value) -> Vec<String> {
    if !response["errors"].as_bool().unwrap_or(false) {
        return Vec::new();
    }

    response["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let action = item.as_object()?.values().next()?;
                    let error = action.get("error")?;
                    Some(format!(
                        "{}: {}",
                        action["_id"].as_str().unwrap_or("?"),
                        error["reason"].as_str().unwrap_or("unknown")
                    ))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_query() -> StoredQuery {
        StoredQuery {
            id: "q1".to_string(),
            label: "ocean acidification".to_string(),
            uri: "http://vocab.example.org/term/42".to_string(),
            source_vocabulary: "ASFA".to_string(),
            named_graph: "http://vocab.example.org/graph/asfa".to_string(),
        }
    }

    #[test]
    fn test_scroll_query_projects_fields() {
        let query = build_scroll_query(&["id", "lastModified"]);

        assert_eq!(query["_source"], json!(["id", "lastModified"]));
        assert!(query["query"]["match_all"].is_object());
    }

    #[test]
    fn test_percolate_query_structure() {
        let query = build_percolate_query(&PercolateDocument::new("Title", None), 50);

        assert_eq!(query["size"], 50);
        assert_eq!(query["query"]["percolate"]["field"], "query");
        assert_eq!(query["query"]["percolate"]["document"]["title"], "Title");
        assert_eq!(query["query"]["percolate"]["document"]["body"], "Title");
    }

    #[test]
    fn test_stored_query_document() {
        let doc = build_stored_query_document(&stored_query());

        assert_eq!(doc["query"]["multi_match"]["query"], "ocean acidification");
        assert_eq!(doc["query"]["multi_match"]["fields"], json!(["title", "body"]));
        assert_eq!(doc["namedGraphReference"], "http://vocab.example.org/graph/asfa");
    }

    #[test]
    fn test_bulk_stored_query_lines() {
        let lines = build_bulk_stored_query_lines("terms", &[stored_query(), stored_query()]);

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["index"]["_id"], "q1");
        assert_eq!(lines[0]["index"]["_index"], "terms");
    }

    #[test]
    fn test_bulk_delete_lines() {
        let id = Uuid::new_v4();
        let lines = build_bulk_delete_lines("docs", &[id]);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["delete"]["_id"], id.to_string());
    }

    #[test]
    fn test_parse_scroll_page() {
        let response = json!({
            "_scroll_id": "abc",
            "hits": { "hits": [
                { "_id": "1", "_source": { "id": "1" } },
                { "_id": "2", "_source": { "id": "2" } }
            ]}
        });

        let page = parse_scroll_page(&response).unwrap();

        assert_eq!(page.scroll_id.as_deref(), Some("abc"));
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.hits[1].source["id"], "2");
    }

    #[test]
    fn test_parse_scroll_page_empty() {
        let response = json!({ "_scroll_id": "abc", "hits": { "hits": [] } });
        assert!(parse_scroll_page(&response).unwrap().is_empty());
    }

    #[test]
    fn test_parse_scroll_page_invalid() {
        assert!(parse_scroll_page(&json!({ "error": "boom" })).is_err());
    }

    #[test]
    fn test_parse_percolate_matches() {
        let response = json!({
            "hits": { "hits": [
                { "_source": {
                    "label": "fisheries",
                    "uri": "http://vocab.example.org/term/1",
                    "sourceVocabulary": "ASFA",
                    "namedGraphReference": "http://vocab.example.org/graph/asfa"
                }},
                { "_source": { "unrelated": true } }
            ]}
        });

        let matches = parse_percolate_matches(&response).unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].label, "fisheries");
    }

    #[test]
    fn test_parse_bulk_delete() {
        let response = json!({
            "errors": true,
            "items": [
                { "delete": { "_id": "a", "status": 200 } },
                { "delete": { "_id": "b", "status": 404 } },
                { "delete": { "_id": "c", "status": 500, "error": { "reason": "shard failure" } } }
            ]
        });

        let summary = parse_bulk_delete(&response, 3);

        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.failed, vec!["c".to_string()]);
    }

    #[test]
    fn test_bulk_error_reasons() {
        let response = json!({
            "errors": true,
            "items": [
                { "index": { "_id": "a", "status": 201 } },
                { "index": { "_id": "b", "status": 400, "error": { "reason": "mapper_parsing_exception" } } }
            ]
        });

        assert_eq!(bulk_error_reasons(&response), vec!["b: mapper_parsing_exception".to_string()]);
        assert!(bulk_error_reasons(&json!({ "errors": false })).is_empty());
    }
}
