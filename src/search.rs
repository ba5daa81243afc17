//! Keyword retrieval over the knowledge base.
//!
//! A linear, case-insensitive substring scan over the searchable text
//! columns. When nothing matches, the selection falls back to the most
//! recent records so the model always has something to ground on.

use crate::models::Record;

/// Columns the keyword filter scans.
pub const SEARCH_COLUMNS: [&str; 7] = [
    "title",
    "main_topic",
    "key_arguments",
    "evidence",
    "summary",
    "tags",
    "implications",
];

/// The records chosen as grounding context, plus how they were chosen.
#[derive(Debug, Clone)]
pub struct Selection {
    pub records: Vec<Record>,
    /// Total number of records that matched (before the recency cut).
    pub matched: usize,
    /// True when nothing matched and the recent-N fallback fired.
    pub fallback: bool,
}

/// Whether the query appears in any searchable column of the record.
pub fn matches(record: &Record, query: &str) -> bool {
    let needle = query.to_lowercase();
    SEARCH_COLUMNS
        .iter()
        .any(|column| record.field(column).to_lowercase().contains(&needle))
}

/// All records matching the query, in insertion order.
pub fn filter_records<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    records.iter().filter(|r| matches(r, query)).collect()
}

/// Pick the grounding records for a question.
///
/// Matched records keep insertion order and are cut to the *last*
/// `max_matches` (the most recent relevant analyses). With no matches, the
/// last `fallback_recent` records are used instead and the selection is
/// flagged as a fallback. An empty knowledge base yields an empty selection.
pub fn select_context(
    records: &[Record],
    query: &str,
    max_matches: usize,
    fallback_recent: usize,
) -> Selection {
    let matched = filter_records(records, query);

    if matched.is_empty() {
        let skip = records.len().saturating_sub(fallback_recent);
        return Selection {
            records: records[skip..].to_vec(),
            matched: 0,
            fallback: !records.is_empty(),
        };
    }

    let total = matched.len();
    let skip = total.saturating_sub(max_matches);
    Selection {
        records: matched[skip..].iter().map(|r| (*r).clone()).collect(),
        matched: total,
        fallback: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, tags: &str) -> Record {
        Record {
            title: title.to_string(),
            tags: tags.to_string(),
            ..Record::default()
        }
    }

    fn base() -> Vec<Record> {
        vec![
            record("Won-dollar outlook", "fx"),
            record("Gold as a hedge", "gold,commodities"),
            record("US rate path", "rates,fed"),
            record("Housing market check", "real-estate"),
        ]
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let records = base();
        let hits = filter_records(&records, "GOLD");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Gold as a hedge");
    }

    #[test]
    fn test_filter_scans_all_search_columns() {
        let mut rec = record("Untitled", "");
        rec.evidence = "CPI printed at 3.1% in July".to_string();
        let records = vec![rec];
        assert_eq!(filter_records(&records, "cpi").len(), 1);
    }

    #[test]
    fn test_select_keeps_most_recent_matches() {
        let records: Vec<Record> = (0..8).map(|i| record(&format!("fed note {}", i), "")).collect();
        let selection = select_context(&records, "fed", 5, 3);
        assert_eq!(selection.matched, 8);
        assert!(!selection.fallback);
        assert_eq!(selection.records.len(), 5);
        assert_eq!(selection.records[0].title, "fed note 3");
        assert_eq!(selection.records[4].title, "fed note 7");
    }

    #[test]
    fn test_select_falls_back_to_recent() {
        let records = base();
        let selection = select_context(&records, "cryptocurrency", 5, 3);
        assert_eq!(selection.matched, 0);
        assert!(selection.fallback);
        assert_eq!(selection.records.len(), 3);
        assert_eq!(selection.records[0].title, "Gold as a hedge");
        assert_eq!(selection.records[2].title, "Housing market check");
    }

    #[test]
    fn test_select_no_fallback_when_anything_matches() {
        let records = base();
        let selection = select_context(&records, "gold", 5, 3);
        assert!(!selection.fallback);
        assert_eq!(selection.records.len(), 1);
    }

    #[test]
    fn test_select_empty_base() {
        let selection = select_context(&[], "gold", 5, 3);
        assert!(selection.records.is_empty());
        assert!(!selection.fallback);
        assert_eq!(selection.matched, 0);
    }
}
