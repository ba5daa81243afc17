//! The analyzed-video record schema and JSON paste parsing.
//!
//! A [`Record`] is one row in the knowledge sheet. The sheet's header row is
//! the source of truth for column order; [`EXPECTED_COLUMNS`] is the canonical
//! set the header self-repair restores when columns go missing.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use uuid::Uuid;

/// Canonical header, in canonical order.
pub const EXPECTED_COLUMNS: [&str; 14] = [
    "id",
    "source_url",
    "title",
    "channel",
    "published_at",
    "category",
    "main_topic",
    "key_arguments",
    "evidence",
    "implications",
    "validity_check",
    "sentiment",
    "tags",
    "summary",
];

/// One analyzed-video entry. A column missing from the sheet (or a short row)
/// is treated as the empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub id: String,
    pub source_url: String,
    pub title: String,
    pub channel: String,
    pub published_at: String,
    pub category: String,
    pub main_topic: String,
    pub key_arguments: String,
    pub evidence: String,
    pub implications: String,
    pub validity_check: String,
    pub sentiment: String,
    pub tags: String,
    pub summary: String,
}

impl Record {
    /// Look up a field by its column name. Unknown columns read as empty.
    pub fn field(&self, column: &str) -> &str {
        match column {
            "id" => &self.id,
            "source_url" => &self.source_url,
            "title" => &self.title,
            "channel" => &self.channel,
            "published_at" => &self.published_at,
            "category" => &self.category,
            "main_topic" => &self.main_topic,
            "key_arguments" => &self.key_arguments,
            "evidence" => &self.evidence,
            "implications" => &self.implications,
            "validity_check" => &self.validity_check,
            "sentiment" => &self.sentiment,
            "tags" => &self.tags,
            "summary" => &self.summary,
            _ => "",
        }
    }

    fn set_field(&mut self, column: &str, value: &str) {
        let slot = match column {
            "id" => &mut self.id,
            "source_url" => &mut self.source_url,
            "title" => &mut self.title,
            "channel" => &mut self.channel,
            "published_at" => &mut self.published_at,
            "category" => &mut self.category,
            "main_topic" => &mut self.main_topic,
            "key_arguments" => &mut self.key_arguments,
            "evidence" => &mut self.evidence,
            "implications" => &mut self.implications,
            "validity_check" => &mut self.validity_check,
            "sentiment" => &mut self.sentiment,
            "tags" => &mut self.tags,
            "summary" => &mut self.summary,
            _ => return,
        };
        *slot = value.to_string();
    }

    /// Build a record from a sheet row, mapping cells positionally by the
    /// header row. Cells beyond the row's length read as empty.
    pub fn from_row(header: &[String], row: &[String]) -> Record {
        let mut record = Record::default();
        for (i, column) in header.iter().enumerate() {
            if let Some(cell) = row.get(i) {
                record.set_field(column, cell);
            }
        }
        record
    }

    /// Serialize the record in the sheet's current header order. Columns the
    /// schema does not know serialize as empty strings, so appends never
    /// shift existing data.
    pub fn to_row(&self, header: &[String]) -> Vec<String> {
        header
            .iter()
            .map(|column| self.field(column).to_string())
            .collect()
    }
}

/// Parse a pasted JSON payload into records.
///
/// Accepts a single JSON object or an array of objects. Unknown keys are
/// ignored, missing keys become empty strings, and a missing or blank `id`
/// is backfilled with a fresh UUID. Anything else (scalars, malformed text,
/// array elements that are not objects) is rejected.
pub fn parse_paste(text: &str) -> Result<Vec<Record>> {
    let value: Value =
        serde_json::from_str(text.trim()).context("pasted text is not valid JSON")?;

    let objects: Vec<&serde_json::Map<String, Value>> = match &value {
        Value::Object(map) => vec![map],
        Value::Array(items) => {
            let mut maps = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Object(map) => maps.push(map),
                    _ => bail!("array element {} is not a JSON object", i),
                }
            }
            maps
        }
        _ => bail!("paste must be a JSON object or an array of objects"),
    };

    if objects.is_empty() {
        bail!("paste contains no records");
    }

    Ok(objects.into_iter().map(record_from_object).collect())
}

fn record_from_object(map: &serde_json::Map<String, Value>) -> Record {
    let mut record = Record::default();
    for column in EXPECTED_COLUMNS {
        if let Some(value) = map.get(column) {
            record.set_field(column, &value_to_cell(value));
        }
    }
    if record.id.trim().is_empty() {
        record.id = Uuid::new_v4().to_string();
    }
    record
}

/// Render a JSON value as a sheet cell. Strings pass through unquoted;
/// numbers and booleans render as their JSON text; null is empty.
fn value_to_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        EXPECTED_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_paste_single_object() {
        let records = parse_paste(
            r#"{"id": "r1", "title": "Rate outlook", "channel": "MacroDesk", "tags": "fx,rates"}"#,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "r1");
        assert_eq!(records[0].title, "Rate outlook");
        assert_eq!(records[0].summary, "");
    }

    #[test]
    fn test_parse_paste_array() {
        let records = parse_paste(r#"[{"title": "A"}, {"title": "B"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].title, "B");
    }

    #[test]
    fn test_parse_paste_backfills_id() {
        let records = parse_paste(r#"{"title": "No id here"}"#).unwrap();
        assert!(!records[0].id.is_empty());
        // Blank ids are backfilled too
        let records = parse_paste(r#"{"id": "  ", "title": "Blank id"}"#).unwrap();
        assert_ne!(records[0].id.trim(), "");
        assert_ne!(records[0].id, "  ");
    }

    #[test]
    fn test_parse_paste_rejects_malformed() {
        assert!(parse_paste("{not json").is_err());
        assert!(parse_paste("42").is_err());
        assert!(parse_paste(r#""a string""#).is_err());
        assert!(parse_paste(r#"[{"title": "ok"}, 7]"#).is_err());
        assert!(parse_paste("[]").is_err());
    }

    #[test]
    fn test_parse_paste_coerces_scalars() {
        let records = parse_paste(r#"{"title": "Views", "published_at": 20251101}"#).unwrap();
        assert_eq!(records[0].published_at, "20251101");
    }

    #[test]
    fn test_from_row_short_row() {
        let row = vec!["r1".to_string(), "https://yt/v1".to_string()];
        let record = Record::from_row(&header(), &row);
        assert_eq!(record.id, "r1");
        assert_eq!(record.source_url, "https://yt/v1");
        assert_eq!(record.title, "");
    }

    #[test]
    fn test_from_row_unknown_column_ignored() {
        let header = vec!["view_count".to_string(), "title".to_string()];
        let row = vec!["12000".to_string(), "Gold thesis".to_string()];
        let record = Record::from_row(&header, &row);
        assert_eq!(record.title, "Gold thesis");
    }

    #[test]
    fn test_to_row_follows_sheet_order() {
        let mut record = Record::default();
        record.id = "r9".to_string();
        record.title = "Bond ladder".to_string();
        // Sheet has a legacy extra column in the middle
        let header = vec![
            "title".to_string(),
            "view_count".to_string(),
            "id".to_string(),
        ];
        assert_eq!(record.to_row(&header), vec!["Bond ladder", "", "r9"]);
    }
}
