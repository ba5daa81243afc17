//! Spreadsheet service client.
//!
//! Talks to the Google Sheets `values` REST API: read all rows, append rows,
//! and self-repair the header row. Authentication uses an OAuth bearer token
//! from the `SHEETS_API_TOKEN` environment variable.
//!
//! # Retry Strategy
//!
//! Transient failures use exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

use crate::config::Config;
use crate::models::{Record, EXPECTED_COLUMNS};

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// A point-in-time read of the whole worksheet: the header row plus all data
/// rows, in sheet (insertion) order.
#[derive(Debug, Clone, Default)]
pub struct SheetSnapshot {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetSnapshot {
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| Record::from_row(&self.header, row))
            .collect()
    }
}

/// Read the entire worksheet. The first row is the header; an empty sheet
/// yields an empty header and no rows.
pub async fn read_all(config: &Config) -> Result<SheetSnapshot> {
    let url = format!(
        "{}/{}/values/{}",
        API_BASE, config.sheet.spreadsheet_id, config.sheet.worksheet
    );
    let json = send_with_retry(config, reqwest::Method::GET, &url, None).await?;

    let mut values = parse_values(&json).into_iter();
    let header = values.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = values.collect();

    Ok(SheetSnapshot { header, rows })
}

/// Append rows below the existing data.
pub async fn append_rows(config: &Config, rows: &[Vec<String>]) -> Result<()> {
    let url = format!(
        "{}/{}/values/{}:append?valueInputOption=USER_ENTERED",
        API_BASE, config.sheet.spreadsheet_id, config.sheet.worksheet
    );
    let body = serde_json::json!({ "values": rows });
    send_with_retry(config, reqwest::Method::POST, &url, Some(&body)).await?;
    Ok(())
}

/// Self-repair the header row: append only the expected columns that are
/// genuinely missing, after the existing columns, preserving their order and
/// any extra columns the sheet has accumulated. Returns the repaired header.
///
/// An empty sheet gets the full canonical header.
pub async fn repair_header(config: &Config) -> Result<Vec<String>> {
    let url = format!(
        "{}/{}/values/{}!1:1",
        API_BASE, config.sheet.spreadsheet_id, config.sheet.worksheet
    );
    let json = send_with_retry(config, reqwest::Method::GET, &url, None).await?;
    let mut header = parse_values(&json).into_iter().next().unwrap_or_default();

    let missing = missing_columns(&header);
    if missing.is_empty() {
        return Ok(header);
    }

    // Write the missing column names into row 1, after the existing columns.
    let start_col = header.len() + 1;
    let range = format!(
        "{}!R1C{}:R1C{}",
        config.sheet.worksheet,
        start_col,
        start_col + missing.len() - 1
    );
    let url = format!(
        "{}/{}/values/{}?valueInputOption=RAW",
        API_BASE, config.sheet.spreadsheet_id, range
    );
    let body = serde_json::json!({ "values": [missing] });
    send_with_retry(config, reqwest::Method::PUT, &url, Some(&body)).await?;

    header.extend(missing);
    Ok(header)
}

/// Expected columns absent from an existing header, in canonical order.
pub fn missing_columns(existing: &[String]) -> Vec<String> {
    EXPECTED_COLUMNS
        .iter()
        .filter(|column| !existing.iter().any(|have| have == *column))
        .map(|column| column.to_string())
        .collect()
}

/// Extract the `values` grid from a Sheets API response. The API omits the
/// key entirely for an empty range; non-string cells render as their JSON
/// text.
pub fn parse_values(json: &serde_json::Value) -> Vec<Vec<String>> {
    let Some(rows) = json.get("values").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    rows.iter()
        .map(|row| {
            row.as_array()
                .map(|cells| {
                    cells
                        .iter()
                        .map(|cell| match cell.as_str() {
                            Some(s) => s.to_string(),
                            None => cell.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect()
}

fn api_token() -> Result<String> {
    std::env::var("SHEETS_API_TOKEN")
        .map_err(|_| anyhow!("SHEETS_API_TOKEN environment variable not set"))
}

async fn send_with_retry(
    config: &Config,
    method: reqwest::Method,
    url: &str,
    body: Option<&serde_json::Value>,
) -> Result<serde_json::Value> {
    let token = api_token()?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.sheet.timeout_secs))
        .build()?;

    let mut last_err = None;

    for attempt in 0..=config.sheet.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client
            .request(method.clone(), url)
            .header("Authorization", format!("Bearer {}", token));
        if let Some(body) = body {
            request = request.json(body);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow!("Sheets API error {}: {}", status, body_text));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                bail!("Sheets API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("Sheets request failed after retries")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_missing_columns_empty_header() {
        let missing = missing_columns(&[]);
        assert_eq!(missing.len(), EXPECTED_COLUMNS.len());
        assert_eq!(missing[0], "id");
    }

    #[test]
    fn test_missing_columns_complete_header() {
        let header: Vec<String> = EXPECTED_COLUMNS.iter().map(|c| c.to_string()).collect();
        assert!(missing_columns(&header).is_empty());
    }

    #[test]
    fn test_missing_columns_only_genuinely_missing() {
        // Reordered header with one extra legacy column and two gaps
        let header = cols(&[
            "title",
            "id",
            "view_count",
            "channel",
            "source_url",
            "published_at",
            "category",
            "main_topic",
            "key_arguments",
            "evidence",
            "implications",
            "validity_check",
        ]);
        let missing = missing_columns(&header);
        assert_eq!(missing, cols(&["sentiment", "tags", "summary"]));
    }

    #[test]
    fn test_parse_values_missing_key() {
        let json = serde_json::json!({ "range": "analyses!A1:N1" });
        assert!(parse_values(&json).is_empty());
    }

    #[test]
    fn test_parse_values_mixed_cells() {
        let json = serde_json::json!({
            "values": [["id", "title"], ["r1", 42]]
        });
        let values = parse_values(&json);
        assert_eq!(values[0], vec!["id", "title"]);
        assert_eq!(values[1], vec!["r1", "42"]);
    }

    #[test]
    fn test_snapshot_records_in_sheet_order() {
        let snapshot = SheetSnapshot {
            header: cols(&["id", "title"]),
            rows: vec![cols(&["r1", "First"]), cols(&["r2", "Second"])],
        };
        let records = snapshot.records();
        assert_eq!(records[0].title, "First");
        assert_eq!(records[1].title, "Second");
    }
}
