//! JSON paste ingestion.
//!
//! Parses a pasted payload (object or array), self-repairs the sheet header,
//! serializes the records in the sheet's column order, and appends them.

use anyhow::Result;

use crate::cache::SheetCache;
use crate::config::Config;
use crate::{models, sheets};

/// Append a pasted JSON payload to the knowledge sheet. Returns the number
/// of records appended.
///
/// The header is repaired first so every schema column has a slot, and the
/// cache is invalidated so the new records are visible to the next ask.
pub async fn append_paste(config: &Config, cache: &SheetCache, text: &str) -> Result<usize> {
    let records = models::parse_paste(text)?;

    let header = sheets::repair_header(config).await?;
    let rows: Vec<Vec<String>> = records.iter().map(|r| r.to_row(&header)).collect();

    sheets::append_rows(config, &rows).await?;
    cache.invalidate().await;

    Ok(records.len())
}
