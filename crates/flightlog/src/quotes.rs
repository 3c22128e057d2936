//! Quote of the day for the summary page.
//!
//! Quotes come from a JSON file shaped like `{"quotes": ["...", "..."]}`.
//! Nothing here ever fails the page: any problem with the file falls back to
//! [`FALLBACK_QUOTE`].

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;

/// Shown when no quote can be loaded.
pub const FALLBACK_QUOTE: &str = "Blue skies and tailwinds.";

#[derive(Debug, Deserialize)]
struct QuoteFile {
    quotes: Vec<String>,
}

/// Pick the quote for `date` from the file at `path`.
///
/// The same date always yields the same quote while the file is unchanged.
pub async fn quote_of_the_day(path: &Path, date: NaiveDate) -> String {
    match load_quotes(path).await {
        Ok(quotes) if !quotes.is_empty() => {
            let index = date.ordinal0() as usize % quotes.len();
            quotes[index].clone()
        }
        Ok(_) => {
            debug!("Quote file {} has no quotes", path.display());
            FALLBACK_QUOTE.to_string()
        }
        Err(e) => {
            warn!("Failed to load quotes from {}: {}", path.display(), e);
            FALLBACK_QUOTE.to_string()
        }
    }
}

async fn load_quotes(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    let file: QuoteFile = serde_json::from_str(&content)?;
    Ok(file.quotes)
}
