//! Tabular ingestion: turns a raw CSV byte stream into canonical
//! [`RawTrade`] rows. Never fails wholesale — a missing header produces a
//! single schema-level error and an empty result; a malformed row produces
//! a per-row error and is skipped, letting the rest of the file through.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use temper_core::{RawTrade, Side};

/// A single row-level parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseRowError {
    pub row_index: usize,
    pub message: String,
}

/// Output of [`parse`]. Always returned, never an `Err` — schema and row
/// failures are surfaced as data, not control flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseResult {
    pub trades: Vec<RawTrade>,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub errors: Vec<ParseRowError>,
}

/// (canonical name, accepted aliases including itself), case-insensitive.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("timestamp", &["timestamp", "time"]),
    ("symbol", &["symbol", "ticker", "asset"]),
    ("side", &["side", "direction"]),
    ("quantity", &["quantity", "qty", "shares", "size"]),
    ("price", &["price", "entry_price"]),
    ("pnl", &["pnl", "profit", "profit_loss"]),
];

const TAGS_ALIASES: &[&str] = &["tags"];

pub fn parse(csv_bytes: &[u8]) -> ParseResult {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_bytes);

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            return ParseResult {
                errors: vec![ParseRowError {
                    row_index: 0,
                    message: format!("could not read header row: {e}"),
                }],
                ..Default::default()
            };
        }
    };

    let lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let find = |aliases: &[&str]| -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| lower.iter().position(|h| h == alias))
    };

    let mut columns: HashMap<&str, usize> = HashMap::new();
    let mut missing: Vec<&str> = Vec::new();
    for (canonical, aliases) in REQUIRED_COLUMNS {
        match find(aliases) {
            Some(idx) => {
                columns.insert(canonical, idx);
            }
            None => missing.push(canonical),
        }
    }

    if !missing.is_empty() {
        return ParseResult {
            errors: vec![ParseRowError {
                row_index: 0,
                message: format!("missing required column(s): {}", missing.join(", ")),
            }],
            ..Default::default()
        };
    }

    let tags_col = find(TAGS_ALIASES);

    let mut trades = Vec::new();
    let mut errors = Vec::new();
    let mut total_rows = 0usize;

    for (row_index, record) in reader.records().enumerate() {
        total_rows += 1;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                errors.push(ParseRowError {
                    row_index,
                    message: format!("malformed row: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &columns, tags_col) {
            Ok(trade) => trades.push(trade),
            Err(message) => errors.push(ParseRowError { row_index, message }),
        }
    }

    // Stable sort preserves original row order for equal timestamps, which
    // is the documented tie-break.
    trades.sort_by_key(|t| t.timestamp);

    ParseResult {
        valid_rows: trades.len(),
        trades,
        total_rows,
        errors,
    }
}

fn parse_row(
    record: &csv::StringRecord,
    columns: &HashMap<&str, usize>,
    tags_col: Option<usize>,
) -> Result<RawTrade, String> {
    let field = |name: &str| -> Option<&str> {
        columns.get(name).and_then(|&idx| record.get(idx)).map(str::trim)
    };

    let symbol = field("symbol").unwrap_or("").to_string();
    if symbol.is_empty() {
        return Err("missing symbol".to_string());
    }

    let side_raw = field("side").unwrap_or("");
    let side = match side_raw.to_uppercase().as_str() {
        "BUY" | "LONG" => Side::Long,
        "SELL" | "SHORT" => Side::Short,
        other => return Err(format!("unrecognized side: {other}")),
    };

    let quantity: f64 = field("quantity")
        .unwrap_or("")
        .parse()
        .map_err(|_| "unparseable quantity".to_string())?;
    if !(quantity.is_finite() && quantity > 0.0) {
        return Err("quantity must be a positive finite number".to_string());
    }

    let price: f64 = field("price")
        .unwrap_or("")
        .parse()
        .map_err(|_| "unparseable price".to_string())?;
    if !(price.is_finite() && price >= 0.0) {
        return Err("price must be a non-negative finite number".to_string());
    }

    let pnl_raw = field("pnl").unwrap_or("");
    if pnl_raw.is_empty() {
        return Err("pnl is required".to_string());
    }
    let pnl: f64 = pnl_raw
        .parse()
        .map_err(|_| "unparseable pnl".to_string())?;
    if !pnl.is_finite() {
        return Err("pnl must be finite".to_string());
    }

    let timestamp_raw = field("timestamp").unwrap_or("");
    let timestamp = parse_timestamp(timestamp_raw).ok_or("unparseable timestamp".to_string())?;

    let tags = tags_col
        .and_then(|idx| record.get(idx))
        .map(parse_tags)
        .unwrap_or_default();

    Ok(RawTrade {
        timestamp,
        symbol,
        side,
        quantity,
        price,
        pnl,
        tags,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Absent timezone: treat as UTC.
    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }
    None
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim().trim_matches('"').trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}
