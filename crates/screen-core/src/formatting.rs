//! Number formatting and quote-set rendering (CSV / JSON).

use std::io::{self, Write};

use serde::Serialize;

use crate::models::AssetQuote;

/// Format `value` with thousands separators and `decimals` fixed places.
///
/// # Examples
///
/// ```
/// use screen_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 2), "1,234.50");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// assert_eq!(format_number(0.0, 0), "0");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    // Nudge exact binary midpoints (1.005) so they round away from zero.
    let factor = 10_f64.powi(decimals as i32);
    let abs_value = value.abs();
    let nudged = abs_value + f64::EPSILON * abs_value * factor;
    let fixed = format!("{nudged:.decimals$}");

    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a price with two decimals and thousands separators.
pub fn format_price(price: f64) -> String {
    format_number(price, 2)
}

/// Abbreviate a market capitalisation, e.g. `3.12T`, `845.20B`, `12.00M`.
pub fn format_market_cap(market_cap: f64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e12, "T"), (1e9, "B"), (1e6, "M")];
    for (scale, suffix) in UNITS {
        if market_cap.abs() >= scale {
            return format!("{:.2}{suffix}", market_cap / scale);
        }
    }
    format_number(market_cap, 0)
}

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Output encoding for quote sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    /// Parse a `--format` value; anything other than `csv` renders JSON.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("csv") {
            Self::Csv
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct JsonRow<'a> {
    name: &'a str,
    symbol: &'a str,
    price: String,
}

/// Render `quotes` in `format` and write them, newline-terminated, to `w`.
pub fn render_quotes<W: Write>(w: &mut W, quotes: &[AssetQuote], format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Csv => writeln!(w, "{}", quotes_to_csv(quotes)),
        OutputFormat::Json => writeln!(w, "{}", quotes_to_json(quotes)),
    }
}

/// Write `name,symbol,price` rows, with a header line, to `w`.
pub fn write_csv<W: Write>(w: W, quotes: &[AssetQuote]) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(w);
    wtr.write_record(["name", "symbol", "price"])?;
    for q in quotes {
        let price = format_price(q.price());
        wtr.write_record([q.name.as_str(), q.symbol.as_str(), price.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// [`write_csv`] into a string.
pub fn quotes_to_csv(quotes: &[AssetQuote]) -> String {
    let mut buf = Vec::new();
    if let Err(e) = write_csv(&mut buf, quotes) {
        return e.to_string();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// JSON array of `{name, symbol, price}`; `[]` when empty.
pub fn quotes_to_json(quotes: &[AssetQuote]) -> String {
    let rows: Vec<JsonRow<'_>> = quotes
        .iter()
        .map(|q| JsonRow {
            name: &q.name,
            symbol: &q.symbol,
            price: format!("{:.6}", q.price()),
        })
        .collect();

    serde_json::to_string(&rows).unwrap_or_else(|e| e.to_string())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
