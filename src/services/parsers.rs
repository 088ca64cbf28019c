// src/services/parsers.rs
//! Payload parsers for every feed. Each one is a pure function from the raw
//! body to a typed value; a body that does not have the expected shape becomes
//! `FetchError::Parse` with a readable reason.

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use log::debug;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::error::{FetchError, Result};
use crate::models::PriceRow;

const DEFAULT_QUOTE_HEADER: &str = "Symbol,Date,Time,Open,High,Low,Close,Volume";
const MONTHLY_CLOSE_FALLBACK_IDX: usize = 4;

static TOKEN_SEPARATOR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[,;\s]+").ok());

fn split_cells(line: &str) -> Vec<String> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    match rdr.records().next() {
        Some(Ok(record)) => record.iter().map(String::from).collect(),
        _ => Vec::new(),
    }
}

fn finite(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Last whole token of the row that is itself a number. Digits embedded in a
/// ticker, date or time never count.
fn last_numeric_token(line: &str) -> Option<f64> {
    let separator = TOKEN_SEPARATOR.as_ref()?;
    separator.split(line).filter_map(finite).last()
}

/// Close price out of a single-quote CSV (`Symbol,Date,Time,Open,High,Low,Close,Volume`).
pub fn parse_quote_close(text: &str) -> Result<f64> {
    let lines: Vec<&str> = text
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let header_idx = lines.iter().position(|l| {
        let lower = l.to_lowercase();
        lower.contains("symbol") && lower.contains("close")
    });

    let data_idx = match header_idx {
        Some(idx) => Some(idx + 1).filter(|i| *i < lines.len()),
        None => lines.iter().position(|l| split_cells(l).len() >= 7),
    }
    .ok_or_else(|| FetchError::parse("no data row found in quote CSV"))?;

    let header = header_idx.map(|i| lines[i]).unwrap_or(DEFAULT_QUOTE_HEADER);
    let headers: Vec<String> = split_cells(header)
        .into_iter()
        .map(|h| h.to_lowercase())
        .collect();
    let row = lines[data_idx];
    let cells = split_cells(row);

    let by_name = headers
        .iter()
        .position(|h| h == "close")
        .and_then(|i| cells.get(i))
        .and_then(|c| finite(c));

    let by_position = || {
        let n = cells.len();
        let second_to_last = n.checked_sub(2).and_then(|i| finite(&cells[i]));
        second_to_last.or_else(|| n.checked_sub(1).and_then(|i| finite(&cells[i])))
    };

    let close = by_name
        .or_else(by_position)
        .or_else(|| last_numeric_token(row))
        .ok_or_else(|| FetchError::parse(format!("no close price in row: {}", row)))?;

    debug!("Parsed quote close {} from row {:?}", close, row);
    Ok(close)
}

fn is_monthly_header(line: &str) -> bool {
    let lower = line.trim_start().to_lowercase();
    lower.starts_with("data") || lower.starts_with("date")
}

/// Monthly OHLC rows (`Date,Open,High,Low,Close,...`). Proxy preambles before
/// the header are skipped and malformed rows are dropped. Output is sorted by date.
pub fn parse_monthly_csv(text: &str) -> Result<Vec<PriceRow>> {
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines
        .iter()
        .position(|l| is_monthly_header(l))
        .ok_or_else(|| FetchError::parse("monthly CSV has no Date header"))?;
    let lines = &lines[start..];
    if lines.len() < 3 {
        return Err(FetchError::parse("monthly CSV has too few rows"));
    }

    let headers: Vec<String> = split_cells(lines[0])
        .into_iter()
        .map(|h| h.to_lowercase())
        .collect();
    let close_idx = headers
        .iter()
        .position(|h| h == "close" || h == "zamkniecie")
        .unwrap_or(MONTHLY_CLOSE_FALLBACK_IDX);

    let mut rows: Vec<PriceRow> = lines[1..]
        .iter()
        .filter_map(|line| {
            let cells = split_cells(line);
            if cells.len() < 5 {
                return None;
            }
            let timestamp = NaiveDate::parse_from_str(&cells[0], "%Y-%m-%d").ok()?;
            let close = cells.get(close_idx).and_then(|c| finite(c))?;
            Some(PriceRow { timestamp, close })
        })
        .collect();

    rows.sort_by_key(|r| r.timestamp);
    Ok(rows)
}

/// Decodes the first JSON object in `text`, ignoring anything before the first
/// `{` (proxy preambles) and anything after the object ends.
fn decode_embedded<T: DeserializeOwned>(text: &str, what: &str) -> Result<T> {
    let start = text
        .find('{')
        .ok_or_else(|| FetchError::parse(format!("{} payload contains no JSON object", what)))?;

    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<T>()
        .next()
        .ok_or_else(|| FetchError::parse(format!("{} payload is empty", what)))?
        .map_err(|e| FetchError::parse(format!("{} payload is malformed: {}", what, e)))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    fn as_f64(&self) -> Option<f64> {
        match self {
            LooseNumber::Number(n) => Some(*n),
            LooseNumber::Text(s) => s.trim().parse::<f64>().ok(),
        }
        .filter(|v| v.is_finite())
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Option<Vec<ChartQuote>>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Option<Vec<Option<f64>>>,
}

/// Latest price out of a chart JSON: the last finite `quote.close`, else
/// `meta.regularMarketPrice`.
pub fn parse_chart_price(text: &str) -> Result<f64> {
    let envelope: ChartEnvelope = decode_embedded(text, "chart")?;
    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FetchError::parse("chart payload has no result"))?;

    let last_close = result
        .indicators
        .as_ref()
        .and_then(|ind| ind.quote.as_ref())
        .and_then(|quotes| quotes.first())
        .and_then(|q| q.close.as_ref())
        .and_then(|closes| closes.iter().rev().flatten().copied().find(|v| v.is_finite()));

    last_close
        .or_else(|| {
            result
                .meta
                .and_then(|m| m.regular_market_price)
                .filter(|v| v.is_finite())
        })
        .ok_or_else(|| FetchError::parse("chart payload has neither close nor regularMarketPrice"))
}

#[derive(Debug, Deserialize)]
struct CnnEnvelope {
    #[serde(default)]
    fear_and_greed: Option<CnnCurrent>,
}

#[derive(Debug, Deserialize)]
struct CnnCurrent {
    #[serde(default)]
    score: Option<LooseNumber>,
}

/// `fear_and_greed.score` from the CNN graph data feed.
pub fn parse_cnn_fear_greed(text: &str) -> Result<f64> {
    let envelope: CnnEnvelope = decode_embedded(text, "CNN")?;
    envelope
        .fear_and_greed
        .and_then(|c| c.score)
        .and_then(|s| s.as_f64())
        .ok_or_else(|| FetchError::parse("CNN payload missing fear_and_greed.score"))
}

#[derive(Debug, Deserialize)]
struct CryptoEnvelope {
    #[serde(default)]
    data: Vec<CryptoReading>,
}

#[derive(Debug, Deserialize)]
struct CryptoReading {
    #[serde(default)]
    value: Option<LooseNumber>,
}

/// `data[0].value` from the alternative.me crypto feed.
pub fn parse_crypto_fear_greed(text: &str) -> Result<f64> {
    let envelope: CryptoEnvelope = decode_embedded(text, "crypto")?;
    envelope
        .data
        .first()
        .and_then(|r| r.value.as_ref())
        .and_then(LooseNumber::as_f64)
        .ok_or_else(|| FetchError::parse("crypto payload missing data[0].value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_close_by_header_name() {
        let body = "Symbol,Date,Time,Open,High,Low,Close,Volume\r\nS5TW,2024-05-03,22:00:00,61.2,64.0,60.1,63.4,0\r\n";
        assert_eq!(parse_quote_close(body).unwrap(), 63.4);
    }

    #[test]
    fn quote_close_skips_proxy_preamble() {
        let body = "Title: stooq\nURL Source: http://stooq.pl\n\nMarkdown Content:\nSymbol,Date,Time,Open,High,Low,Close,Volume\nS5FI,2024-05-03,22:00:00,55,56,54,55.7,0";
        assert_eq!(parse_quote_close(body).unwrap(), 55.7);
    }

    #[test]
    fn quote_close_without_header_uses_default_layout() {
        let body = "S5FI,2024-05-03,22:00:00,55,56,54,57.25,1200";
        assert_eq!(parse_quote_close(body).unwrap(), 57.25);
    }

    #[test]
    fn quote_close_falls_back_to_position_when_named_cell_is_bad() {
        let body = "Symbol,Date,Close,Last,Volume\nS5TW,2024-05-03,N/D,48.5,0";
        assert_eq!(parse_quote_close(body).unwrap(), 48.5);
    }

    #[test]
    fn quote_close_falls_back_to_last_numeric_token() {
        let body = "Symbol,Close\nS5TW,N/D 47.5 (delayed)";
        assert_eq!(parse_quote_close(body).unwrap(), 47.5);
    }

    #[test]
    fn quote_close_no_data_row_is_parse_error() {
        let header = "Symbol,Date,Time,Open,High,Low,Close,Volume";
        let all_missing = format!("{}\nS5TW,N/D,N/D,N/D,N/D,N/D,N/D,N/D", header);
        assert!(matches!(parse_quote_close(&all_missing), Err(FetchError::Parse(_))));

        let dated = format!("{}\nS5FI,2024-05-03,22:00:00,N/D,N/D,N/D,N/D,N/D", header);
        assert!(matches!(parse_quote_close(&dated), Err(FetchError::Parse(_))));
    }

    #[test]
    fn quote_close_rejects_missing_rows() {
        assert!(matches!(parse_quote_close("hello"), Err(FetchError::Parse(_))));
        assert!(matches!(
            parse_quote_close("Symbol,Date,Close"),
            Err(FetchError::Parse(_))
        ));
        assert!(parse_quote_close("Symbol,Close\nSPX,N/D").is_err());
    }

    #[test]
    fn monthly_csv_sorts_and_drops_bad_rows() {
        let body = "Data,Otwarcie,Najwyzszy,Najnizszy,Zamkniecie,Wolumen\n\
                    2024-03-31,1,1,1,110,0\n\
                    2024-02-29,1,1,1,100,0\n\
                    2024-04-30,1,1,1,not-a-number,0\n\
                    bogus line\n\
                    2024-05-31,1,1,1,99,0\n";
        let rows = parse_monthly_csv(body).unwrap();
        let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
        assert_eq!(closes, vec![100.0, 110.0, 99.0]);
        assert!(rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn monthly_csv_accepts_english_header_after_preamble() {
        let body = "Title: proxy\n\nDate,Open,High,Low,Close,Volume\n2024-01-31,1,1,1,4845.65,0\n2024-02-29,1,1,1,5096.27,0\n";
        let rows = parse_monthly_csv(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].close, 5096.27);
    }

    #[test]
    fn monthly_csv_requires_header_and_rows() {
        assert!(parse_monthly_csv("Brak danych").is_err());
        assert!(parse_monthly_csv("Date,Open,High,Low,Close\n2024-01-31,1,1,1,2").is_err());
    }

    #[test]
    fn chart_price_prefers_last_finite_close() {
        let body = r#"{"chart":{"result":[{"meta":{"regularMarketPrice":15.1},
            "indicators":{"quote":[{"close":[14.0,16.5,null]}]}}],"error":null}}"#;
        assert_eq!(parse_chart_price(body).unwrap(), 16.5);
    }

    #[test]
    fn chart_price_falls_back_to_market_price() {
        let body = r#"{"chart":{"result":[{"meta":{"regularMarketPrice":15.1},
            "indicators":{"quote":[{"close":[null]}]}}]}}"#;
        assert_eq!(parse_chart_price(body).unwrap(), 15.1);
    }

    #[test]
    fn chart_price_null_arrays_fall_back_to_market_price() {
        let null_close = r#"{"chart":{"result":[{"meta":{"regularMarketPrice":15.1},
            "indicators":{"quote":[{"close":null}]}}]}}"#;
        assert_eq!(parse_chart_price(null_close).unwrap(), 15.1);

        let null_quote = r#"{"chart":{"result":[{"meta":{"regularMarketPrice":15.1},
            "indicators":{"quote":null}}]}}"#;
        assert_eq!(parse_chart_price(null_quote).unwrap(), 15.1);
    }

    #[test]
    fn chart_price_rejects_empty_result() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#;
        assert!(matches!(parse_chart_price(body), Err(FetchError::Parse(_))));
    }

    #[test]
    fn cnn_score_inside_text_blob() {
        let body = "Title: graphdata\nMarkdown Content:\n{\"fear_and_greed\":{\"score\":54.371,\"rating\":\"neutral\"}}\ntrailing";
        assert_eq!(parse_cnn_fear_greed(body).unwrap(), 54.371);
    }

    #[test]
    fn cnn_missing_score_is_parse_error() {
        let err = parse_cnn_fear_greed(r#"{"fear_and_greed":{}}"#).unwrap_err();
        assert!(err.to_string().contains("fear_and_greed.score"));
        assert!(parse_cnn_fear_greed("no json here").is_err());
    }

    #[test]
    fn crypto_value_as_string_or_number() {
        let text = r#"{"name":"Fear and Greed Index","data":[{"value":"48","value_classification":"Neutral"}]}"#;
        assert_eq!(parse_crypto_fear_greed(text).unwrap(), 48.0);
        let number = r#"{"data":[{"value":71}]}"#;
        assert_eq!(parse_crypto_fear_greed(number).unwrap(), 71.0);
        assert!(parse_crypto_fear_greed(r#"{"data":[]}"#).is_err());
    }
}
