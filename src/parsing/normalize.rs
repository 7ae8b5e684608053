use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Value the exchange uses for "not applicable".
pub const PLACEHOLDER: &str = "-";

// Date formats seen across the exchange feeds.
pub const DMY_HMS: &str = "%d-%b-%Y %H:%M:%S";
pub const DMY_HM: &str = "%d-%b-%Y %H:%M";
pub const DMY: &str = "%d-%b-%Y";
pub const DMY_SHORT: &str = "%d-%b-%y";
pub const ORACLE_TS: &str = "%d-%b-%y %I.%M.%S%.f %p";
/// RSS `pubDate`, any RFC 822/2822 form (`GMT`, no weekday, numeric offset).
pub const RFC2822: &str = "rfc2822";
/// Dublin Core `dc:date`.
pub const RFC3339: &str = "rfc3339";

/// Try each format in order and return the first successful parse.
/// Empty or absent input is "no match", never an error.
pub fn parse_datetime(raw: Option<&str>, formats: &[&str]) -> Option<NaiveDateTime> {
    let s = raw?.trim();
    if s.is_empty() { return None; }
    formats.iter().find_map(|fmt| parse_with(s, fmt))
}

pub fn parse_date(raw: Option<&str>, formats: &[&str]) -> Option<NaiveDate> {
    parse_datetime(raw, formats).map(|dt| dt.date())
}

fn parse_with(s: &str, fmt: &str) -> Option<NaiveDateTime> {
    // offset-aware formats keep the wall-clock time as published
    let aware = match fmt {
        RFC2822 => DateTime::parse_from_rfc2822(s),
        RFC3339 => DateTime::parse_from_rfc3339(s),
        _ if fmt.contains("%z") => DateTime::parse_from_str(s, fmt),
        _ => return naive(s, fmt),
    };
    aware.ok().map(|dt| dt.naive_local())
}

fn naive(s: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, fmt)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, fmt).ok().and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Same rendering as the stored guid suffix, e.g. `2024-01-15T10:30:00`.
pub fn iso_timestamp(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Locate `label` in a delimited blob and return the value that follows it.
///
/// The value starts after the first colon between the label and the next
/// delimiter (a label that ends in `:` already carries it) and runs to that
/// delimiter. Labels are matched by exact substring, first occurrence wins.
pub fn labeled_value(blob: &str, label: &str, delimiters: &[char]) -> Option<String> {
    let at = blob.find(label)?;
    let rest = &blob[at + label.len()..];
    let end = rest.find(|c: char| delimiters.contains(&c)).unwrap_or(rest.len());
    let segment = &rest[..end];
    if label.trim_end().ends_with(':') {
        return clean_value(segment);
    }
    let colon = segment.find(':')?;
    clean_value(&segment[colon + 1..])
}

/// Split a `KEY : value|KEY : value` blob into a map keyed by the upper-cased
/// key with spaces replaced by underscores (`As on Date` -> `AS_ON_DATE`).
pub fn keyed_fields(blob: &str, delimiter: char) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for segment in blob.split(delimiter) {
        let Some((key, value)) = segment.split_once(':') else { continue; };
        let key = key.trim().to_uppercase().replace(' ', "_");
        if key.is_empty() { continue; }
        if let Some(v) = clean_value(value) {
            out.entry(key).or_insert(v);
        }
    }
    out
}

/// Text following `marker` in `s`, e.g. the ex-date packed into a title.
pub fn value_after(s: &str, marker: &str) -> Option<String> {
    let (_, rest) = s.split_once(marker)?;
    clean_value(rest)
}

fn clean_value(raw: &str) -> Option<String> {
    let v = raw.trim();
    if v.is_empty() || v == PLACEHOLDER { None } else { Some(v.to_string()) }
}

/// Lenient decimal: digits with at most one point and an optional sign.
/// Anything else (words, exponents, `nan`) is absent rather than an error.
pub fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    let points = body.chars().filter(|c| *c == '.').count();
    if digits == 0 || points > 1 || digits + points != body.len() { return None; }
    s.parse::<f64>().ok()
}

/// Split a whitespace-packed link field into (primary, secondary).
pub fn split_links(raw: Option<&str>) -> (Option<String>, Option<String>) {
    let mut parts = raw.unwrap_or("").split_whitespace();
    (parts.next().map(str::to_string), parts.next().map(str::to_string))
}
