use chrono::NaiveDate;

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Reads an 8-digit contiguous `YYYYMMDD` token.
/// Returns `None` for anything that is not exactly eight ASCII digits or not a real date.
pub fn parse_compact_ymd(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[4..6].parse().ok()?;
    let day: u32 = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// File name for the cleaned output of `ticker`.
pub fn clean_file_name(ticker: &str) -> String {
    format!("{}_clean.csv", ticker)
}
