use std::sync::LazyLock;

use regex::Regex;

use crate::error::FragmentError;

static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.(?:\s+|$)").unwrap());

/// "1. Um Sonho de Liberdade" -> "Um Sonho de Liberdade"
pub fn clean_title(text: &str) -> Result<String, FragmentError> {
    let trimmed = text.trim();
    let title = ORDINAL_RE.replace(trimmed, "");
    let title = title.trim();
    if title.is_empty() {
        return Err(FragmentError::EmptyTitle);
    }
    Ok(title.to_string())
}

/// First metadata token as a year; anything else (age rating, runtime, nothing) is 0.
pub fn parse_year(token: Option<&str>) -> i64 {
    let Some(token) = token.map(str::trim) else {
        return 0;
    };
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return 0;
    }
    token.parse().unwrap_or(0)
}

/// "9,3 (3,1 mi)" -> 9.3. The vote count after the first whitespace is ignored.
pub fn parse_rating(text: &str) -> Result<f64, FragmentError> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| FragmentError::BadRating(text.to_string()))?;
    let rating: f64 = token
        .replace(',', ".")
        .parse()
        .map_err(|_| FragmentError::BadRating(token.to_string()))?;
    if !(0.0..=10.0).contains(&rating) {
        return Err(FragmentError::BadRating(token.to_string()));
    }
    Ok(rating)
}
