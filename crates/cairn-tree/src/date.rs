//! Date prefixes in file and directory names.
//!
//! A name like `2020-06-21_hello-world` carries its publication date. The
//! prefix is stripped from the destination and the date is injected into the
//! node's own data.
//!
//! Accepted tokens:
//! - `YYYY-MM-DD`
//! - `YYYY-MM-DD-HH-MM`
//! - `YYYY-MM-DD-HH-MM-SS`

use chrono::{NaiveDate, NaiveDateTime};

/// Split a date prefix off a name.
///
/// Returns the parsed date and the remaining name, or `None` if the name has
/// no `_` separator, the token is not a valid date, or nothing follows it.
#[must_use]
pub fn split_date_prefix(name: &str) -> Option<(NaiveDateTime, &str)> {
    let (token, rest) = name.split_once('_')?;
    if rest.is_empty() {
        return None;
    }
    Some((parse_token(token)?, rest))
}

fn parse_token(token: &str) -> Option<NaiveDateTime> {
    match token.len() {
        10 => NaiveDate::parse_from_str(token, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0),
        16 => NaiveDateTime::parse_from_str(&format!("{token}-00"), "%Y-%m-%d-%H-%M-%S").ok(),
        19 => NaiveDateTime::parse_from_str(token, "%Y-%m-%d-%H-%M-%S").ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_date_only() {
        assert_eq!(
            split_date_prefix("2020-06-21_hello-world"),
            Some((at(2020, 6, 21, 0, 0, 0), "hello-world"))
        );
    }

    #[test]
    fn test_date_with_minutes() {
        assert_eq!(
            split_date_prefix("2020-06-21-18-30_post"),
            Some((at(2020, 6, 21, 18, 30, 0), "post"))
        );
    }

    #[test]
    fn test_date_with_seconds() {
        assert_eq!(
            split_date_prefix("2020-06-21-18-30-15_post"),
            Some((at(2020, 6, 21, 18, 30, 15), "post"))
        );
    }

    #[test]
    fn test_rest_keeps_later_underscores() {
        assert_eq!(
            split_date_prefix("2021-01-02_a_b").map(|(_, rest)| rest),
            Some("a_b")
        );
    }

    #[test]
    fn test_non_date_token() {
        assert_eq!(split_date_prefix("draft_post"), None);
        assert_eq!(split_date_prefix("2020-13-01_post"), None);
    }

    #[test]
    fn test_no_separator_or_empty_rest() {
        assert_eq!(split_date_prefix("2020-06-21"), None);
        assert_eq!(split_date_prefix("2020-06-21_"), None);
    }
}
