//! Best-effort recovery of message metadata from the body text.
//!
//! Mailbox-file items frequently lose their transport headers, leaving only
//! the rendered body. Forwarded-header blocks and signatures inside that body
//! still carry enough to recover a send time and the author's address.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

const MONTH_DAY_YEAR_FORMAT: &str = "%B %d, %Y %I:%M %p";

// Ordered: the forwarded "Sent:" header is the most reliable source.
static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Sent: Friday, November 29, 2024 2:04 PM
        Regex::new(r"(?i)Sent:\s+\w+,\s+(\w+\s+\d{1,2},\s+\d{4}\s+\d{1,2}:\d{2}\s+(?:AM|PM))")
            .unwrap(),
        // Sent: November 29, 2024 2:04 PM
        Regex::new(r"(?i)Sent:\s+(\w+\s+\d{1,2},\s+\d{4}\s+\d{1,2}:\d{2}\s+(?:AM|PM))").unwrap(),
        // November 29, 2024 2:04 PM anywhere
        Regex::new(r"(?i)(\w+\s+\d{1,2},\s+\d{4}\s+\d{1,2}:\d{2}\s+(?:AM|PM))").unwrap(),
    ]
});

static NUMERIC_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());

static FORWARD_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)From:").unwrap());

static PIPE_EMAIL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"\|\s*(?:mailto:)?([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap(),
        Regex::new(r"([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})\s*\|").unwrap(),
    ]
});

static MAILTO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)mailto:([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap()
});

static BARE_EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
});

/// Returns the first date in `raw_body` that parses, trying the patterns in
/// order. Parsed wall-clock times are taken as UTC.
pub fn extract_timestamp(raw_body: &str) -> Option<DateTime<Utc>> {
    for pattern in DATE_PATTERNS.iter() {
        for caps in pattern.captures_iter(raw_body) {
            let Some(found) = caps.get(1) else {
                continue;
            };
            if let Some(parsed) = parse_month_day_year(found.as_str()) {
                return Some(parsed);
            }
        }
    }

    for caps in NUMERIC_DATE_PATTERN.captures_iter(raw_body) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        // Day-first as written by the local mail clients; month-first only
        // when day-first cannot be a real date.
        let date = NaiveDate::from_ymd_opt(year, second, first)
            .or_else(|| NaiveDate::from_ymd_opt(year, first, second));
        if let Some(date) = date.and_then(|date| date.and_hms_opt(0, 0, 0)) {
            return Some(date.and_utc());
        }
    }

    None
}

fn parse_month_day_year(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, MONTH_DAY_YEAR_FORMAT)
        .ok()
        .map(|value| value.and_utc())
}

/// Recovers the author's address from a body whose adapter reported none.
///
/// Only the text before the first forwarded `From:` marker is searched, so
/// addresses from the quoted chain are never picked. Returns an empty string
/// when nothing is found.
pub fn extract_sender_email(body_text: &str) -> String {
    let own_part = match FORWARD_MARKER.find(body_text) {
        Some(found) => &body_text[..found.start()],
        None => body_text,
    };

    for pattern in PIPE_EMAIL_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(own_part) {
            return caps[1].to_ascii_lowercase();
        }
    }

    if let Some(caps) = MAILTO_PATTERN.captures(own_part) {
        return caps[1].to_ascii_lowercase();
    }

    // Signatures sit at the end, so the last address wins.
    BARE_EMAIL_PATTERN
        .find_iter(own_part)
        .last()
        .map(|found| found.as_str().to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sent_header_with_weekday() {
        let body = "text\nFrom: someone\nSent: Friday, November 29, 2024 2:04 PM\nTo: x";
        assert_eq!(
            extract_timestamp(body),
            Some(Utc.with_ymd_and_hms(2024, 11, 29, 14, 4, 0).unwrap())
        );
    }

    #[test]
    fn sent_header_without_weekday() {
        let body = "Sent: March 3, 2025 11:30 AM";
        assert_eq!(
            extract_timestamp(body),
            Some(Utc.with_ymd_and_hms(2025, 3, 3, 11, 30, 0).unwrap())
        );
    }

    #[test]
    fn bare_month_day_year() {
        let body = "On January 15, 2025 9:05 PM the job failed";
        assert_eq!(
            extract_timestamp(body),
            Some(Utc.with_ymd_and_hms(2025, 1, 15, 21, 5, 0).unwrap())
        );
    }

    #[test]
    fn numeric_date_is_day_first() {
        assert_eq!(
            extract_timestamp("звіт за 05/03/2025"),
            Some(Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap())
        );
        // 13 cannot be a month, so it is read month-first.
        assert_eq!(
            extract_timestamp("report 03/13/2025"),
            Some(Utc.with_ymd_and_hms(2025, 3, 13, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn no_date_yields_none() {
        assert_eq!(extract_timestamp("nothing useful"), None);
        assert_eq!(extract_timestamp(""), None);
    }

    #[test]
    fn sender_prefers_pipe_separator() {
        let body = "Thanks\nwrite to info@corp.com\nIvan Petrenko | ivan@client.com | +380\n";
        assert_eq!(extract_sender_email(body), "ivan@client.com");
    }

    #[test]
    fn sender_uses_mailto_link() {
        let body = "see docs@corp.com\n<a href=\"mailto:Olena@Client.com\">Olena</a>";
        assert_eq!(extract_sender_email(body), "olena@client.com");
    }

    #[test]
    fn sender_takes_last_bare_address_before_quote() {
        let body = "ping first@a.com\nregards, last@b.com\nFrom: quoted@c.com\nSent: x";
        assert_eq!(extract_sender_email(body), "last@b.com");
    }

    #[test]
    fn sender_ignores_quoted_chain() {
        let body = "no address here\nFrom: quoted@c.com";
        assert_eq!(extract_sender_email(body), "");
    }
}
