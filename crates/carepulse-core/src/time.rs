use crate::error::{CoreError, Result};
use std::fmt;
use time::format_description::{OwnedFormatItem, well_known::Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Display format used by date pickers when none is configured.
pub const DEFAULT_DATE_FORMAT: &str = "MM/DD/YYYY";

/// A user-facing date pattern such as `MM/DD/YYYY` or `DD.MM.YYYY HH:mm`.
///
/// Supported tokens: `YYYY`, `MM`, `DD`, `HH` (24h), `hh` (12h), `mm`, `aa` (AM/PM).
/// Everything else is copied literally.
#[derive(Clone)]
pub struct DateFormat {
    pattern: String,
    description: OwnedFormatItem,
}

impl DateFormat {
    pub fn new(pattern: &str) -> Result<Self> {
        let description = time::format_description::parse_owned::<1>(&translate(pattern))
            .map_err(|e| CoreError::InvalidDateFormat(format!("{pattern}: {e}")))?;
        Ok(Self {
            pattern: pattern.to_string(),
            description,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn format_date(&self, date: Date) -> Result<String> {
        Ok(date.format(&self.description)?)
    }

    pub fn format_datetime(&self, datetime: PrimitiveDateTime) -> Result<String> {
        Ok(datetime.format(&self.description)?)
    }

    pub fn parse_date(&self, input: &str) -> Result<Date> {
        Date::parse(input.trim(), &self.description)
            .map_err(|e| CoreError::invalid_date(format!("'{input}' does not match {}: {e}", self.pattern)))
    }

    pub fn parse_datetime(&self, input: &str) -> Result<PrimitiveDateTime> {
        PrimitiveDateTime::parse(input.trim(), &self.description)
            .map_err(|e| CoreError::invalid_date(format!("'{input}' does not match {}: {e}", self.pattern)))
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_DATE_FORMAT.to_string(),
            description: OwnedFormatItem::from(format_description!("[month]/[day]/[year]")),
        }
    }
}

impl fmt::Debug for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DateFormat").field(&self.pattern).finish()
    }
}

fn translate(pattern: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("YYYY", "[year]"),
        ("MM", "[month]"),
        ("DD", "[day]"),
        ("HH", "[hour]"),
        ("hh", "[hour repr:12]"),
        ("mm", "[minute]"),
        ("aa", "[period]"),
    ];

    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;
    'outer: while !rest.is_empty() {
        for (token, item) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(item);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '[' {
                out.push_str("[[");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}

/// Parse an HTML date input value (`YYYY-MM-DD`).
pub fn parse_iso_date(input: &str) -> Result<Date> {
    Date::parse(input.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| CoreError::invalid_date(format!("'{input}': {e}")))
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_iso_date(date: Date) -> Result<String> {
    Ok(date.format(format_description!("[year]-[month]-[day]"))?)
}

/// Parse an HTML datetime-local input value (`YYYY-MM-DDTHH:MM`).
pub fn parse_local_datetime(input: &str) -> Result<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        input.trim(),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    )
    .map_err(|e| CoreError::invalid_date(format!("'{input}': {e}")))
}

pub fn format_local_datetime(datetime: PrimitiveDateTime) -> Result<String> {
    Ok(datetime.format(format_description!("[year]-[month]-[day]T[hour]:[minute]"))?)
}

/// Midnight UTC of the given date, RFC 3339 encoded, as stored by the backend.
pub fn date_to_rfc3339(date: Date) -> Result<String> {
    Ok(date.midnight().assume_utc().format(&Rfc3339)?)
}

pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Serde adapter for `Option<Date>` encoded as `YYYY-MM-DD`.
pub mod serde_iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(value: &Option<Date>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => {
                let formatted = super::format_iso_date(*date).map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&formatted)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if !s.trim().is_empty() => super::parse_iso_date(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn default_format_round_trips() {
        let fmt = DateFormat::default();
        assert_eq!(fmt.pattern(), "MM/DD/YYYY");
        assert_eq!(fmt.format_date(date!(1990 - 07 - 04)).unwrap(), "07/04/1990");
        assert_eq!(fmt.parse_date("07/04/1990").unwrap(), date!(1990 - 07 - 04));
    }

    #[test]
    fn custom_pattern_with_time() {
        let fmt = DateFormat::new("DD.MM.YYYY HH:mm").unwrap();
        let parsed = fmt.parse_datetime("31.12.2024 18:05").unwrap();
        assert_eq!(parsed, datetime!(2024-12-31 18:05));
        assert_eq!(fmt.format_datetime(parsed).unwrap(), "31.12.2024 18:05");
    }

    #[test]
    fn literal_brackets_are_escaped() {
        let fmt = DateFormat::new("[YYYY]").unwrap();
        assert_eq!(fmt.format_date(date!(2001 - 01 - 01)).unwrap(), "[2001]");
    }

    #[test]
    fn rejects_mismatched_input() {
        let fmt = DateFormat::default();
        let err = fmt.parse_date("1990-07-04").unwrap_err();
        assert!(matches!(err, CoreError::InvalidDate(_)));
    }

    #[test]
    fn optional_date_serde() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Holder {
            #[serde(default, with = "serde_iso_date")]
            date: Option<Date>,
        }

        let json = serde_json::to_string(&Holder { date: Some(date!(1985 - 11 - 02)) }).unwrap();
        assert_eq!(json, r#"{"date":"1985-11-02"}"#);
        let back: Holder = serde_json::from_str(r#"{"date":""}"#).unwrap();
        assert!(back.date.is_none());
        let missing: Holder = serde_json::from_str("{}").unwrap();
        assert!(missing.date.is_none());
    }

    #[test]
    fn iso_and_rfc3339_helpers() {
        let d = parse_iso_date("2000-02-29").unwrap();
        assert_eq!(format_iso_date(d).unwrap(), "2000-02-29");
        assert_eq!(date_to_rfc3339(d).unwrap(), "2000-02-29T00:00:00Z");
        assert!(parse_iso_date("2001-02-29").is_err());
    }
}
