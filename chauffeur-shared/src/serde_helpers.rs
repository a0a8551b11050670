//! Deserializers for the loosely typed JSON the booking forms submit: dates
//! arrive as `YYYY-MM-DD` or full timestamps, counts as numbers or numeric
//! strings, and optional fields as empty strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt::Display;
use std::str::FromStr;

/// Parse a date or timestamp. Bare dates resolve to midnight UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw)))
}

/// Like [`deserialize_datetime`], but `null` and `""` become `None`.
pub fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_datetime(s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date: {}", s))),
    }
}

/// `null` and `""` become `None`; anything else goes through `FromStr`.
pub fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u32),
    Text(String),
}

/// Accepts `3` or `"3"`; an empty string counts as zero.
pub fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) if s.trim().is_empty() => Ok(0),
        NumberOrString::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// Optional variant of [`lenient_u32`] for partial updates.
pub fn lenient_optional_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DecimalOrString {
    Number(f64),
    Text(String),
}

/// Accepts `12.5` or `"12.5"`; `null` and `""` become `None`.
pub fn lenient_optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<DecimalOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(DecimalOrString::Number(n)) => Ok(Some(n)),
        Some(DecimalOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(DecimalOrString::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Use together with `#[serde(default)]`.
pub fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[derive(Deserialize)]
    struct Form {
        #[serde(deserialize_with = "deserialize_datetime")]
        pickup: DateTime<Utc>,
        #[serde(default, deserialize_with = "deserialize_optional_datetime")]
        drop: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "lenient_u32")]
        passengers: u32,
        #[serde(default, deserialize_with = "deserialize_some")]
        driver: Option<Option<String>>,
        #[serde(default, deserialize_with = "lenient_optional_f64")]
        amount: Option<f64>,
    }

    #[test]
    fn test_bare_date_is_midnight_utc() {
        let dt = parse_datetime("2025-03-14").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2025, 3, 14, 0));
    }

    #[test]
    fn test_rfc3339_is_converted_to_utc() {
        let dt = parse_datetime("2025-03-14T10:30:00+03:00").unwrap();
        assert_eq!(dt.hour(), 7);
    }

    #[test]
    fn test_form_with_empty_optionals() {
        let form: Form = serde_json::from_str(
            r#"{"pickup":"2025-03-14","drop":"","passengers":"2"}"#,
        )
        .unwrap();
        assert_eq!(form.pickup.day(), 14);
        assert!(form.drop.is_none());
        assert_eq!(form.passengers, 2);
        assert!(form.driver.is_none());
    }

    #[test]
    fn test_explicit_null_is_distinguished_from_missing() {
        let form: Form = serde_json::from_str(
            r#"{"pickup":"2025-03-14T08:00","passengers":1,"driver":null}"#,
        )
        .unwrap();
        assert_eq!(form.driver, Some(None));
    }

    #[test]
    fn test_amount_accepts_numeric_strings() {
        let form: Form =
            serde_json::from_str(r#"{"pickup":"2025-03-14","amount":"50.5"}"#).unwrap();
        assert_eq!(form.amount, Some(50.5));

        let form: Form = serde_json::from_str(r#"{"pickup":"2025-03-14","amount":""}"#).unwrap();
        assert_eq!(form.amount, None);

        let form: Form = serde_json::from_str(r#"{"pickup":"2025-03-14","amount":75}"#).unwrap();
        assert_eq!(form.amount, Some(75.0));

        let res: Result<Form, _> =
            serde_json::from_str(r#"{"pickup":"2025-03-14","amount":"lots"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_garbage_date_is_rejected() {
        let res: Result<Form, _> = serde_json::from_str(r#"{"pickup":"tomorrow"}"#);
        assert!(res.is_err());
    }
}
