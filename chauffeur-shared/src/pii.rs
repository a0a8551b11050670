use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A wrapper for personal data (emails, phone numbers) that masks its value in
/// Debug and Display output. Serialization passes the real value through, so the
/// wrapper can sit inside API payloads while keeping `tracing` output clean.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> Masked<T> {
    fn masked(&self) -> String {
        let value = self.0.as_ref();
        match value.split_once('@') {
            Some((local, domain)) => {
                let first = local.chars().next().map(String::from).unwrap_or_default();
                format!("{}***@{}", first, domain)
            }
            None => {
                let visible: String = value
                    .chars()
                    .rev()
                    .take(2)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                format!("******{}", visible)
            }
        }
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_masked_in_logs() {
        let email = Masked("john@example.com");
        assert_eq!(format!("{}", email), "j***@example.com");
        assert_eq!(format!("{:?}", email), "j***@example.com");
    }

    #[test]
    fn test_phone_keeps_last_digits() {
        let phone = Masked("+973 33692021".to_string());
        assert_eq!(phone.to_string(), "******21");
    }

    #[test]
    fn test_serialization_is_transparent() {
        let email = Masked("john@example.com".to_string());
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"john@example.com\"");
    }
}
