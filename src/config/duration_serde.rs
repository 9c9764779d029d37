//! Serde helpers for human-readable durations in the config file.
//!
//! Accepts either a number of seconds or a `humantime` string such as
//! `"30s"`, `"1m"` or `"2h30m"`, and always writes the string form back.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

pub mod duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration_str = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&duration_str)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl<'de> Visitor<'de> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration as seconds (number) or human-readable string (e.g. '2s', '1m', '1h30m')")
            }

            fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Duration::from_secs(seconds))
            }

            fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(seconds)
                    .map(Duration::from_secs)
                    .map_err(|_| de::Error::custom(format!("Duration must not be negative: {seconds}")))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                humantime::parse_duration(value)
                    .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super::duration")]
        value: Duration,
    }

    #[test]
    fn test_parses_human_readable_and_numeric() {
        let parsed: Holder = toml::from_str("value = \"1m30s\"").unwrap();
        assert_eq!(parsed.value, Duration::from_secs(90));

        let parsed: Holder = toml::from_str("value = 45").unwrap();
        assert_eq!(parsed.value, Duration::from_secs(45));
    }

    #[test]
    fn test_rejects_garbage_and_negative() {
        assert!(toml::from_str::<Holder>("value = \"soon\"").is_err());
        assert!(toml::from_str::<Holder>("value = -5").is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let out = toml::to_string(&Holder {
            value: Duration::from_secs(30),
        })
        .unwrap();
        assert!(out.contains("value = \"30s\""));
    }
}
