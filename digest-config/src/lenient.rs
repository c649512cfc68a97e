//! Scalars that may arrive as strings.
//!
//! Environment overrides always reach serde as strings (`DIGEST__EMAIL__SMTP_PORT=465`),
//! while YAML gives typed values. These helpers accept both.
use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw<T> {
    Typed(T),
    Text(String),
}

pub(crate) fn number<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Raw::<T>::deserialize(de)? {
        Raw::Typed(v) => Ok(v),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub(crate) fn optional_number<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<Raw<T>>::deserialize(de)? {
        None => Ok(None),
        Some(Raw::Typed(v)) => Ok(Some(v)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "super::number")]
        port: u16,
        #[serde(deserialize_with = "super::number")]
        on: bool,
        #[serde(default, deserialize_with = "super::optional_number")]
        hours: Option<u32>,
    }

    #[test]
    fn accepts_typed_and_textual_values() {
        let p: Probe = serde_json::from_str(r#"{"port": 465, "on": true, "hours": 9}"#).unwrap();
        assert_eq!((p.port, p.on, p.hours), (465, true, Some(9)));

        let p: Probe = serde_json::from_str(r#"{"port": "587", "on": "false"}"#).unwrap();
        assert_eq!((p.port, p.on, p.hours), (587, false, None));
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Probe>(r#"{"port": "smtp", "on": true}"#).is_err());
    }
}
