//! Counts typed as JSON Schema `integer`
//!
//! The schema layer accepts `1.0` as an integer; serde's `u64` does not.
//! These helpers accept any non-negative whole number in either form.

use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Int(u64),
    Float(f64),
}

fn whole<E: Error>(raw: Raw) -> Result<u64, E> {
    match raw {
        Raw::Int(n) => Ok(n),
        Raw::Float(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Ok(f as u64)
        }
        Raw::Float(f) => Err(E::custom(format!(
            "expected a non-negative whole number, got {}",
            f
        ))),
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    whole(Raw::deserialize(deserializer)?)
}

pub fn option<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<Raw>::deserialize(deserializer)?
        .map(whole)
        .transpose()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Counts {
        #[serde(deserialize_with = "super::deserialize")]
        total: u64,
        #[serde(default, deserialize_with = "super::option")]
        limit: Option<u64>,
    }

    #[test]
    fn test_whole_floats_accepted() {
        let counts: Counts = serde_json::from_value(json!({"total": 3.0, "limit": 7})).unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.limit, Some(7));

        let counts: Counts = serde_json::from_value(json!({"total": 0})).unwrap();
        assert_eq!(counts.limit, None);

        let counts: Counts = serde_json::from_value(json!({"total": 1, "limit": null})).unwrap();
        assert_eq!(counts.limit, None);
    }

    #[test]
    fn test_fractions_and_negatives_rejected() {
        assert!(serde_json::from_value::<Counts>(json!({"total": 1.5})).is_err());
        assert!(serde_json::from_value::<Counts>(json!({"total": -1})).is_err());
        assert!(serde_json::from_value::<Counts>(json!({"total": 1, "limit": 2.25})).is_err());
    }
}
