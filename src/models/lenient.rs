//! Deserializers that accept both JSON strings and numbers.
//!
//! Frontends send `api_id` and group ids either way depending on where the
//! value came from (form input vs. a previous JSON response).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Int(i64),
    Str(String),
}

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n.to_string(),
        Raw::Str(s) => s,
    })
}

pub fn ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Raw>::deserialize(deserializer)?
        .into_iter()
        .map(|raw| match raw {
            Raw::Int(n) => Ok(n),
            Raw::Str(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| D::Error::custom(format!("invalid group id: {s}"))),
        })
        .collect()
}
