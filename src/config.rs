use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};

/// How an exported CSV leaves the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Returned as an attachment in the response.
    Inline,
    /// Written under the export directory; the path is returned.
    Local,
    /// Uploaded to the Supabase bucket; the public URL is returned.
    Remote,
}

impl FromStr for Delivery {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Delivery::Inline),
            "local" => Ok(Delivery::Local),
            "remote" => Ok(Delivery::Remote),
            other => Err(AppError::Config(format!(
                "EXPORT_DELIVERY must be one of inline, local, remote (got {other})"
            ))),
        }
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Delivery::Inline => "inline",
            Delivery::Local => "local",
            Delivery::Remote => "remote",
        })
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
    pub bucket: String,
    pub groups_table: String,
    pub members_table: String,
    pub contacts_table: String,
}

/// Random pause inserted between per-group calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub min: Duration,
    pub max: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(1000),
            max: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub session_dir: PathBuf,
    pub export_dir: PathBuf,
    pub delivery: Delivery,
    pub supabase: Option<SupabaseConfig>,
    pub throttle: Option<ThrottleConfig>,
    pub flood_sleep_threshold: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| AppError::Config(format!("PORT must be a port number (got {p})")))?,
            None => 8080,
        };

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_KEY")) {
            (Some(url), Some(key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                key,
                bucket: get("SUPABASE_BUCKET").unwrap_or_else(|| "my-bucket".to_string()),
                groups_table: get("SUPABASE_GROUPS_TABLE").unwrap_or_else(|| "groups".to_string()),
                members_table: get("SUPABASE_MEMBERS_TABLE")
                    .unwrap_or_else(|| "extracted_data".to_string()),
                contacts_table: get("SUPABASE_CONTACTS_TABLE")
                    .unwrap_or_else(|| "contacts".to_string()),
            }),
            (None, None) => None,
            _ => {
                return Err(AppError::Config(
                    "SUPABASE_URL and SUPABASE_KEY must be set together".to_string(),
                ))
            }
        };

        let delivery = match get("EXPORT_DELIVERY") {
            Some(v) => v.parse::<Delivery>()?,
            None if supabase.is_some() => Delivery::Remote,
            None => Delivery::Local,
        };
        if delivery == Delivery::Remote && supabase.is_none() {
            return Err(AppError::Config(
                "EXPORT_DELIVERY=remote requires SUPABASE_URL and SUPABASE_KEY".to_string(),
            ));
        }

        let throttle_enabled = get("EXTRACT_THROTTLE")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);
        let throttle = if throttle_enabled {
            let defaults = ThrottleConfig::default();
            let min = get_millis(&get, "EXTRACT_THROTTLE_MIN_MS")?.unwrap_or(defaults.min);
            let max = get_millis(&get, "EXTRACT_THROTTLE_MAX_MS")?.unwrap_or(defaults.max);
            if min > max {
                return Err(AppError::Config(
                    "EXTRACT_THROTTLE_MIN_MS must not exceed EXTRACT_THROTTLE_MAX_MS".to_string(),
                ));
            }
            Some(ThrottleConfig { min, max })
        } else {
            None
        };

        let flood_sleep_threshold = match get("FLOOD_SLEEP_THRESHOLD") {
            Some(v) => v.parse::<u32>().map_err(|_| {
                AppError::Config(format!("FLOOD_SLEEP_THRESHOLD must be a number of seconds (got {v})"))
            })?,
            None => 0,
        };

        Ok(Self {
            host,
            port,
            session_dir: PathBuf::from(get("SESSION_DIR").unwrap_or_else(|| "sessions".to_string())),
            export_dir: PathBuf::from(get("EXPORT_DIR").unwrap_or_else(|| "exports".to_string())),
            delivery,
            supabase,
            throttle,
            flood_sleep_threshold,
        })
    }
}

fn get_millis<G>(get: &G, key: &str) -> Result<Option<Duration>>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| AppError::Config(format!("{key} must be a number of milliseconds (got {v})"))),
        None => Ok(None),
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
