use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::models::lenient;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default, alias = "apiId", deserialize_with = "lenient::string")]
    pub api_id: String,
    #[serde(default, alias = "apiHash")]
    pub api_hash: String,
    #[serde(default, alias = "phoneNumber")]
    pub phone_number: String,
}

impl Credentials {
    /// Presence check only; the platform decides whether the values are valid.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("api_id", &self.api_id),
            ("api_hash", &self.api_hash),
            ("phone_number", &self.phone_number),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidRequest(format!(
                "Missing required parameters: {}",
                missing.join(", ")
            )))
        }
    }

    /// File-system safe key for the session file of this phone number.
    pub fn session_key(&self) -> Result<String> {
        let key: String = self
            .phone_number
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if key.is_empty() {
            return Err(AppError::InvalidRequest(format!(
                "Invalid phone number: {}",
                self.phone_number
            )));
        }
        Ok(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractType {
    Groups,
    Contacts,
}

impl ExtractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractType::Groups => "groups",
            ExtractType::Contacts => "contacts",
        }
    }
}

impl fmt::Display for ExtractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groups" => Ok(ExtractType::Groups),
            "contacts" => Ok(ExtractType::Contacts),
            _ => Err(AppError::InvalidRequest(format!("Invalid extract type: {s}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractionRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default, alias = "extractType")]
    pub extract_type: String,
    #[serde(default, alias = "selectedGroups", deserialize_with = "lenient::ids")]
    pub selected_groups: Vec<i64>,
}

impl ExtractionRequest {
    /// Parses the mode and checks credentials; runs before any session is opened.
    pub fn validated_mode(&self) -> Result<ExtractType> {
        let mode = self.extract_type.parse::<ExtractType>()?;
        self.credentials.validate()?;
        Ok(mode)
    }
}
