//! Desired configuration for a Swagger-defined REST API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the store merges a new definition into an existing API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    #[default]
    Overwrite,
    Merge,
}

impl UpdateMode {
    /// Wire value forwarded to the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Overwrite => "overwrite",
            UpdateMode::Merge => "merge",
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overwrite" => Ok(UpdateMode::Overwrite),
            "merge" => Ok(UpdateMode::Merge),
            other => Err(ConfigError::InvalidUpdateMode(other.to_string())),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("invalid update mode {0:?} (expected \"overwrite\" or \"merge\")")]
    InvalidUpdateMode(String),

    #[error("invalid attributes: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Desired state of the REST API, supplied fresh on every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredConfiguration {
    /// Swagger/OpenAPI document, passed through untouched.
    pub definition_body: Vec<u8>,
    /// Forwarded only when set.
    pub fail_on_warnings: Option<bool>,
    pub update_mode: UpdateMode,
}

/// Resource attributes as the host framework stores them.
#[derive(Debug, Deserialize)]
struct Attributes {
    swagger: Option<String>,
    #[serde(default)]
    failonwarnings: Option<bool>,
    #[serde(default)]
    updatemode: Option<String>,
}

impl DesiredConfiguration {
    pub fn new(definition_body: impl Into<Vec<u8>>) -> Self {
        Self {
            definition_body: definition_body.into(),
            fail_on_warnings: None,
            update_mode: UpdateMode::default(),
        }
    }

    pub fn with_fail_on_warnings(mut self, fail_on_warnings: bool) -> Self {
        self.fail_on_warnings = Some(fail_on_warnings);
        self
    }

    pub fn with_update_mode(mut self, update_mode: UpdateMode) -> Self {
        self.update_mode = update_mode;
        self
    }

    /// Build from the resource's attribute bag
    /// (`swagger`, `failonwarnings`, `updatemode`).
    pub fn from_attributes(attributes: serde_json::Value) -> Result<Self, ConfigError> {
        let attrs: Attributes = serde_json::from_value(attributes)?;
        let swagger = attrs.swagger.ok_or(ConfigError::MissingAttribute("swagger"))?;
        let update_mode = match attrs.updatemode {
            Some(mode) => mode.parse()?,
            None => UpdateMode::default(),
        };

        Ok(Self {
            definition_body: swagger.into_bytes(),
            fail_on_warnings: attrs.failonwarnings,
            update_mode,
        })
    }
}
