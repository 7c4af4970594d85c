//! Schema for `shaderlab.toml`. Every field is optional so a partial file only
//! overrides what it names; the server binary layers CLI flags and
//! environment variables on top and fills the rest with built-in defaults.
//!
//! ```toml
//! version = 1
//!
//! [server]
//! host = "0.0.0.0"
//! port = 5173
//!
//! [storage]
//! root = "~/projects/book-of-shaders"
//! shaders_dir = "src/shaders"
//! static_dir = "src"
//! cache_ttl = "5m"
//! ```
use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Paths are kept as written so the caller can expand `~` and `$VAR` and
/// resolve them against the project root.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    pub root: Option<String>,
    pub shaders_dir: Option<String>,
    pub static_dir: Option<String>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub cache_ttl: Option<Duration>,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            server: ServerSection::default(),
            storage: StorageSection::default(),
        }
    }
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

impl LabConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LabConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CURRENT_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CURRENT_VERSION}",
                self.version
            )));
        }

        if let Some(host) = &self.server.host {
            if host.trim().is_empty() {
                return Err(ConfigError::Invalid("server.host must not be empty".into()));
            }
        }

        if let Some(ttl) = self.storage.cache_ttl {
            if ttl.is_zero() {
                return Err(ConfigError::Invalid(
                    "storage.cache_ttl must be greater than zero".into(),
                ));
            }
        }

        for (field, value) in [
            ("storage.root", &self.storage.root),
            ("storage.shaders_dir", &self.storage.shaders_dir),
            ("storage.static_dir", &self.storage.static_dir),
        ] {
            if matches!(value, Some(path) if path.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }

        Ok(())
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v.trim())
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(v)
                .map(|secs| Some(Duration::from_secs(secs)))
                .map_err(|_| E::custom("duration must be non-negative"))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}
