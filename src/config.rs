//! Loader configuration.
//!
//! Configuration is a YAML file with the SODA connection details nested under
//! `socrata` and the workflow settings at the top level. It is loaded once at
//! startup and never mutated afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::LoaderError;

/// Domain used when the config does not name one.
pub const DEFAULT_DOMAIN: &str = "opendata.socrata.com";

/// Poll delay used when the config does not set `delay`.
pub const DEFAULT_DELAY_SECS: u64 = 60;

/// Global request timeout used when the config does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// How the uploaded file is applied to the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMethod {
    /// Replace all rows; the draft is created with `copySchema`.
    Replace,
    /// Append rows; the draft is created with a full `copy`.
    Append,
}

impl PublishMethod {
    /// Value of the `method` parameter on the import endpoint.
    pub fn import_method(&self) -> &'static str {
        match self {
            PublishMethod::Replace => "replace",
            PublishMethod::Append => "append",
        }
    }

    /// Value of the `method` parameter on the draft-copy endpoint.
    ///
    /// A replace throws the rows away anyway, so only the schema is copied.
    pub fn copy_method(&self) -> &'static str {
        match self {
            PublishMethod::Replace => "copySchema",
            PublishMethod::Append => "copy",
        }
    }
}

/// Connection settings for the SODA API.
#[derive(Clone, Debug, Deserialize)]
pub struct SocrataConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub app_token: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl SocrataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

/// The full loader configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub socrata: SocrataConfig,
    /// UID of the dataset being updated, e.g. `abcd-1234`.
    pub uid: String,
    pub method: PublishMethod,
    pub filename: PathBuf,
    #[serde(default)]
    pub skip: Option<u32>,
    /// Seconds to wait between polls.
    #[serde(default)]
    pub delay: Option<u64>,
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub pre_command: Option<String>,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

impl Config {
    /// Delay between poll attempts, falling back to [`DEFAULT_DELAY_SECS`].
    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs(self.delay.unwrap_or(DEFAULT_DELAY_SECS))
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.socrata.domain.trim().is_empty() {
            return Err(LoaderError::InvalidConfig(
                "socrata.domain must not be empty".to_string(),
            ));
        }
        if self.socrata.app_token.trim().is_empty() {
            return Err(LoaderError::InvalidConfig(
                "socrata.app_token must not be empty".to_string(),
            ));
        }
        if self.uid.trim().is_empty() {
            return Err(LoaderError::InvalidConfig(
                "uid must not be empty".to_string(),
            ));
        }
        if self.filename.as_os_str().is_empty() {
            return Err(LoaderError::InvalidConfig(
                "filename must not be empty".to_string(),
            ));
        }
        if self.socrata.username.is_some() != self.socrata.password.is_some() {
            tracing::warn!(
                "Only one of socrata.username/socrata.password is set; basic auth disabled"
            );
        }
        Ok(())
    }
}

/// Reads and validates a config file.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid YAML for
/// [`Config`], or fails [`Config::validate`].
pub fn load_config(path: &Path) -> Result<Config, LoaderError> {
    let text = fs::read_to_string(path).map_err(|source| LoaderError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let config = from_yaml_str(&text).map_err(|source| LoaderError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;

    Ok(config)
}

/// Parses a config from YAML text without validating it.
pub fn from_yaml_str(text: &str) -> Result<Config, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

/// Parses a config from raw bytes.
///
/// Exposed for the fuzz targets.
#[cfg(feature = "fuzzing")]
pub fn from_yaml_slice(bytes: &[u8]) -> Result<Config, serde_yaml::Error> {
    serde_yaml::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
socrata:
  username: loader@example.gov
  password: hunter2
  app_token: TOKEN
  domain: data.example.gov
uid: abcd-1234
method: replace
filename: data.csv
skip: 1
delay: 5
publish: true
pre_command: echo hi
"#;

    #[test]
    fn parses_full_config() {
        let config = from_yaml_str(FULL).expect("parse");
        assert_eq!(config.socrata.domain, "data.example.gov");
        assert_eq!(config.method, PublishMethod::Replace);
        assert_eq!(config.skip, Some(1));
        assert_eq!(config.poll_delay(), Duration::from_secs(5));
        assert!(config.publish);
        assert_eq!(config.pre_command.as_deref(), Some("echo hi"));
        config.validate().expect("valid");
    }

    #[test]
    fn defaults_apply_to_minimal_config() {
        let config = from_yaml_str(
            "socrata:\n  app_token: T\nuid: abcd-1234\nmethod: append\nfilename: rows.csv\n",
        )
        .expect("parse");
        assert_eq!(config.socrata.domain, DEFAULT_DOMAIN);
        assert_eq!(config.poll_delay(), Duration::from_secs(DEFAULT_DELAY_SECS));
        assert_eq!(
            config.socrata.timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert!(!config.publish);
        assert!(config.socrata.username.is_none());
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = from_yaml_str(
            "socrata:\n  app_token: T\nuid: abcd-1234\nmethod: upsert\nfilename: rows.csv\n",
        );
        assert!(err.is_err());
    }

    #[test]
    fn method_selects_endpoint_variants() {
        assert_eq!(PublishMethod::Replace.copy_method(), "copySchema");
        assert_eq!(PublishMethod::Append.copy_method(), "copy");
        assert_eq!(PublishMethod::Replace.import_method(), "replace");
        assert_eq!(PublishMethod::Append.import_method(), "append");
    }

    #[test]
    fn empty_uid_fails_validation() {
        let config = from_yaml_str(
            "socrata:\n  app_token: T\nuid: ''\nmethod: append\nfilename: rows.csv\n",
        )
        .expect("parse");
        assert!(matches!(
            config.validate(),
            Err(LoaderError::InvalidConfig(msg)) if msg.contains("uid")
        ));
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Path::new("does/not/exist.yml")).unwrap_err();
        assert!(matches!(err, LoaderError::ConfigRead { .. }));
    }
}
