//! Per-dataset cache configuration

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while building a [`CacheConfig`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Namespace must not be empty")]
    EmptyNamespace,

    /// Namespaces become part of store keys and file names
    #[error("Invalid namespace '{0}': use ASCII letters, digits, '_' or '-'")]
    InvalidNamespace(String),

    #[error("TTL must be greater than zero")]
    ZeroTtl,

    #[error("Schema version must not be empty")]
    EmptySchemaVersion,
}

/// Name of one logical cached dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::InvalidNamespace(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn payload_key(&self) -> String {
        format!("{}.payload", self.0)
    }

    pub(crate) fn stored_at_key(&self) -> String {
        format!("{}.stored_at", self.0)
    }

    pub(crate) fn version_key(&self) -> String {
        format!("{}.version", self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable settings for one cached dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    namespace: Namespace,
    ttl: Duration,
    schema_version: String,
}

impl CacheConfig {
    /// Builds a config, rejecting empty or unsafe values
    ///
    /// # Arguments
    /// * `namespace` - Dataset name, e.g. "professors"
    /// * `ttl` - Maximum age before an entry is stale
    /// * `schema_version` - Tag expected by this build; any other tag is a miss
    pub fn new(
        namespace: &str,
        ttl: Duration,
        schema_version: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let namespace = Namespace::parse(namespace)?;
        if ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }
        let schema_version = schema_version.into();
        if schema_version.is_empty() {
            return Err(ConfigError::EmptySchemaVersion);
        }
        Ok(Self {
            namespace,
            ttl,
            schema_version,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// TTL in milliseconds, saturating at `i64::MAX`
    pub fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Same dataset and TTL under a different schema version
    pub fn with_schema_version(&self, schema_version: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(self.namespace.as_str(), self.ttl, schema_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn test_valid_config() {
        let config = CacheConfig::new("professors", DAY * 60, "profV2").unwrap();
        assert_eq!(config.namespace().as_str(), "professors");
        assert_eq!(config.ttl_millis(), 5_184_000_000);
        assert_eq!(config.schema_version(), "profV2");
    }

    #[test]
    fn test_physical_keys_are_namespaced() {
        let ns = Namespace::parse("timetable_winter").unwrap();
        assert_eq!(ns.payload_key(), "timetable_winter.payload");
        assert_eq!(ns.stored_at_key(), "timetable_winter.stored_at");
        assert_eq!(ns.version_key(), "timetable_winter.version");
    }

    #[test]
    fn test_empty_namespace_rejected() {
        assert_eq!(
            CacheConfig::new("", DAY, "v1").unwrap_err(),
            ConfigError::EmptyNamespace
        );
    }

    #[test]
    fn test_unsafe_namespace_rejected() {
        for bad in ["../etc", "with space", "dots.inside", "slash/name"] {
            assert!(
                matches!(Namespace::parse(bad), Err(ConfigError::InvalidNamespace(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert_eq!(
            CacheConfig::new("majors", Duration::ZERO, "v1").unwrap_err(),
            ConfigError::ZeroTtl
        );
    }

    #[test]
    fn test_empty_version_rejected() {
        assert_eq!(
            CacheConfig::new("majors", DAY, "").unwrap_err(),
            ConfigError::EmptySchemaVersion
        );
    }

    #[test]
    fn test_with_schema_version_keeps_namespace_and_ttl() {
        let v2 = CacheConfig::new("professors", DAY, "profV2").unwrap();
        let v3 = v2.with_schema_version("profV3").unwrap();
        assert_eq!(v3.namespace(), v2.namespace());
        assert_eq!(v3.ttl(), v2.ttl());
        assert_eq!(v3.schema_version(), "profV3");
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let config = CacheConfig::new("forever", Duration::MAX, "v1").unwrap();
        assert_eq!(config.ttl_millis(), i64::MAX);
    }
}
