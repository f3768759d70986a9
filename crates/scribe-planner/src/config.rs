//! Planner configuration
//!
//! Loaded from TOML by the CLI; library callers usually start from
//! [`PlannerConfig::default`] and adjust with the `with_*` methods.
//!
//! ```toml
//! cycle_search_limit = 512
//! max_enumerated_paths = 64
//!
//! [schema.sign_interpretation]
//! table = "position_in_stream"
//!
//! [terminators.line]
//! start = 10
//! end = 11
//! ```

use crate::error::ConfigError;
use crate::hierarchy::TerminatorConfig;
use crate::schema::{EdgeTableSchema, SchemaOverrides, StreamType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Nodes the bounded cycle search may visit before falling back to a full
    /// stream check; `None` always runs the full check
    pub cycle_search_limit: Option<usize>,
    /// Upper bound on paths printed or collected by path enumeration callers
    pub max_enumerated_paths: usize,
    /// Table and column name overrides
    pub schema: SchemaOverrides,
    /// Terminator sentinels per hierarchy level
    pub terminators: TerminatorConfig,
}

impl PlannerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a cycle search budget (`None` skips straight to the full check)
    #[inline]
    #[must_use]
    pub fn with_cycle_search_limit(mut self, limit: Option<usize>) -> Self {
        self.cycle_search_limit = limit;
        self
    }

    /// With a path enumeration bound
    #[inline]
    #[must_use]
    pub fn with_max_enumerated_paths(mut self, max: usize) -> Self {
        self.max_enumerated_paths = max;
        self
    }

    /// With schema overrides
    #[inline]
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaOverrides) -> Self {
        self.schema = schema;
        self
    }

    /// With terminator sentinels
    #[inline]
    #[must_use]
    pub fn with_terminators(mut self, terminators: TerminatorConfig) -> Self {
        self.terminators = terminators;
        self
    }

    /// Parse and validate TOML
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded planner config from {}", path.as_ref().display());
        Self::from_toml_str(&raw)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_search_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "cycle_search_limit must be positive; omit it to always check the full stream".to_string(),
            ));
        }
        if self.max_enumerated_paths == 0 {
            return Err(ConfigError::Invalid(
                "max_enumerated_paths must be positive".to_string(),
            ));
        }
        for stream in StreamType::ALL {
            self.schema.resolve(stream)?;
        }
        self.terminators.check().map_err(ConfigError::Invalid)?;
        Ok(())
    }

    /// Resolved schema for `stream`
    pub fn schema_for(&self, stream: StreamType) -> Result<EdgeTableSchema, ConfigError> {
        Ok(self.schema.resolve(stream)?)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cycle_search_limit: Some(512),
            max_enumerated_paths: 64,
            schema: SchemaOverrides::default(),
            terminators: TerminatorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{Terminators, TextUnit};

    #[test]
    fn default_config_is_valid() {
        assert!(PlannerConfig::default().validate().is_ok());
    }

    #[test]
    fn builder_methods() {
        let config = PlannerConfig::new()
            .with_cycle_search_limit(None)
            .with_max_enumerated_paths(3);
        assert_eq!(config.cycle_search_limit, None);
        assert_eq!(config.max_enumerated_paths, 3);
    }

    #[test]
    fn parses_partial_toml() {
        let config = PlannerConfig::from_toml_str(
            r#"
            cycle_search_limit = 32

            [schema.text_fragment]
            table = "fragment_stream"

            [terminators.line]
            start = 40
            end = 41
            "#,
        )
        .unwrap();

        assert_eq!(config.cycle_search_limit, Some(32));
        assert_eq!(config.max_enumerated_paths, 64);
        assert_eq!(
            config.schema_for(StreamType::TextFragmentStream).unwrap().table,
            "fragment_stream"
        );
        assert_eq!(
            config.terminators.for_unit(TextUnit::Line),
            Some(Terminators::new(40, 41))
        );
        assert_eq!(
            config.terminators.for_unit(TextUnit::Manuscript),
            TerminatorConfig::default().for_unit(TextUnit::Manuscript)
        );
    }

    #[test]
    fn rejects_inconsistent_toml() {
        assert!(matches!(
            PlannerConfig::from_toml_str("max_enumerated_paths = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlannerConfig::from_toml_str("[schema.sign_interpretation]\ntable = \"\""),
            Err(ConfigError::Schema(_))
        ));
        assert!(matches!(
            PlannerConfig::from_toml_str("cycle_search_limit = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scribe.toml");
        std::fs::write(&path, "max_enumerated_paths = 8\n").unwrap();

        let config = PlannerConfig::load(&path).unwrap();
        assert_eq!(config.max_enumerated_paths, 8);

        assert!(matches!(
            PlannerConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
