//! Configuration for documentation rendering.
//!
//! ```yaml
//! delimiter: "!!!"
//! meta_marker: meta
//! engine: jinja
//! ```
//!
//! Every key is optional; missing keys take the defaults of
//! [`DocsConfig::default`].

use provdoc_meta::{MetaSyntax, DEFAULT_DELIMITER, DEFAULT_MARKER};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Template syntax used for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// `{{ fn .Field }}` directives.
    #[default]
    Directive,
    /// MiniJinja templates.
    Jinja,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocsConfig {
    /// Separator between metadata tokens. Defaults to `:`.
    pub delimiter: String,
    /// Word opening the metadata section. Defaults to `meta`.
    pub meta_marker: String,
    pub engine: EngineKind,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            meta_marker: DEFAULT_MARKER.to_string(),
            engine: EngineKind::default(),
        }
    }
}

impl DocsConfig {
    /// Parses and validates a YAML configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        tracing::debug!(
            delimiter = %config.delimiter,
            marker = %config.meta_marker,
            engine = ?config.engine,
            "loaded docs configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(Error::InvalidConfig("delimiter must not be empty".into()));
        }
        if self.meta_marker.is_empty() {
            return Err(Error::InvalidConfig("meta_marker must not be empty".into()));
        }
        if self.meta_marker.contains(self.delimiter.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "meta_marker {:?} must not contain the delimiter {:?}",
                self.meta_marker, self.delimiter
            )));
        }
        Ok(())
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.meta_marker = marker.into();
        self
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    /// Metadata framing described by this configuration.
    pub fn syntax(&self) -> MetaSyntax {
        MetaSyntax::new(self.delimiter.clone()).with_marker(self.meta_marker.clone())
    }
}
