//! Error type for the facade crate.

use provdoc_template::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The configuration parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration text is not valid YAML for [`DocsConfig`](crate::DocsConfig).
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T> = std::result::Result<T, Error>;
