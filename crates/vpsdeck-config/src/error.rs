use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Config file not found. Looked in:\n\
        - $VPSDECK_CONFIG\n\
        - ./vpsdeck.yaml\n\
        - ./.vpsdeck/config.yaml\n\
        - ~/.config/vpsdeck/config.yaml"
    )]
    ConfigFileNotFound,

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Duplicate provider id: {0}")]
    DuplicateProvider(String),

    #[error("Provider '{id}': {message}")]
    InvalidProvider { id: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
