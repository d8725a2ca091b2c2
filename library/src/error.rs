use thiserror::Error;
use uuid::Uuid;

use crate::model::PortRef;

#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("Node {0} not found")]
    NodeNotFound(Uuid),
    #[error("Link {0} not found")]
    LinkNotFound(Uuid),
    #[error("Point {0} not found")]
    PointNotFound(Uuid),
    #[error("Port {0} not found")]
    PortNotFound(PortRef),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CanvasError {
    pub fn config(msg: impl Into<String>) -> Self {
        CanvasError::Config(msg.into())
    }
}
