use std::path::PathBuf;

use thiserror::Error;

use headway_transit::error::TransitError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("fleet size must be greater than zero")]
    EmptyFleet,

    #[error(transparent)]
    Transit(#[from] TransitError),

    #[error("no viable candidate produced by any fleet configuration")]
    NoViableCandidate,

    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact error: {0}")]
    Artifact(#[from] csv::Error),

    #[error("artifact error: {0}")]
    Json(#[from] serde_json::Error),
}
