use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransitError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table: {0}")]
    Table(#[from] csv::Error),

    #[error("invalid time string: {0:?}")]
    InvalidTime(String),

    #[error("trip {id} ends at or before it starts")]
    NonPositiveDuration { id: String },

    #[error("trip {id} has no stop rows")]
    NoStopRows { id: String },

    #[error("no usable trips remained after loading the timetable")]
    EmptyCatalog,

    #[error("no usable stops remained after loading the stops table")]
    EmptyStops,
}
