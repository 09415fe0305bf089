//! Error types shared across the siteplan crates.

use thiserror::Error;

/// Result alias used throughout siteplan.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers before or outside of the search itself.
///
/// Placement infeasibility and unreachable operations are deliberately *not*
/// represented here: the search recovers from those locally.
#[derive(Debug, Error)]
pub enum Error {
    /// Site dimensions must both be positive.
    #[error("invalid site dimensions {width}x{length}: both must be positive")]
    InvalidDimensions { width: i64, length: i64 },

    /// A coordinate string could not be parsed as `"x,y"`.
    #[error("invalid coordinate `{0}`: expected \"x,y\"")]
    InvalidCoordinate(String),

    /// A structure, zone, utility or placement tag is not recognised.
    #[error("unknown {kind} `{value}`")]
    UnknownKind { kind: &'static str, value: String },

    /// An operation references an entity id that does not exist.
    #[error("operation {operation} references unknown entity id {entity}")]
    UnknownEntity { operation: usize, entity: usize },

    /// A cell was assigned two incompatible roles.
    #[error("cell {cell} is already {existing}, cannot mark it as {requested}")]
    CellConflict {
        cell: String,
        existing: String,
        requested: String,
    },

    /// A configured cell lies outside the site.
    #[error("cell {cell} lies outside the site")]
    OutOfBounds { cell: String },

    /// Any other semantic configuration problem.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed serialized input.
    #[error("parse error: {0}")]
    ParseError(String),

    /// I/O failure while reading or writing artifacts.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Broken internal invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if this error stems from caller-supplied configuration.
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::IoError(_) | Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_entity_message() {
        let err = Error::UnknownEntity {
            operation: 2,
            entity: 999,
        };
        assert_eq!(
            err.to_string(),
            "operation 2 references unknown entity id 999"
        );
        assert!(err.is_config_error());
    }

    #[test]
    fn test_io_error_is_not_config() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(!err.is_config_error());
    }
}
