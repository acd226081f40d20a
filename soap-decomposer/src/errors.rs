#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Got invalid basis parameters, tolerances or worker count
    Configuration(String),
    /// Tried to mix vectors or collections built from different bases, or got
    /// a coefficient tensor with the wrong shape for the declared basis
    IncompatibleBasis(String),
    /// Got an evaluation grid with values outside of the function domain
    InvalidDomain(String),
    /// Stored data is malformed or was written by an incompatible version
    Persistence(String),
    /// Index or range outside of a collection
    Index {
        /// the requested index (or end of range)
        index: usize,
        /// size of the collection
        len: usize,
    },
    /// A member of a parallel batch failed
    Batch {
        /// position of the first failing member in the batch
        position: usize,
        error: Box<Error>,
    },
    /// Error coming from the filesystem
    Io(std::io::Error),
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
    /// Error while reading or writing npy arrays
    Npy(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Configuration(e) => write!(f, "invalid configuration: {}", e),
            Error::IncompatibleBasis(e) => write!(f, "incompatible basis: {}", e),
            Error::InvalidDomain(e) => write!(f, "invalid domain: {}", e),
            Error::Persistence(e) => write!(f, "invalid stored data: {}", e),
            Error::Index { index, len } => write!(
                f, "index {} is out of range for a collection of {} elements", index, len
            ),
            Error::Batch { position, error } => write!(
                f, "batch member {} failed: {}", position, error
            ),
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Npy(e) => write!(f, "npy error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Configuration(_) |
            Error::IncompatibleBasis(_) |
            Error::InvalidDomain(_) |
            Error::Persistence(_) |
            Error::Index { .. } |
            Error::Npy(_) => None,
            Error::Batch { error, .. } => Some(&**error),
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
        }
    }
}

impl Error {
    /// Get the error at the origin of this one, going through batch errors
    pub fn root(&self) -> &Error {
        match self {
            Error::Batch { error, .. } => error.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::Io(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

impl From<ndarray_npy::ReadNpyError> for Error {
    fn from(error: ndarray_npy::ReadNpyError) -> Error {
        match error {
            ndarray_npy::ReadNpyError::Io(e) => Error::Io(e),
            other => Error::Npy(other.to_string()),
        }
    }
}

impl From<ndarray_npy::WriteNpyError> for Error {
    fn from(error: ndarray_npy::WriteNpyError) -> Error {
        match error {
            ndarray_npy::WriteNpyError::Io(e) => Error::Io(e),
            other => Error::Npy(other.to_string()),
        }
    }
}
