use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// A whole document could not be parsed or has the wrong top-level shape.
    Document { source: String, message: String },
    /// A required key is absent from a dictionary.
    MissingKey { path: String, key: String },
    /// A node exists but has the wrong plist type.
    WrongType { path: String, expected: &'static str },
    /// An array is shorter than the index being read.
    IndexOutOfRange { path: String, index: usize },
}

impl ReconError {
    pub fn document(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Document { source: source.into(), message: message.into() }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document { source, message } => {
                write!(f, "cannot parse document {source}: {message}")
            }
            Self::MissingKey { path, key } => write!(f, "{path}: missing key '{key}'"),
            Self::WrongType { path, expected } => write!(f, "{path}: expected {expected}"),
            Self::IndexOutOfRange { path, index } => {
                write!(f, "{path}: no element at index {index}")
            }
        }
    }
}

impl std::error::Error for ReconError {}
