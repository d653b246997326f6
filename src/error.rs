use std::{error::Error, fmt};

/// The lab engine's result type.
pub type Result<T> = std::result::Result<T, LabErr>;

/// Failures reported when a caller hands the engine something it cannot use.
#[derive(Debug)]
pub enum LabErr {
    /// An operation that needs a loaded dataset ran before any data existed.
    NotReady { op: &'static str },

    /// A shape invariant was violated (wrong feature length, label out of range).
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// A configured sampling range is empty or inverted.
    EmptyRange { what: &'static str },
}

impl fmt::Display for LabErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabErr::NotReady { op } => write!(f, "{op} requires a loaded dataset"),
            LabErr::SizeMismatch {
                what,
                got,
                expected,
            } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            LabErr::EmptyRange { what } => write!(f, "empty sampling range for {what}"),
        }
    }
}

impl Error for LabErr {}
