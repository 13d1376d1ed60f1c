use serde::{Deserialize, Serialize};

/// The three-way classification of an error kind, per the "Error handling
/// design" contract,
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Programming error; the caller passed something the API forbids.
    Precondition,
    /// Recoverable, caller-facing failure (bad index, decode error, ...).
    Domain,
    /// Recoverable at the caller's discretion; ties to the allocator/budget.
    Resource,
}

/// Flat enumeration of every failure mode a public operation can return,
///
/// One variant per code in the exposed error table. There is no `Success`
/// variant — success is represented by `Ok(_)`.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TrotErrorKind {
    /// A null handle was used where one is forbidden, or an output location
    /// that must start empty was not.
    #[error("precondition violated")]
    PreconditionViolation,
    /// The global allocator reported failure.
    #[error("allocation failed")]
    AllocationFailed,
    /// A standard-library call failed.
    #[error("standard library failure")]
    StdLib,
    /// An index was zero, or its absolute value exceeded the container length.
    #[error("bad index")]
    BadIndex,
    /// An operation expected a different slot kind (Int vs. List).
    #[error("wrong kind")]
    WrongKind,
    /// A container already holds `MAX_CHILDREN` elements.
    #[error("list overflow")]
    ListOverflow,
    /// The requested operation is not valid in the current state.
    #[error("invalid operation")]
    InvalidOp,
    /// A tag value was out of range.
    #[error("bad tag")]
    BadTag,
    /// Division by zero.
    #[error("divide by zero")]
    DivideByZero,
    /// The input was not valid Unicode.
    #[error("unicode error")]
    Unicode,
    /// The textual form could not be parsed.
    #[error("decode error")]
    Decode,
    /// Charging an allocation would exceed the configured memory ceiling.
    #[error("memory limit reached")]
    MemoryLimitReached,
}

impl TrotErrorKind {
    /// Returns the human-readable string for this code, per the "helper maps
    /// codes to human-readable strings" contract,
    ///
    pub fn as_str(&self) -> &'static str {
        match self {
            TrotErrorKind::PreconditionViolation => "precondition violated",
            TrotErrorKind::AllocationFailed => "allocation failed",
            TrotErrorKind::StdLib => "standard library failure",
            TrotErrorKind::BadIndex => "bad index",
            TrotErrorKind::WrongKind => "wrong kind",
            TrotErrorKind::ListOverflow => "list overflow",
            TrotErrorKind::InvalidOp => "invalid operation",
            TrotErrorKind::BadTag => "bad tag",
            TrotErrorKind::DivideByZero => "divide by zero",
            TrotErrorKind::Unicode => "unicode error",
            TrotErrorKind::Decode => "decode error",
            TrotErrorKind::MemoryLimitReached => "memory limit reached",
        }
    }

    /// Classifies this error kind per spec.md §7,
    ///
    pub fn classify(&self) -> ErrorClass {
        match self {
            TrotErrorKind::PreconditionViolation => ErrorClass::Precondition,
            TrotErrorKind::AllocationFailed | TrotErrorKind::MemoryLimitReached => {
                ErrorClass::Resource
            }
            _ => ErrorClass::Domain,
        }
    }
}

/// Error type returned by every fallible public operation,
///
/// Carries the flat [`TrotErrorKind`] plus an optional index, which is the
/// only extra context any operation in this crate ever needs.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrotError {
    pub kind: TrotErrorKind,
    pub index: Option<i64>,
}

impl std::fmt::Display for TrotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(i) => write!(f, "{} (index {i})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for TrotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl TrotError {
    pub fn new(kind: TrotErrorKind) -> Self {
        Self { kind, index: None }
    }

    pub fn with_index(kind: TrotErrorKind, index: i64) -> Self {
        Self {
            kind,
            index: Some(index),
        }
    }

    pub fn classify(&self) -> ErrorClass {
        self.kind.classify()
    }
}

impl From<TrotErrorKind> for TrotError {
    fn from(kind: TrotErrorKind) -> Self {
        TrotError::new(kind)
    }
}

pub type TrotResult<T> = Result<T, TrotError>;
