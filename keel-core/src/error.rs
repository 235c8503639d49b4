use crate::Error;
use std::fmt::{self, Display, Formatter};

/// Failure categories callers can branch on.
///
/// Errors travel as [`anyhow::Error`] with context layers on top, the kind stays reachable through
/// [`ErrorKind::of`] no matter how many layers were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A single-record lookup matched nothing.
    RecordNotFound,
    /// The model definition is not usable (bad tag, duplicate keys, conflicting declarations).
    InvalidModel(String),
    /// No registered model maps to the table.
    ModelNotFound(String),
    RelationNotFound {
        model: String,
        relation: String,
    },
    DuplicateKey(String),
    ForeignKeyViolation(String),
    ConnectionFailed(String),
    InvalidSql(String),
    UnknownDialect(String),
}

impl ErrorKind {
    pub fn of(error: &Error) -> Option<&ErrorKind> {
        error.downcast_ref::<ErrorKind>()
    }
    pub fn invalid_model(message: impl Into<String>) -> Error {
        Error::new(ErrorKind::InvalidModel(message.into()))
    }
    pub fn invalid_sql(message: impl Into<String>) -> Error {
        Error::new(ErrorKind::InvalidSql(message.into()))
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::RecordNotFound => f.write_str("Record not found"),
            ErrorKind::InvalidModel(v) => write!(f, "Invalid model: {v}"),
            ErrorKind::ModelNotFound(v) => write!(f, "No model is registered for table `{v}`"),
            ErrorKind::RelationNotFound { model, relation } => {
                write!(f, "Model `{model}` has no relation named `{relation}`")
            }
            ErrorKind::DuplicateKey(v) => write!(f, "Duplicate key: {v}"),
            ErrorKind::ForeignKeyViolation(v) => write!(f, "Foreign key violation: {v}"),
            ErrorKind::ConnectionFailed(v) => write!(f, "Connection failed: {v}"),
            ErrorKind::InvalidSql(v) => write!(f, "Invalid SQL: {v}"),
            ErrorKind::UnknownDialect(v) => write!(f, "Unknown dialect `{v}`"),
        }
    }
}

impl std::error::Error for ErrorKind {}

pub trait ErrorExt {
    fn kind(&self) -> Option<&ErrorKind>;
    fn is_not_found(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::RecordNotFound))
    }
}

impl ErrorExt for Error {
    fn kind(&self) -> Option<&ErrorKind> {
        ErrorKind::of(self)
    }
}
