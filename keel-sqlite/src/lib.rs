mod connection;
mod extract;
mod transaction;

pub use connection::*;
pub use transaction::*;

use keel_core::{Error, ErrorKind};

/// Translates a sqlx failure into the error kinds callers branch on.
pub(crate) fn map_error(error: sqlx::Error) -> Error {
    let kind = match &error {
        sqlx::Error::Database(database) => {
            let message = database.message().to_string();
            if database.is_unique_violation() {
                Some(ErrorKind::DuplicateKey(message))
            } else if database.is_foreign_key_violation() {
                Some(ErrorKind::ForeignKeyViolation(message))
            } else if message.contains("syntax error") {
                Some(ErrorKind::InvalidSql(message))
            } else {
                None
            }
        }
        sqlx::Error::Io(..)
        | sqlx::Error::Tls(..)
        | sqlx::Error::Configuration(..)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => Some(ErrorKind::ConnectionFailed(error.to_string())),
        _ => None,
    };
    log::error!("{error}");
    match kind {
        Some(kind) => Error::new(kind),
        None => Error::new(error),
    }
}
