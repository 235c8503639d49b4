mod as_value;
mod builder;
mod config;
mod db;
mod decode_type;
pub mod dialect;
mod error;
mod executor;
mod find;
mod model;
mod preload;
mod query;
mod record;
mod registry;
mod relation;
mod scanner;
mod schema;
mod tag;
mod temporal;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use builder::*;
pub use config::*;
pub use db::*;
pub use decode_type::*;
pub use dialect::{Dialect, DialectRegistry};
pub use error::*;
pub use executor::*;
pub use find::*;
pub use model::*;
pub use preload::*;
pub use query::*;
pub use record::*;
pub use registry::*;
pub use relation::*;
pub use scanner::*;
pub use schema::*;
pub use tag::*;
pub use temporal::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
