mod as_value;
mod condition;
mod connection;
mod database;
mod decode_type;
mod dialect;
mod driver;
mod entity;
mod error;
mod identifier;
mod marshal;
mod metadata;
mod partition;
mod query;
mod registry;
mod session;
mod util;
mod value;
mod xml;

pub use ::anyhow::Context;
pub use as_value::*;
pub use condition::*;
pub use connection::*;
pub use database::*;
pub use decode_type::*;
pub use dialect::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use identifier::*;
pub use marshal::*;
pub use metadata::*;
pub use partition::*;
pub use query::*;
pub use registry::*;
pub use session::*;
pub use util::*;
pub use value::*;
pub use xml::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
