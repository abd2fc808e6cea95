mod as_value;
mod connection;
pub mod constraint;
mod descriptor;
mod driver;
mod entity;
mod error;
mod executor;
mod expression;
mod fetch;
mod mass;
mod migration;
mod prepared;
mod query;
pub mod record;
mod schema;
pub mod temporal;
mod transaction;
mod util;
mod value;
mod writer;

pub use ::anyhow::Context;
pub use as_value::*;
pub use connection::*;
pub use constraint::{ConstraintRule, ConstraintViolation};
pub use descriptor::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use executor::*;
pub use expression::*;
pub use fetch::*;
pub use mass::*;
pub use migration::*;
pub use prepared::*;
pub use query::*;
pub use record::{markup, reconstruct, serialize};
pub use schema::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub use writer::*;
pub mod stream {
    pub use ::futures::stream::*;
}
