pub use datalite_core::*;
pub use datalite_macros::Entity;
