use crate::{AsValue, Result};
use std::fmt::Display;

/// A statement prepared by the driver, with positional parameters.
///
/// * `bind` sets the next parameter, starting from the first one.
/// * `bind_index` sets the parameter at `index` (from 1) and continues from there.
/// * `clear_bindings` resets every parameter to null and starts over, so the same
///   statement can run again with new values.
///
/// ```rust,ignore
/// prepared.bind(42)?.bind("hello".to_string())?;
/// ```
pub trait Prepared: Send + Sync + Display {
    fn clear_bindings(&mut self) -> Result<&mut Self>;
    fn bind(&mut self, value: impl AsValue) -> Result<&mut Self>;
    fn bind_index(&mut self, value: impl AsValue, index: u64) -> Result<&mut Self>;
}
