mod constraints;
mod copy;
mod crud;
mod fetch;
mod mass;
mod migration;
mod round_trip;

use crate::{
    constraints::constraints,
    copy::copy,
    crud::crud,
    fetch::{fetch, pagination},
    mass::mass,
    migration::{migration, migration_batches, migration_failure},
    round_trip::round_trip,
};
use datalite::Connection;
use log::LevelFilter;
use std::env;

#[doc(hidden)]
pub use log;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Run the shared behaviour suite against `connection`.
pub async fn execute_tests<C: Connection>(mut connection: C) {
    crud(&mut connection).await;
    round_trip(&mut connection).await;
    constraints(&mut connection).await;
    fetch(&mut connection).await;
    pagination(&mut connection).await;
    mass(&mut connection).await;
    migration(&mut connection).await;
    migration_batches(&mut connection).await;
    migration_failure(&mut connection).await;
}

/// Copy a batch from `source` into `target`, two connections to distinct stores.
pub async fn execute_copy_tests<C: Connection>(mut source: C, mut target: C) {
    copy(&mut source, &mut target).await;
}

/// Run the code with logging turned off, evaluates to the value of the code.
#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = $crate::log::max_level();
        $crate::log::set_max_level($crate::log::LevelFilter::Off);
        let result = { $($code)+ };
        $crate::log::set_max_level(level);
        result
    }};
}
