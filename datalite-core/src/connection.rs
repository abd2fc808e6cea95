use crate::{Driver, Executor, Result};

pub trait Connection: Executor {
    /// Open a connection to the store at `url` (`<driver name>://<location>?<options>`).
    fn connect(url: &str) -> impl Future<Output = Result<Self>> + Send;

    /// Start a transaction, it must be committed explicitly.
    fn begin(
        &mut self,
    ) -> impl Future<Output = Result<<Self::Driver as Driver>::Transaction<'_>>> + Send;
}
