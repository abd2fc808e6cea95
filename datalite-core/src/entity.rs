use crate::{Executor, FieldDef, Identity, Result, Row, RowLabeled, Schema, record, schema_of};
use std::future::Future;

/// A record type persisted in its own table.
///
/// Usually implemented with `#[derive(Entity)]`, which lists the fields in declaration order,
/// serializes them in that same order and picks the one field of type [`Identity`] as the slot
/// where the engine attaches the row key.
pub trait Entity: Send + Sync + Sized + 'static {
    fn table_name() -> &'static str;

    /// Declared fields, in declaration order. The identity is not one of them.
    fn fields() -> &'static [FieldDef];

    fn identity(&self) -> Identity;

    fn set_identity(&mut self, identity: Identity);

    /// Values of the declared fields, aligned with [`Entity::fields`].
    fn row(&self) -> Row;

    /// Rebuild the declared fields from a row, columns are matched by label.
    fn from_row(row: RowLabeled) -> Result<Self>;

    fn schema() -> Result<&'static Schema> {
        schema_of::<Self>()
    }

    /// Make sure the table exists, see [`record::markup`].
    fn markup<Exec: Executor>(
        executor: &mut Exec,
    ) -> impl Future<Output = Result<&'static Schema>> + Send {
        record::markup::<Self, Exec>(executor)
    }

    fn drop_table<Exec: Executor>(
        executor: &mut Exec,
        if_exists: bool,
    ) -> impl Future<Output = Result<()>> + Send {
        record::drop_table::<Self, Exec>(executor, if_exists)
    }

    /// Insert this instance as a new row and attach the identity it received.
    fn create<Exec: Executor>(
        &mut self,
        executor: &mut Exec,
    ) -> impl Future<Output = Result<i64>> + Send {
        record::create(executor, self)
    }

    /// Overwrite the row of this instance.
    fn update<Exec: Executor>(
        &self,
        executor: &mut Exec,
    ) -> impl Future<Output = Result<()>> + Send {
        record::update(executor, self)
    }

    /// Delete the row of this instance, the instance keeps its identity.
    fn remove<Exec: Executor>(
        &self,
        executor: &mut Exec,
    ) -> impl Future<Output = Result<()>> + Send {
        record::remove(executor, self)
    }
}
