//! Read only access patterns rebuilding typed instances.
//!
//! Every fetch returns rows in identity order (insertion order) and binds its values as
//! parameters, with the exception of [`fetch_if`] which writes a caller supplied predicate.

use crate::{
    AsValue, BinaryOp, BinaryOpType, Conjunction, Driver, Entity, Executor, Expression,
    IDENTITY_COLUMN, Operand, Result, Schema, SqlWriter, Value, record, schema_of,
    stream::{StreamExt, TryStreamExt},
};
use std::ops::{Bound, RangeBounds};

/// A 1-indexed page of `size` rows.
///
/// Page 0 is treated as page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    pub number: u64,
    pub size: u64,
}

impl Page {
    pub const fn new(number: u64, size: u64) -> Self {
        Self { number, size }
    }
    /// Largest row count a store accepts in `LIMIT` and `OFFSET`.
    pub const MAX_ROWS: u64 = i64::MAX as u64;

    /// Rows in this page, capped at [`Page::MAX_ROWS`].
    pub const fn limit(&self) -> u64 {
        if self.size > Self::MAX_ROWS {
            Self::MAX_ROWS
        } else {
            self.size
        }
    }

    /// Rows to skip before this page, capped at [`Page::MAX_ROWS`].
    pub const fn offset(&self) -> u64 {
        let offset = self.number.saturating_sub(1).saturating_mul(self.size);
        if offset > Self::MAX_ROWS {
            Self::MAX_ROWS
        } else {
            offset
        }
    }
}

/// A select ready to be prepared, with the values to bind.
struct Statement {
    schema: &'static Schema,
    sql: String,
    values: Vec<Value>,
}

impl Statement {
    fn select<Exec: Executor>(
        executor: &Exec,
        schema: &'static Schema,
        columns: &[&str],
        condition: &dyn Expression,
        values: Vec<Value>,
        page: Option<Page>,
    ) -> Self {
        let mut sql = String::with_capacity(128);
        executor.driver().sql_writer().write_select(
            &mut sql,
            columns,
            schema.table,
            condition,
            page.map(|v| v.limit()),
            page.map(|v| v.offset()),
        );
        Self {
            schema,
            sql,
            values,
        }
    }

    /// Select of every column.
    fn rows<Exec: Executor>(
        executor: &Exec,
        schema: &'static Schema,
        condition: &dyn Expression,
        values: Vec<Value>,
        page: Option<Page>,
    ) -> Self {
        let columns = schema.column_names().collect::<Vec<_>>();
        Self::select(executor, schema, &columns, condition, values, page)
    }
}

async fn fetch_rows<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    statement: Result<Statement>,
) -> Result<Vec<E>> {
    let Statement {
        schema,
        sql,
        values,
    } = statement?;
    let mut query = executor.prepare(sql).await?;
    query.bind_row(values)?;
    executor
        .fetch(&mut query)
        .map(|row| row.and_then(|row| record::reconstruct::<E>(schema, row)))
        .try_collect()
        .await
}

/// Condition matching `field` against `value`, `IS NULL` when the value is null.
fn equality<'a>(
    schema: &'a Schema,
    field: &'a str,
    value: Value,
) -> Result<(BinaryOp<Operand<'a>, Operand<'a>>, Vec<Value>)> {
    let column = schema.require_column(field)?;
    Ok(if value.is_null() {
        (
            BinaryOp::new(BinaryOpType::Is, Operand::Column(column.name), Operand::Null),
            vec![],
        )
    } else {
        (
            BinaryOp::new(
                BinaryOpType::Equal,
                Operand::Column(column.name),
                Operand::QuestionMark,
            ),
            vec![value.convert_to(&column.value)?],
        )
    })
}

/// The instance with identity `identity`, if any.
pub fn fetch_from<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    identity: i64,
) -> impl Future<Output = Result<Option<E>>> + Send {
    let statement = schema_of::<E>().map(|schema| {
        Statement::rows(
            executor,
            schema,
            &record::identity_equals(),
            vec![Value::Int64(Some(identity))],
            Some(Page::new(1, 1)),
        )
    });
    async move { Ok(fetch_rows(executor, statement).await?.into_iter().next()) }
}

/// Whether a row with identity `identity` exists.
pub fn is_fetchable<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    identity: i64,
) -> impl Future<Output = Result<bool>> + Send {
    let statement = schema_of::<E>().map(|schema| {
        Statement::select(
            executor,
            schema,
            &[IDENTITY_COLUMN],
            &record::identity_equals(),
            vec![Value::Int64(Some(identity))],
            Some(Page::new(1, 1)),
        )
    });
    async move {
        let Statement { sql, values, .. } = statement?;
        let mut query = executor.prepare(sql).await?;
        query.bind_row(values)?;
        let rows = executor.fetch(&mut query).try_collect::<Vec<_>>().await?;
        Ok(!rows.is_empty())
    }
}

/// The first instance, in identity order, whose `field` equals `value`.
pub fn fetch_equals<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    field: &str,
    value: impl AsValue,
) -> impl Future<Output = Result<Option<E>>> + Send {
    let statement = schema_of::<E>().and_then(|schema| {
        let (condition, values) = equality(schema, field, value.as_value())?;
        Ok(Statement::rows(
            executor,
            schema,
            &condition,
            values,
            Some(Page::new(1, 1)),
        ))
    });
    async move { Ok(fetch_rows(executor, statement).await?.into_iter().next()) }
}

/// Every instance, optionally paginated.
pub fn fetch_all<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    page: Option<Page>,
) -> impl Future<Output = Result<Vec<E>>> + Send {
    let statement = schema_of::<E>()
        .map(|schema| Statement::rows(executor, schema, &true, vec![], page));
    fetch_rows(executor, statement)
}

/// Every instance whose `field` equals `value`, optionally paginated.
pub fn fetch_where<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    field: &str,
    value: impl AsValue,
    page: Option<Page>,
) -> impl Future<Output = Result<Vec<E>>> + Send {
    let statement = schema_of::<E>().and_then(|schema| {
        let (condition, values) = equality(schema, field, value.as_value())?;
        Ok(Statement::rows(executor, schema, &condition, values, page))
    });
    fetch_rows(executor, statement)
}

/// Every instance satisfying the raw SQL `predicate`, optionally paginated.
///
/// The predicate is written verbatim in the `WHERE` clause: it is neither parsed nor
/// validated, and it must never contain untrusted input.
pub fn fetch_if<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    predicate: &str,
    page: Option<Page>,
) -> impl Future<Output = Result<Vec<E>>> + Send {
    let statement = schema_of::<E>()
        .map(|schema| Statement::rows(executor, schema, &Operand::Raw(predicate), vec![], page));
    fetch_rows(executor, statement)
}

/// Every instance whose identity falls in `range`.
pub fn fetch_range<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    range: impl RangeBounds<i64>,
) -> impl Future<Output = Result<Vec<E>>> + Send {
    let mut conditions = Vec::with_capacity(2);
    let mut values = Vec::with_capacity(2);
    let mut bound = |op: BinaryOpType, value: i64| {
        conditions.push(BinaryOp::new(
            op,
            Operand::Column(IDENTITY_COLUMN),
            Operand::QuestionMark,
        ));
        values.push(Value::Int64(Some(value)));
    };
    match range.start_bound() {
        Bound::Included(v) => bound(BinaryOpType::GreaterEqual, *v),
        Bound::Excluded(v) => bound(BinaryOpType::Greater, *v),
        Bound::Unbounded => {}
    }
    match range.end_bound() {
        Bound::Included(v) => bound(BinaryOpType::LessEqual, *v),
        Bound::Excluded(v) => bound(BinaryOpType::Less, *v),
        Bound::Unbounded => {}
    }
    let statement = schema_of::<E>().map(|schema| {
        Statement::rows(executor, schema, &Conjunction(conditions), values, None)
    });
    fetch_rows(executor, statement)
}
