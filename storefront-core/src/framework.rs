use sqlx::PgPool;

/// Runs single-statement queries against the pool.
///
/// Queries are modelled as plain structs with a
/// `kanau::processor::Processor` implementation on this type. Multi-statement
/// work takes a `sqlx::Transaction` directly instead.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

pub type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// Current UTC time as stored in `TIMESTAMP` columns.
pub fn now_utc() -> time::PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    time::PrimitiveDateTime::new(now.date(), now.time())
}
