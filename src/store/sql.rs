//! SQL text shared by the SQLite and PostgreSQL backends.
//!
//! Every selected column is `CAST` to a fixed SQL type per [`ColumnKind`] so
//! rows decode the same way regardless of how the table declares them.

use super::{ColumnKind, Filter, SelectQuery, StoreResult, ensure_identifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    #[cfg(feature = "database-sqlite")]
    Sqlite,
    #[cfg(feature = "database-postgres")]
    Postgres,
}

impl Dialect {
    /// Placeholder of the first bind parameter.
    fn first_placeholder(self) -> &'static str {
        match self {
            #[cfg(feature = "database-sqlite")]
            Dialect::Sqlite => "?",
            #[cfg(feature = "database-postgres")]
            Dialect::Postgres => "$1",
        }
    }

    fn cast_type(self, kind: ColumnKind) -> &'static str {
        match self {
            #[cfg(feature = "database-sqlite")]
            Dialect::Sqlite => match kind {
                ColumnKind::Integer | ColumnKind::Boolean => "INTEGER",
                ColumnKind::Decimal => "REAL",
                ColumnKind::Text | ColumnKind::Timestamp => "TEXT",
            },
            #[cfg(feature = "database-postgres")]
            Dialect::Postgres => match kind {
                ColumnKind::Integer => "BIGINT",
                ColumnKind::Decimal => "DOUBLE PRECISION",
                ColumnKind::Text | ColumnKind::Timestamp => "TEXT",
                ColumnKind::Boolean => "BOOLEAN",
            },
        }
    }
}

/// Quote an identifier. Callers validate it first, so it never contains `"`.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

/// Filters compare as text so tenant ids match whether the column is
/// declared as text, uuid or integer.
fn where_clause(dialect: Dialect, filter: Option<&Filter>) -> String {
    match filter {
        Some(filter) => format!(
            " WHERE CAST({} AS TEXT) = {}",
            quote_ident(&filter.column),
            dialect.first_placeholder()
        ),
        None => String::new(),
    }
}

/// `SELECT COUNT(*)` over a table. The filter value, if any, binds as the
/// only parameter.
pub(crate) fn count_sql(
    dialect: Dialect,
    table: &str,
    filter: Option<&Filter>,
) -> StoreResult<String> {
    ensure_identifier(table)?;
    if let Some(filter) = filter {
        ensure_identifier(&filter.column)?;
    }
    Ok(format!(
        "SELECT COUNT(*) FROM {}{}",
        quote_ident(table),
        where_clause(dialect, filter)
    ))
}

pub(crate) fn select_sql(dialect: Dialect, query: &SelectQuery) -> StoreResult<String> {
    query.validate()?;

    let columns = query
        .columns
        .iter()
        .map(|c| {
            let ident = quote_ident(&c.name);
            format!("CAST({ident} AS {}) AS {ident}", dialect.cast_type(c.kind))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "SELECT {columns} FROM {}{}",
        quote_ident(&query.table),
        where_clause(dialect, query.filter.as_ref())
    );
    if let Some(order_by) = &query.order_by {
        sql.push_str(&format!(
            " ORDER BY {} {}",
            quote_ident(&order_by.column),
            order_by.order.as_sql()
        ));
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(sql)
}

/// JSON value for a float, `Null` for NaN or infinity.
pub(crate) fn f64_value(value: Option<f64>) -> serde_json::Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Column, SortOrder, StoreError};

    fn usage_query() -> SelectQuery {
        SelectQuery::new(
            "token_usage",
            vec![
                Column::new("tokens_in", ColumnKind::Integer),
                Column::new("estimated_cost", ColumnKind::Decimal),
                Column::new("created_at", ColumnKind::Timestamp),
            ],
        )
        .filter(Some(Filter::eq("client_id", "acme")))
        .order_by("created_at", SortOrder::Asc)
    }

    #[cfg(feature = "database-sqlite")]
    #[test]
    fn test_sqlite_select_sql() {
        let sql = select_sql(Dialect::Sqlite, &usage_query()).unwrap();
        assert_eq!(
            sql,
            "SELECT CAST(\"tokens_in\" AS INTEGER) AS \"tokens_in\", \
             CAST(\"estimated_cost\" AS REAL) AS \"estimated_cost\", \
             CAST(\"created_at\" AS TEXT) AS \"created_at\" \
             FROM \"token_usage\" WHERE CAST(\"client_id\" AS TEXT) = ? \
             ORDER BY \"created_at\" ASC"
        );
    }

    #[cfg(feature = "database-postgres")]
    #[test]
    fn test_postgres_select_sql_with_limit() {
        let query = usage_query().limit(1);
        let sql = select_sql(Dialect::Postgres, &query).unwrap();
        assert!(sql.contains("CAST(\"tokens_in\" AS BIGINT)"));
        assert!(sql.contains("CAST(\"estimated_cost\" AS DOUBLE PRECISION)"));
        assert!(sql.contains("WHERE CAST(\"client_id\" AS TEXT) = $1"));
        assert!(sql.ends_with("ORDER BY \"created_at\" ASC LIMIT 1"));
    }

    #[cfg(feature = "database-sqlite")]
    #[test]
    fn test_count_sql() {
        assert_eq!(
            count_sql(Dialect::Sqlite, "leads", None).unwrap(),
            "SELECT COUNT(*) FROM \"leads\""
        );
        assert_eq!(
            count_sql(Dialect::Sqlite, "leads", Some(&Filter::eq("client_id", "x"))).unwrap(),
            "SELECT COUNT(*) FROM \"leads\" WHERE CAST(\"client_id\" AS TEXT) = ?"
        );
    }

    #[cfg(feature = "database-sqlite")]
    #[test]
    fn test_count_sql_rejects_unsafe_table() {
        let result = count_sql(Dialect::Sqlite, "leads\"; --", None);
        assert!(matches!(result, Err(StoreError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_f64_value() {
        assert_eq!(f64_value(Some(0.5)), serde_json::json!(0.5));
        assert_eq!(f64_value(Some(f64::NAN)), serde_json::Value::Null);
        assert_eq!(f64_value(None), serde_json::Value::Null);
    }
}
