//! The usage table layouts tenants have been deployed with.
//!
//! Usage tables differ in how they store token counts (one combined column
//! or separate input/output columns) and what the cost column is called.
//! [`USAGE_SHAPES`] lists every supported layout in the order they are
//! tried; each shape knows which columns to select and how to turn a row
//! into a [`UsageRecord`].

use crate::{
    models::UsageRecord,
    store::{Column, ColumnKind, Filter, Row, SelectQuery, SortOrder, row},
};

pub const CREATED_AT_COLUMN: &str = "created_at";

/// Cost columns in precedence order. A row's cost is the first non-null.
const COST_COLUMNS: &[&str] = &["cost", "estimated_cost"];

/// How a usage table stores token counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenColumns {
    /// One column with input + output tokens.
    Combined(&'static str),
    /// Input and output tokens in separate columns.
    Split {
        input: &'static str,
        output: &'static str,
    },
}

/// One usage table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageShape {
    /// Short name for logs.
    pub name: &'static str,
    pub tokens: TokenColumns,
    pub cost_column: &'static str,
}

/// Supported layouts, most common first.
pub const USAGE_SHAPES: [UsageShape; 4] = [
    UsageShape {
        name: "combined_tokens_cost",
        tokens: TokenColumns::Combined("tokens_used"),
        cost_column: "cost",
    },
    UsageShape {
        name: "split_tokens_cost",
        tokens: TokenColumns::Split {
            input: "tokens_in",
            output: "tokens_out",
        },
        cost_column: "cost",
    },
    UsageShape {
        name: "combined_tokens_estimated_cost",
        tokens: TokenColumns::Combined("tokens_used"),
        cost_column: "estimated_cost",
    },
    UsageShape {
        name: "split_tokens_estimated_cost",
        tokens: TokenColumns::Split {
            input: "tokens_in",
            output: "tokens_out",
        },
        cost_column: "estimated_cost",
    },
];

impl UsageShape {
    /// Columns to select: tokens, cost, then `created_at`.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = match self.tokens {
            TokenColumns::Combined(name) => vec![Column::new(name, ColumnKind::Integer)],
            TokenColumns::Split { input, output } => vec![
                Column::new(input, ColumnKind::Integer),
                Column::new(output, ColumnKind::Integer),
            ],
        };
        columns.push(Column::new(self.cost_column, ColumnKind::Decimal));
        columns.push(Column::new(CREATED_AT_COLUMN, ColumnKind::Timestamp));
        columns
    }

    /// Select of this shape over `table`, oldest first.
    pub fn query(&self, table: &str, filter: Option<Filter>) -> SelectQuery {
        SelectQuery::new(table, self.columns())
            .filter(filter)
            .order_by(CREATED_AT_COLUMN, SortOrder::Asc)
    }

    /// Normalize a row of this shape. Missing or null numbers count as zero.
    pub fn normalize(&self, row: &Row) -> UsageRecord {
        let tokens = match self.tokens {
            TokenColumns::Combined(name) => row::get_i64(row, name).unwrap_or(0),
            TokenColumns::Split { input, output } => {
                let input = row::get_i64(row, input).unwrap_or(0);
                input.saturating_add(row::get_i64(row, output).unwrap_or(0))
            }
        };
        let cost = COST_COLUMNS
            .iter()
            .find_map(|column| row::get_f64(row, column))
            .unwrap_or(0.0);

        UsageRecord {
            tokens,
            cost,
            created_at: row::get_timestamp(row, CREATED_AT_COLUMN),
        }
    }
}
