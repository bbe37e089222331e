use thiserror::Error;

/// PostgREST / PostgreSQL error codes meaning the requested column or table
/// does not exist in the store's schema.
const SCHEMA_ERROR_CODES: &[&str] = &[
    "42703",    // undefined_column
    "42P01",    // undefined_table
    "PGRST200", // relationship not found in schema cache
    "PGRST204", // column not found in schema cache
    "PGRST205", // table not found in schema cache
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to {backend} store: {message}")]
    Connect {
        backend: &'static str,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Store API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl StoreError {
    /// Whether the error means the query referenced a column or table the
    /// store's schema doesn't have.
    pub fn is_schema_error(&self) -> bool {
        match self {
            StoreError::Api { code: Some(code), .. } => SCHEMA_ERROR_CODES.contains(&code.as_str()),
            #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
            StoreError::Sqlx(sqlx::Error::ColumnNotFound(_)) => true,
            #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
            StoreError::Sqlx(sqlx::Error::Database(db)) => {
                if let Some(code) = db.code()
                    && SCHEMA_ERROR_CODES.contains(&&*code)
                {
                    return true;
                }
                // SQLite reports every prepare failure as SQLITE_ERROR; only the message differs
                let message = db.message();
                message.starts_with("no such column") || message.starts_with("no such table")
            }
            _ => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
