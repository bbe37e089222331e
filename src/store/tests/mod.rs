//! Shared store backend tests
//!
//! The same test functions run against SQLite and PostgreSQL:
//!
//! - **SQLite**: in-memory databases, run with every `cargo test`
//! - **PostgreSQL**: testcontainers-backed, run with `cargo test -- --ignored`
//!
//! ```bash
//! cargo test                       # Run fast SQLite tests only
//! cargo test -- --ignored          # Run PostgreSQL integration tests (requires Docker)
//! cargo test -- --include-ignored  # Run all tests
//! ```
