//! Database layer: repositories over PostgreSQL via sqlx.

pub mod errors;
pub mod handlers;
pub mod models;
