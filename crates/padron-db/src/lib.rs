//! Persistence layer for the padron client registry.
//!
//! Owns the connection pool, the embedded migrations, the row models for the
//! `clients` table, and the parameterized query functions. Higher layers
//! (padron-core, padron-cli) never write SQL themselves.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
