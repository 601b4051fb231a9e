//! Dialdex DB - Database abstractions
//!
//! SQLx-based persistence layer for the directory and call-log tables.
//!
//! # Example
//!
//! ```rust,ignore
//! use dialdex_db::{create_pool, Repositories};
//!
//! let pool = create_pool("postgres://localhost/dialdex").await?;
//! let repos = Repositories::new(pool);
//!
//! // Use repositories
//! let contact = repos.contacts.find_by_number("+4915112345678").await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, create_pool_with_options, run_migrations, DbPool, PoolOptions};
pub use repo::*;
