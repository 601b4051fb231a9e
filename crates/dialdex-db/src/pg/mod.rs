//! PostgreSQL repository implementations

mod call_log;
mod contact;

pub use call_log::PgCallLogRepository;
pub use contact::PgContactRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub contacts: PgContactRepository,
    pub call_logs: PgCallLogRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            contacts: PgContactRepository::new(pool.clone()),
            call_logs: PgCallLogRepository::new(pool),
        }
    }
}
