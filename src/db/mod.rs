pub mod entities;
pub mod enums;
pub mod error;
pub mod models;
pub mod repositories;
pub mod seed;
pub mod session;

pub use error::StorageError;
pub use session::{DatabaseConfig, SessionManager};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the microsecond precision both backends store.
pub(crate) fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
