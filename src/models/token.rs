//! Auth token model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API token resolving to a user. Issued outside this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    /// Opaque token key sent in the Authorization header
    pub token: String,
    /// Owning user ID
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}
