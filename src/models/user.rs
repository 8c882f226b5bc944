use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A rider who can book rides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub contact: String,
    pub created_at: DateTime<Utc>,
}
