/// Durable record models
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub user_id: String,
    pub nickname: String,
    pub phone: Option<String>,
    pub qq: Option<String>,
    pub wechat: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Durable room record. `status` holds the terminal truth once the live
/// cache entry is gone; `archived_snapshot` is the JSON-serialized live
/// state captured on read after close.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RoomRow {
    pub room_id: String,
    pub owner_id: String,
    pub origin: String,
    pub destination: String,
    pub depart_on: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub archived_snapshot: Option<String>,
}

/// Membership ledger entry: one row per join event, append-only. Exits
/// never touch the ledger, so it answers "which rooms has this user ever
/// joined" independent of the cache.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MembershipRow {
    pub membership_id: String,
    pub room_id: String,
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
}

/// Field patch for user updates; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub qq: Option<String>,
    pub wechat: Option<String>,
}
