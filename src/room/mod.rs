/// Room domain model
///
/// A room is the matchable entity: an owner, a capacity, a required
/// contact method and an open/closed status. Live membership lives in the
/// cache as [`RoomState`]; the durable [`RoomRow`](crate::db::models::RoomRow)
/// carries the permanent record and, once captured, the archived snapshot.

pub mod coordinator;
pub mod locks;

pub use coordinator::RoomLifecycleCoordinator;

use crate::db::models::RoomRow;
use crate::error::{WaypointError, WaypointResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Hard cap on room capacity
pub const MAX_ROOM_CAPACITY: u32 = 4;

/// Default page size for room queries
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Room lifecycle status. The only transition is OPEN -> CLOSED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Open,
    Closed,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Open => "open",
            RoomStatus::Closed => "closed",
        }
    }
}

impl FromStr for RoomStatus {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(RoomStatus::Open),
            "closed" => Ok(RoomStatus::Closed),
            other => Err(WaypointError::Internal(format!(
                "Unknown room status: {}",
                other
            ))),
        }
    }
}

/// Contact method a room requires from joining users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    Qq,
    Wechat,
    Phone,
    Unknown,
}

impl ContactMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::Qq => "qq",
            ContactMethod::Wechat => "wechat",
            ContactMethod::Phone => "phone",
            ContactMethod::Unknown => "unknown",
        }
    }
}

/// Live room state held in the cache, authoritative while the room is
/// active.
///
/// Invariants: `members.len() <= max_members`, the owner is a member from
/// creation onward, no user appears twice, and `status` never leaves
/// CLOSED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomState {
    pub room_id: String,
    pub owner_id: String,
    pub members: Vec<String>,
    pub max_members: u32,
    pub required_contact: ContactMethod,
    pub status: RoomStatus,
}

impl RoomState {
    pub fn is_full(&self) -> bool {
        self.members.len() as u32 >= self.max_members
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }
}

/// A room as returned by queries: the durable record plus whichever state
/// was available (archived snapshot or live cache entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    pub room_id: String,
    pub owner_id: String,
    pub origin: String,
    pub destination: String,
    pub depart_on: NaiveDate,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    /// Membership state, when either store still had it
    pub state: Option<RoomState>,
    /// Whether `state` came from the archived snapshot
    pub archived: bool,
}

impl RoomView {
    /// Assemble a view from the durable row and an optional state
    pub fn from_row(row: RoomRow, state: Option<RoomState>, archived: bool) -> WaypointResult<Self> {
        Ok(Self {
            room_id: row.room_id,
            owner_id: row.owner_id,
            origin: row.origin,
            destination: row.destination,
            depart_on: row.depart_on,
            status: row.status.parse()?,
            created_at: row.created_at,
            state,
            archived,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!("open".parse::<RoomStatus>().unwrap(), RoomStatus::Open);
        assert_eq!("closed".parse::<RoomStatus>().unwrap(), RoomStatus::Closed);
        assert!("reopened".parse::<RoomStatus>().is_err());
        assert_eq!(RoomStatus::Open.as_str(), "open");
    }

    #[test]
    fn test_room_state_capacity_and_membership() {
        let state = RoomState {
            room_id: "r".to_string(),
            owner_id: "a".to_string(),
            members: vec!["a".to_string(), "b".to_string()],
            max_members: 2,
            required_contact: ContactMethod::Phone,
            status: RoomStatus::Open,
        };

        assert!(state.is_full());
        assert!(state.has_member("a"));
        assert!(!state.has_member("c"));
    }

    #[test]
    fn test_state_serializes_with_lowercase_enums() {
        let state = RoomState {
            room_id: "r".to_string(),
            owner_id: "a".to_string(),
            members: vec!["a".to_string()],
            max_members: 3,
            required_contact: ContactMethod::Wechat,
            status: RoomStatus::Open,
        };

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"wechat\""));
        assert!(json.contains("\"open\""));

        let back: RoomState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
