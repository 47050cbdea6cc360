/// Waypoint - travel & study companion matchmaking server
///
/// Users create and join capacity-limited rooms. Live room state lives in
/// a TTL-capable cache keyed by `"RoomState:<roomId>"`; durable records
/// and the append-only membership ledger live in SQLite. Every entity id
/// comes from the in-process snowflake-style minter.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod idgen;
pub mod jobs;
pub mod room;
pub mod server;
pub mod users;

pub use context::AppContext;
pub use error::{WaypointError, WaypointResult};
