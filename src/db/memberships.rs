/// Membership ledger accessors
use crate::db::models::MembershipRow;
use crate::error::{WaypointError, WaypointResult};
use sqlx::SqlitePool;

/// Durable accessor for the append-only membership ledger
#[derive(Clone)]
pub struct MembershipRepo {
    db: SqlitePool,
}

impl MembershipRepo {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append a join event. The ledger is never updated or deleted.
    pub async fn insert(&self, entry: &MembershipRow) -> WaypointResult<MembershipRow> {
        let result = sqlx::query(
            "INSERT INTO membership_ledger (membership_id, room_id, user_id, joined_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&entry.membership_id)
        .bind(&entry.room_id)
        .bind(&entry.user_id)
        .bind(entry.joined_at)
        .execute(&self.db)
        .await
        .map_err(WaypointError::Database)?;

        if result.rows_affected() != 1 {
            return Err(WaypointError::OperationFailed(
                "Membership insert affected no rows".to_string(),
            ));
        }

        Ok(entry.clone())
    }

    /// All join events for a user, oldest first
    pub async fn select_by_user(&self, user_id: &str) -> WaypointResult<Vec<MembershipRow>> {
        sqlx::query_as::<_, MembershipRow>(
            "SELECT membership_id, room_id, user_id, joined_at
             FROM membership_ledger WHERE user_id = ?1 ORDER BY joined_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(WaypointError::Database)
    }

    /// Join events for a room, oldest first
    pub async fn select_by_room(&self, room_id: &str) -> WaypointResult<Vec<MembershipRow>> {
        sqlx::query_as::<_, MembershipRow>(
            "SELECT membership_id, room_id, user_id, joined_at
             FROM membership_ledger WHERE room_id = ?1 ORDER BY joined_at ASC",
        )
        .bind(room_id)
        .fetch_all(&self.db)
        .await
        .map_err(WaypointError::Database)
    }

    /// Number of join events recorded for a user
    pub async fn count_by_user(&self, user_id: &str) -> WaypointResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM membership_ledger WHERE user_id = ?1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await
                .map_err(WaypointError::Database)?;
        Ok(row.0)
    }
}
