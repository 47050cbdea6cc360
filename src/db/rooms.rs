/// Room record accessors
use crate::db::models::RoomRow;
use crate::error::{WaypointError, WaypointResult};
use crate::room::RoomStatus;
use chrono::NaiveDate;
use sqlx::SqlitePool;

/// Search criteria for durable room records
#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    /// Substring match on the destination
    pub destination: Option<String>,
    pub status: Option<RoomStatus>,
    pub depart_from: Option<NaiveDate>,
    pub depart_to: Option<NaiveDate>,
}

enum Bind {
    Text(String),
    Date(NaiveDate),
}

impl RoomFilter {
    /// Build the WHERE clause and its bind list
    fn where_clause(&self) -> (String, Vec<Bind>) {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        if let Some(destination) = &self.destination {
            conditions.push(format!("destination LIKE ?{}", binds.len() + 1));
            binds.push(Bind::Text(format!("%{}%", destination)));
        }
        if let Some(status) = self.status {
            conditions.push(format!("status = ?{}", binds.len() + 1));
            binds.push(Bind::Text(status.as_str().to_string()));
        }
        if let Some(from) = self.depart_from {
            conditions.push(format!("depart_on >= ?{}", binds.len() + 1));
            binds.push(Bind::Date(from));
        }
        if let Some(to) = self.depart_to {
            conditions.push(format!("depart_on <= ?{}", binds.len() + 1));
            binds.push(Bind::Date(to));
        }

        if conditions.is_empty() {
            (String::new(), binds)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), binds)
        }
    }
}

/// Durable accessor for room records
#[derive(Clone)]
pub struct RoomRepo {
    db: SqlitePool,
}

impl RoomRepo {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a room record
    pub async fn insert(&self, room: &RoomRow) -> WaypointResult<RoomRow> {
        let result = sqlx::query(
            "INSERT INTO room (room_id, owner_id, origin, destination, depart_on, status, created_at, archived_snapshot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&room.room_id)
        .bind(&room.owner_id)
        .bind(&room.origin)
        .bind(&room.destination)
        .bind(room.depart_on)
        .bind(&room.status)
        .bind(room.created_at)
        .bind(&room.archived_snapshot)
        .execute(&self.db)
        .await
        .map_err(WaypointError::Database)?;

        if result.rows_affected() != 1 {
            return Err(WaypointError::OperationFailed(
                "Room insert affected no rows".to_string(),
            ));
        }

        Ok(room.clone())
    }

    /// Fetch a room by id
    pub async fn select_by_id(&self, room_id: &str) -> WaypointResult<Option<RoomRow>> {
        sqlx::query_as::<_, RoomRow>(
            "SELECT room_id, owner_id, origin, destination, depart_on, status, created_at, archived_snapshot
             FROM room WHERE room_id = ?1",
        )
        .bind(room_id)
        .fetch_optional(&self.db)
        .await
        .map_err(WaypointError::Database)
    }

    /// Update the durable status of a room
    pub async fn update_status(&self, room_id: &str, status: RoomStatus) -> WaypointResult<()> {
        let result = sqlx::query("UPDATE room SET status = ?1 WHERE room_id = ?2")
            .bind(status.as_str())
            .bind(room_id)
            .execute(&self.db)
            .await
            .map_err(WaypointError::Database)?;

        if result.rows_affected() != 1 {
            return Err(WaypointError::OperationFailed(format!(
                "Status update for room {} affected no rows",
                room_id
            )));
        }

        Ok(())
    }

    /// Capture the archived snapshot, only while it is still unset
    pub async fn set_archived_snapshot(
        &self,
        room_id: &str,
        snapshot_json: &str,
    ) -> WaypointResult<()> {
        sqlx::query(
            "UPDATE room SET archived_snapshot = ?1
             WHERE room_id = ?2 AND archived_snapshot IS NULL",
        )
        .bind(snapshot_json)
        .bind(room_id)
        .execute(&self.db)
        .await
        .map_err(WaypointError::Database)?;

        Ok(())
    }

    /// Search rooms by filter, newest first
    pub async fn select_many(
        &self,
        filter: &RoomFilter,
        offset: i64,
        limit: i64,
    ) -> WaypointResult<Vec<RoomRow>> {
        let (clause, binds) = filter.where_clause();
        let sql = format!(
            "SELECT room_id, owner_id, origin, destination, depart_on, status, created_at, archived_snapshot
             FROM room{} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            clause,
            binds.len() + 1,
            binds.len() + 2
        );

        let mut query = sqlx::query_as::<_, RoomRow>(&sql);
        for bind in &binds {
            query = match bind {
                Bind::Text(value) => query.bind(value.clone()),
                Bind::Date(value) => query.bind(*value),
            };
        }

        query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await
            .map_err(WaypointError::Database)
    }

    /// Count rooms matching a filter
    pub async fn count(&self, filter: &RoomFilter) -> WaypointResult<i64> {
        let (clause, binds) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM room{}", clause);

        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        for bind in &binds {
            query = match bind {
                Bind::Text(value) => query.bind(value.clone()),
                Bind::Date(value) => query.bind(*value),
            };
        }

        let row = query
            .fetch_one(&self.db)
            .await
            .map_err(WaypointError::Database)?;
        Ok(row.0)
    }
}
