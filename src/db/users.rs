/// User record accessors
use crate::db::models::{UserPatch, UserRow};
use crate::error::{WaypointError, WaypointResult};
use sqlx::SqlitePool;

/// Durable accessor for user records
#[derive(Clone)]
pub struct UserRepo {
    db: SqlitePool,
}

impl UserRepo {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a user record
    pub async fn insert(&self, user: &UserRow) -> WaypointResult<UserRow> {
        let result = sqlx::query(
            "INSERT INTO user (user_id, nickname, phone, qq, wechat, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&user.user_id)
        .bind(&user.nickname)
        .bind(&user.phone)
        .bind(&user.qq)
        .bind(&user.wechat)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .map_err(WaypointError::Database)?;

        if result.rows_affected() != 1 {
            return Err(WaypointError::OperationFailed(
                "User insert affected no rows".to_string(),
            ));
        }

        Ok(user.clone())
    }

    /// Update only the populated fields of a patch
    pub async fn update(&self, user_id: &str, patch: &UserPatch) -> WaypointResult<UserRow> {
        let mut sets = Vec::new();
        let mut binds: Vec<&str> = Vec::new();

        if let Some(nickname) = &patch.nickname {
            sets.push("nickname");
            binds.push(nickname);
        }
        if let Some(phone) = &patch.phone {
            sets.push("phone");
            binds.push(phone);
        }
        if let Some(qq) = &patch.qq {
            sets.push("qq");
            binds.push(qq);
        }
        if let Some(wechat) = &patch.wechat {
            sets.push("wechat");
            binds.push(wechat);
        }

        if sets.is_empty() {
            return self
                .select_by_id(user_id)
                .await?
                .ok_or_else(|| WaypointError::NotFound(format!("User {} not found", user_id)));
        }

        let assignments = sets
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ?{}", col, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE user SET {} WHERE user_id = ?{}",
            assignments,
            sets.len() + 1
        );

        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let result = query
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(WaypointError::Database)?;

        if result.rows_affected() != 1 {
            return Err(WaypointError::NotFound(format!(
                "User {} not found",
                user_id
            )));
        }

        self.select_by_id(user_id)
            .await?
            .ok_or_else(|| WaypointError::NotFound(format!("User {} not found", user_id)))
    }

    /// Fetch a user by id
    pub async fn select_by_id(&self, user_id: &str) -> WaypointResult<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT user_id, nickname, phone, qq, wechat, created_at
             FROM user WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(WaypointError::Database)
    }

    /// List users, newest first
    pub async fn select_many(&self, offset: i64, limit: i64) -> WaypointResult<Vec<UserRow>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT user_id, nickname, phone, qq, wechat, created_at
             FROM user ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .map_err(WaypointError::Database)
    }

    /// Total user count
    pub async fn count(&self) -> WaypointResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user")
            .fetch_one(&self.db)
            .await
            .map_err(WaypointError::Database)?;
        Ok(row.0)
    }
}
