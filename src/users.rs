/// User directory
///
/// Users carry the contact fields (phone, QQ, WeChat) rooms gate joins on.
/// Ids are minted, and contact updates write only the supplied fields so a
/// user can add a phone number without touching the rest of the record.
use crate::db::models::{UserPatch, UserRow};
use crate::db::users::UserRepo;
use crate::error::{WaypointError, WaypointResult};
use crate::idgen::IdMinter;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// User creation request
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub nickname: String,
    pub phone: Option<String>,
    pub qq: Option<String>,
    pub wechat: Option<String>,
}

/// User management service
pub struct UserDirectory {
    users: UserRepo,
    minter: Arc<IdMinter>,
}

impl UserDirectory {
    pub fn new(users: UserRepo, minter: Arc<IdMinter>) -> Self {
        Self { users, minter }
    }

    /// Register a user with a minted id
    pub async fn create_user(&self, request: CreateUser) -> WaypointResult<UserRow> {
        if request.nickname.trim().is_empty() {
            return Err(WaypointError::Validation(
                "Nickname cannot be empty".to_string(),
            ));
        }

        let user = UserRow {
            user_id: self.minter.mint().await?.to_hex(),
            nickname: request.nickname,
            phone: request.phone,
            qq: request.qq,
            wechat: request.wechat,
            created_at: Utc::now(),
        };
        let user = self.users.insert(&user).await?;

        info!(user_id = %user.user_id, "User registered");
        Ok(user)
    }

    /// Fetch a user by id
    pub async fn get_user(&self, user_id: &str) -> WaypointResult<UserRow> {
        self.users
            .select_by_id(user_id)
            .await?
            .ok_or_else(|| WaypointError::NotFound(format!("User {} not found", user_id)))
    }

    /// Update the supplied fields only
    pub async fn update_user(&self, user_id: &str, patch: UserPatch) -> WaypointResult<UserRow> {
        self.users.update(user_id, &patch).await
    }
}
