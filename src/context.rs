/// Application context and dependency injection
use crate::{
    cache::Cache,
    config::ServerConfig,
    db::{self, memberships::MembershipRepo, rooms::RoomRepo, users::UserRepo},
    error::WaypointResult,
    idgen::{IdMinter, MachineTag},
    room::RoomLifecycleCoordinator,
    users::UserDirectory,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub cache: Cache,
    pub minter: Arc<IdMinter>,
    pub rooms: Arc<RoomLifecycleCoordinator>,
    pub users: Arc<UserDirectory>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> WaypointResult<Self> {
        config.validate()?;

        // Initialize database
        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        // Initialize cache backend
        let cache = Cache::from_settings(&config.cache).await?;

        // One minter per machine tag, shared by every service
        let machine_tag = MachineTag::derive(config.idgen.machine_tag)?;
        let minter = Arc::new(IdMinter::new(
            machine_tag,
            Duration::from_millis(config.idgen.max_wait_ms),
        ));

        let user_repo = UserRepo::new(pool.clone());
        let room_repo = RoomRepo::new(pool.clone());
        let membership_repo = MembershipRepo::new(pool.clone());

        let rooms = Arc::new(RoomLifecycleCoordinator::new(
            cache.clone(),
            room_repo,
            user_repo.clone(),
            membership_repo,
            Arc::clone(&minter),
        ));
        let users = Arc::new(UserDirectory::new(user_repo, Arc::clone(&minter)));

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            cache,
            minter,
            rooms,
            users,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
