/// Room lifecycle coordination
///
/// Orchestrates the identifier minter, the cache and the durable store for
/// every room operation. Live membership truth is the cached [`RoomState`];
/// the durable record carries permanence and, after close, the archived
/// snapshot. Store writes inside one operation happen in a fixed order and
/// are not transactional across stores; a failure aborts the operation
/// without compensating earlier writes.
use crate::cache::{tags, Cache, Ttl};
use crate::db::memberships::MembershipRepo;
use crate::db::models::{MembershipRow, RoomRow, UserRow};
use crate::db::rooms::{RoomFilter, RoomRepo};
use crate::db::users::UserRepo;
use crate::error::{WaypointError, WaypointResult};
use crate::idgen::IdMinter;
use crate::room::locks::RoomLocks;
use crate::room::{
    ContactMethod, RoomState, RoomStatus, RoomView, DEFAULT_PAGE_LIMIT, MAX_ROOM_CAPACITY,
};
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Room creation request
#[derive(Debug, Clone)]
pub struct CreateRoom {
    pub owner_id: String,
    pub max_members: u32,
    pub required_contact: ContactMethod,
    pub origin: String,
    pub destination: String,
    pub depart_on: NaiveDate,
}

/// Coordinator for the room state machine (OPEN -> CLOSED)
pub struct RoomLifecycleCoordinator {
    cache: Cache,
    rooms: RoomRepo,
    users: UserRepo,
    memberships: MembershipRepo,
    minter: Arc<IdMinter>,
    locks: RoomLocks,
}

impl RoomLifecycleCoordinator {
    pub fn new(
        cache: Cache,
        rooms: RoomRepo,
        users: UserRepo,
        memberships: MembershipRepo,
        minter: Arc<IdMinter>,
    ) -> Self {
        Self {
            cache,
            rooms,
            users,
            memberships,
            minter,
            locks: RoomLocks::new(),
        }
    }

    /// Create a room: durable record, live state with the owner as first
    /// member, and the owner's ledger entry, in that order.
    pub async fn create_room(&self, request: CreateRoom) -> WaypointResult<RoomState> {
        if request.max_members == 0 || request.max_members > MAX_ROOM_CAPACITY {
            return Err(WaypointError::Precondition(format!(
                "Room capacity must be between 1 and {}",
                MAX_ROOM_CAPACITY
            )));
        }
        if request.required_contact == ContactMethod::Unknown {
            return Err(WaypointError::Precondition(
                "Room must require a known contact method".to_string(),
            ));
        }

        let owner = self
            .users
            .select_by_id(&request.owner_id)
            .await?
            .ok_or_else(|| {
                WaypointError::NotFound(format!("User {} not found", request.owner_id))
            })?;

        let room_id = self.minter.mint().await?.to_hex();
        let now = Utc::now();

        self.rooms
            .insert(&RoomRow {
                room_id: room_id.clone(),
                owner_id: owner.user_id.clone(),
                origin: request.origin,
                destination: request.destination,
                depart_on: request.depart_on,
                status: RoomStatus::Open.as_str().to_string(),
                created_at: now,
                archived_snapshot: None,
            })
            .await?;

        let state = RoomState {
            room_id: room_id.clone(),
            owner_id: owner.user_id.clone(),
            members: vec![owner.user_id.clone()],
            max_members: request.max_members,
            required_contact: request.required_contact,
            status: RoomStatus::Open,
        };
        self.cache
            .insert(tags::ROOM_STATE, &room_id, &state, None)
            .await?;

        self.append_ledger(&room_id, &owner.user_id).await?;

        info!(room_id = %room_id, owner_id = %owner.user_id, "Room created");
        Ok(state)
    }

    /// Join a room, enforcing status, capacity, uniqueness and the room's
    /// contact requirement. Returns the re-read state after the write.
    pub async fn join_room(&self, user_id: &str, room_id: &str) -> WaypointResult<RoomState> {
        let user = self
            .users
            .select_by_id(user_id)
            .await?
            .ok_or_else(|| WaypointError::NotFound(format!("User {} not found", user_id)))?;
        self.require_room_record(room_id).await?;

        let _guard = self.locks.acquire(room_id).await;

        let state = self.require_live_state(room_id).await?;
        if state.status != RoomStatus::Open {
            return Err(WaypointError::Precondition("Room is closed".to_string()));
        }
        if state.is_full() {
            return Err(WaypointError::Precondition("Room is full".to_string()));
        }
        if state.has_member(user_id) {
            return Err(WaypointError::Precondition(
                "User is already a member of this room".to_string(),
            ));
        }
        if !contact_on_file(&user, state.required_contact) {
            return Err(WaypointError::Precondition(format!(
                "Room requires a {} contact on file",
                state.required_contact.as_str()
            )));
        }

        let mut updated = state.clone();
        updated.members.push(user_id.to_string());
        self.write_live_state(room_id, &updated).await?;

        self.append_ledger(room_id, user_id).await?;

        let state = self.require_live_state(room_id).await?;
        info!(room_id = %room_id, user_id = %user_id, members = state.members.len(), "User joined room");
        Ok(state)
    }

    /// Leave a room, freeing a slot. The ledger keeps the join event.
    pub async fn exit_room(&self, user_id: &str, room_id: &str) -> WaypointResult<RoomState> {
        self.require_room_record(room_id).await?;

        let _guard = self.locks.acquire(room_id).await;

        let state = self.require_live_state(room_id).await?;
        if state.status != RoomStatus::Open {
            return Err(WaypointError::Precondition("Room is closed".to_string()));
        }
        if !state.has_member(user_id) {
            return Err(WaypointError::Precondition(
                "User is not a member of this room".to_string(),
            ));
        }

        let mut updated = state.clone();
        updated.members.retain(|member| member != user_id);
        self.write_live_state(room_id, &updated).await?;

        info!(room_id = %room_id, user_id = %user_id, members = updated.members.len(), "User exited room");
        Ok(updated)
    }

    /// Close a room. Terminal: a closed room never reopens. The cache is
    /// written before the durable record; a crash between the two leaves
    /// the cache CLOSED and the durable record OPEN.
    pub async fn close_room(&self, room_id: &str) -> WaypointResult<RoomState> {
        let _guard = self.locks.acquire(room_id).await;

        let state = self.require_live_state(room_id).await?;
        if state.status == RoomStatus::Closed {
            return Err(WaypointError::Precondition(
                "Room is already closed".to_string(),
            ));
        }

        let mut updated = state;
        updated.status = RoomStatus::Closed;
        self.write_live_state(room_id, &updated).await?;

        self.rooms.update_status(room_id, RoomStatus::Closed).await?;

        info!(room_id = %room_id, "Room closed");
        Ok(updated)
    }

    /// Read a room through the durable record. An archived snapshot wins;
    /// otherwise the live state is embedded. A closed room's live state is
    /// captured into the snapshot on first read; an open room's state is
    /// never persisted back.
    pub async fn query_room(&self, room_id: &str) -> WaypointResult<RoomView> {
        let row = self.require_room_record(room_id).await?;

        if let Some(snapshot) = &row.archived_snapshot {
            let state: RoomState = serde_json::from_str(snapshot)?;
            return RoomView::from_row(row, Some(state), true);
        }

        let state: Option<RoomState> = self.cache.get(tags::ROOM_STATE, room_id).await?;

        if row.status == RoomStatus::Closed.as_str() {
            if let Some(live) = &state {
                let snapshot = serde_json::to_string(live)?;
                self.rooms.set_archived_snapshot(room_id, &snapshot).await?;
            }
        }

        RoomView::from_row(row, state, false)
    }

    /// Cache-only read of the live room state
    pub async fn query_live_room(&self, room_id: &str) -> WaypointResult<RoomState> {
        self.require_live_state(room_id).await
    }

    /// Every room a user has ever joined, via the append-only ledger.
    /// Works whether or not a room has expired from the cache: the archived
    /// snapshot is preferred, the live entry is the fallback.
    pub async fn query_joined_rooms(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> WaypointResult<Vec<RoomView>> {
        let (offset, limit) = page(offset, limit);

        let entries = self.memberships.select_by_user(user_id).await?;

        let mut seen = HashSet::new();
        let room_ids: Vec<String> = entries
            .into_iter()
            .map(|entry| entry.room_id)
            .filter(|room_id| seen.insert(room_id.clone()))
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        let mut rows = Vec::with_capacity(room_ids.len());
        for room_id in &room_ids {
            match self.rooms.select_by_id(room_id).await? {
                Some(row) => rows.push(row),
                None => warn!(room_id = %room_id, "Ledger references a missing room record"),
            }
        }

        self.assemble_views(rows).await
    }

    /// Search durable room records by criteria
    pub async fn search_rooms(
        &self,
        filter: &RoomFilter,
        offset: i64,
        limit: i64,
    ) -> WaypointResult<Vec<RoomView>> {
        let (offset, limit) = page(offset, limit);
        let rows = self.rooms.select_many(filter, offset, limit).await?;
        self.assemble_views(rows).await
    }

    /// Build views for a batch of rows: archived snapshots parse locally,
    /// the rest resolve through one cache multi-get.
    async fn assemble_views(&self, rows: Vec<RoomRow>) -> WaypointResult<Vec<RoomView>> {
        let live_keys: Vec<String> = rows
            .iter()
            .filter(|row| row.archived_snapshot.is_none())
            .map(|row| self.cache.key(tags::ROOM_STATE, &row.room_id))
            .collect();
        let live_states: Vec<Option<RoomState>> = self.cache.multi_get(&live_keys).await?;
        let mut live_iter = live_states.into_iter();

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(snapshot) = &row.archived_snapshot {
                let state: RoomState = serde_json::from_str(snapshot)?;
                views.push(RoomView::from_row(row, Some(state), true)?);
            } else {
                let state = live_iter.next().flatten();
                views.push(RoomView::from_row(row, state, false)?);
            }
        }
        Ok(views)
    }

    async fn require_room_record(&self, room_id: &str) -> WaypointResult<RoomRow> {
        self.rooms
            .select_by_id(room_id)
            .await?
            .ok_or_else(|| WaypointError::NotFound(format!("Room {} not found", room_id)))
    }

    async fn require_live_state(&self, room_id: &str) -> WaypointResult<RoomState> {
        self.cache
            .get(tags::ROOM_STATE, room_id)
            .await?
            .ok_or_else(|| {
                WaypointError::NotFound(format!("Live state for room {} not found", room_id))
            })
    }

    async fn write_live_state(&self, room_id: &str, state: &RoomState) -> WaypointResult<()> {
        let ok = self
            .cache
            .upsert(tags::ROOM_STATE, room_id, state, Ttl::Keep)
            .await?;
        if !ok {
            return Err(WaypointError::OperationFailed(format!(
                "Room state upsert did not take effect for {}",
                room_id
            )));
        }
        Ok(())
    }

    async fn append_ledger(&self, room_id: &str, user_id: &str) -> WaypointResult<()> {
        let membership_id = self.minter.mint().await?.to_hex();
        self.memberships
            .insert(&MembershipRow {
                membership_id,
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
                joined_at: Utc::now(),
            })
            .await?;
        Ok(())
    }
}

/// Does the user have the room's required contact on file?
fn contact_on_file(user: &UserRow, method: ContactMethod) -> bool {
    let field = match method {
        ContactMethod::Phone => &user.phone,
        ContactMethod::Qq => &user.qq,
        ContactMethod::Wechat => &user.wechat,
        ContactMethod::Unknown => return true,
    };
    field.as_deref().is_some_and(|value| !value.is_empty())
}

fn page(offset: i64, limit: i64) -> (i64, i64) {
    let offset = offset.max(0);
    let limit = if limit <= 0 { DEFAULT_PAGE_LIMIT } else { limit };
    (offset, limit)
}
