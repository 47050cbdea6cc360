/// Room API endpoints
///
/// Thin JSON layer over the lifecycle coordinator; every business
/// invariant lives in the coordinator, this module only shapes requests
/// and clamps pagination.
use crate::{
    context::AppContext,
    db::rooms::RoomFilter,
    error::{WaypointError, WaypointResult},
    room::{coordinator::CreateRoom, ContactMethod, RoomState, RoomStatus, RoomView, DEFAULT_PAGE_LIMIT},
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Build room routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/rooms", post(create_room).get(search_rooms))
        .route("/rooms/:room_id", get(query_room))
        .route("/rooms/:room_id/live", get(query_live_room))
        .route("/rooms/:room_id/join", post(join_room))
        .route("/rooms/:room_id/exit", post(exit_room))
        .route("/rooms/:room_id/close", post(close_room))
        .route("/users/:user_id/rooms", get(query_joined_rooms))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub owner_id: String,
    pub max_members: u32,
    pub required_contact: ContactMethod,
    pub origin: String,
    pub destination: String,
    pub depart_on: NaiveDate,
}

async fn create_room(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateRoomRequest>,
) -> WaypointResult<Json<RoomState>> {
    if req.origin.trim().is_empty() || req.destination.trim().is_empty() {
        return Err(WaypointError::Validation(
            "Origin and destination cannot be empty".to_string(),
        ));
    }

    let state = ctx
        .rooms
        .create_room(CreateRoom {
            owner_id: req.owner_id,
            max_members: req.max_members,
            required_contact: req.required_contact,
            origin: req.origin,
            destination: req.destination,
            depart_on: req.depart_on,
        })
        .await?;
    Ok(Json(state))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRequest {
    pub user_id: String,
}

async fn join_room(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
    Json(req): Json<MembershipRequest>,
) -> WaypointResult<Json<RoomState>> {
    let state = ctx.rooms.join_room(&req.user_id, &room_id).await?;
    Ok(Json(state))
}

async fn exit_room(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
    Json(req): Json<MembershipRequest>,
) -> WaypointResult<Json<RoomState>> {
    let state = ctx.rooms.exit_room(&req.user_id, &room_id).await?;
    Ok(Json(state))
}

async fn close_room(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
) -> WaypointResult<Json<RoomState>> {
    let state = ctx.rooms.close_room(&room_id).await?;
    Ok(Json(state))
}

async fn query_room(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
) -> WaypointResult<Json<RoomView>> {
    let view = ctx.rooms.query_room(&room_id).await?;
    Ok(Json(view))
}

async fn query_live_room(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
) -> WaypointResult<Json<RoomState>> {
    let state = ctx.rooms.query_live_room(&room_id).await?;
    Ok(Json(state))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    #[serde(default)]
    pub offset: i64,
    pub limit: Option<i64>,
}

impl PageParams {
    /// Clamp the page size to the API maximum
    fn clamp(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(DEFAULT_PAGE_LIMIT);
        (self.offset, limit)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListResponse {
    pub rooms: Vec<RoomView>,
}

async fn query_joined_rooms(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    Query(params): Query<PageParams>,
) -> WaypointResult<Json<RoomListResponse>> {
    let (offset, limit) = params.clamp();
    let rooms = ctx.rooms.query_joined_rooms(&user_id, offset, limit).await?;
    Ok(Json(RoomListResponse { rooms }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub destination: Option<String>,
    pub status: Option<RoomStatus>,
    pub depart_from: Option<NaiveDate>,
    pub depart_to: Option<NaiveDate>,
    #[serde(default)]
    pub offset: i64,
    pub limit: Option<i64>,
}

async fn search_rooms(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchParams>,
) -> WaypointResult<Json<RoomListResponse>> {
    let page = PageParams {
        offset: params.offset,
        limit: params.limit,
    };
    let (offset, limit) = page.clamp();

    let filter = RoomFilter {
        destination: params.destination,
        status: params.status,
        depart_from: params.depart_from,
        depart_to: params.depart_to,
    };
    let rooms = ctx.rooms.search_rooms(&filter, offset, limit).await?;
    Ok(Json(RoomListResponse { rooms }))
}
