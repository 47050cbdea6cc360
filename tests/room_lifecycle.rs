/// Room lifecycle integration tests
///
/// Exercise the coordinator against an in-memory SQLite database and the
/// in-memory cache backend.
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use waypoint::cache::{tags, Cache, CacheBackend, MemoryCache};
use waypoint::db::{self, memberships::MembershipRepo, rooms::RoomFilter, rooms::RoomRepo, users::UserRepo};
use waypoint::idgen::{IdMinter, MachineTag};
use waypoint::room::coordinator::{CreateRoom, RoomLifecycleCoordinator};
use waypoint::room::{ContactMethod, RoomStatus};
use waypoint::users::{CreateUser, UserDirectory};
use waypoint::WaypointError;

struct Harness {
    rooms: Arc<RoomLifecycleCoordinator>,
    users: UserDirectory,
    memberships: MembershipRepo,
    cache: Cache,
    backend: Arc<MemoryCache>,
}

async fn harness() -> Harness {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();

    let backend = Arc::new(MemoryCache::new());
    let cache = Cache::new(backend.clone(), String::new());
    let minter = Arc::new(IdMinter::new(
        MachineTag::new(7).unwrap(),
        Duration::from_millis(5),
    ));

    let rooms = Arc::new(RoomLifecycleCoordinator::new(
        cache.clone(),
        RoomRepo::new(pool.clone()),
        UserRepo::new(pool.clone()),
        MembershipRepo::new(pool.clone()),
        Arc::clone(&minter),
    ));
    let users = UserDirectory::new(UserRepo::new(pool.clone()), minter);

    Harness {
        rooms,
        users,
        memberships: MembershipRepo::new(pool),
        cache,
        backend,
    }
}

async fn make_user(h: &Harness, nickname: &str, phone: Option<&str>, qq: Option<&str>) -> String {
    h.users
        .create_user(CreateUser {
            nickname: nickname.to_string(),
            phone: phone.map(str::to_string),
            qq: qq.map(str::to_string),
            wechat: None,
        })
        .await
        .unwrap()
        .user_id
}

async fn make_room(
    h: &Harness,
    owner_id: &str,
    max_members: u32,
    required_contact: ContactMethod,
) -> String {
    h.rooms
        .create_room(CreateRoom {
            owner_id: owner_id.to_string(),
            max_members,
            required_contact,
            origin: "Shanghai".to_string(),
            destination: "Chengdu".to_string(),
            depart_on: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        })
        .await
        .unwrap()
        .room_id
}

fn assert_precondition(result: Result<impl std::fmt::Debug, WaypointError>, needle: &str) {
    match result {
        Err(WaypointError::Precondition(reason)) => {
            assert!(
                reason.to_lowercase().contains(needle),
                "expected precondition about '{}', got '{}'",
                needle,
                reason
            );
        }
        other => panic!("expected PreconditionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_room_seeds_owner_membership() {
    let h = harness().await;
    let owner = make_user(&h, "a", Some("13800000001"), None).await;
    let room_id = make_room(&h, &owner, 3, ContactMethod::Phone).await;

    let state = h.rooms.query_live_room(&room_id).await.unwrap();
    assert_eq!(state.members, vec![owner.clone()]);
    assert_eq!(state.status, RoomStatus::Open);

    // The owner's join event is already in the ledger
    assert_eq!(h.memberships.count_by_user(&owner).await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_room_validations() {
    let h = harness().await;
    let owner = make_user(&h, "a", Some("13800000001"), None).await;

    let mut request = CreateRoom {
        owner_id: owner.clone(),
        max_members: 0,
        required_contact: ContactMethod::Phone,
        origin: "Shanghai".to_string(),
        destination: "Chengdu".to_string(),
        depart_on: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
    };
    assert_precondition(h.rooms.create_room(request.clone()).await, "capacity");

    request.max_members = 5;
    assert_precondition(h.rooms.create_room(request.clone()).await, "capacity");

    request.max_members = 2;
    request.required_contact = ContactMethod::Unknown;
    assert_precondition(h.rooms.create_room(request.clone()).await, "contact");

    request.required_contact = ContactMethod::Phone;
    request.owner_id = "missing".to_string();
    assert!(matches!(
        h.rooms.create_room(request).await,
        Err(WaypointError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_scenario_a_capacity_enforced() {
    let h = harness().await;
    let a = make_user(&h, "a", None, Some("qq-a")).await;
    let b = make_user(&h, "b", None, Some("qq-b")).await;
    let c = make_user(&h, "c", None, Some("qq-c")).await;
    let room_id = make_room(&h, &a, 2, ContactMethod::Qq).await;

    let state = h.rooms.join_room(&b, &room_id).await.unwrap();
    assert_eq!(state.members, vec![a.clone(), b.clone()]);

    assert_precondition(h.rooms.join_room(&c, &room_id).await, "full");

    // Capacity invariant holds after the rejected join
    let state = h.rooms.query_live_room(&room_id).await.unwrap();
    assert_eq!(state.members.len(), 2);
}

#[tokio::test]
async fn test_scenario_b_exit_frees_slot() {
    let h = harness().await;
    let a = make_user(&h, "a", None, Some("qq-a")).await;
    let b = make_user(&h, "b", None, Some("qq-b")).await;
    let room_id = make_room(&h, &a, 2, ContactMethod::Qq).await;

    h.rooms.join_room(&b, &room_id).await.unwrap();
    let state = h.rooms.exit_room(&b, &room_id).await.unwrap();
    assert_eq!(state.members, vec![a.clone()]);

    // Exit freed the slot; B can join again
    let state = h.rooms.join_room(&b, &room_id).await.unwrap();
    assert_eq!(state.members, vec![a, b]);
}

#[tokio::test]
async fn test_scenario_c_close_is_terminal() {
    let h = harness().await;
    let a = make_user(&h, "a", None, Some("qq-a")).await;
    let d = make_user(&h, "d", None, Some("qq-d")).await;
    let room_id = make_room(&h, &a, 3, ContactMethod::Qq).await;

    let state = h.rooms.close_room(&room_id).await.unwrap();
    assert_eq!(state.status, RoomStatus::Closed);

    assert_precondition(h.rooms.join_room(&d, &room_id).await, "closed");
    assert_precondition(h.rooms.close_room(&room_id).await, "closed");

    // Durable record reflects the close
    let view = h.rooms.query_room(&room_id).await.unwrap();
    assert_eq!(view.status, RoomStatus::Closed);
}

#[tokio::test]
async fn test_scenario_d_contact_enforcement() {
    let h = harness().await;
    let a = make_user(&h, "a", Some("13800000001"), None).await;
    let b = make_user(&h, "b", None, Some("qq-b")).await;
    let room_id = make_room(&h, &a, 3, ContactMethod::Phone).await;

    assert_precondition(h.rooms.join_room(&b, &room_id).await, "phone");

    // After adding a phone number the same call succeeds
    h.users
        .update_user(
            &b,
            waypoint::db::models::UserPatch {
                phone: Some("13900000002".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let state = h.rooms.join_room(&b, &room_id).await.unwrap();
    assert!(state.members.contains(&b));
}

#[tokio::test]
async fn test_no_double_join() {
    let h = harness().await;
    let a = make_user(&h, "a", None, Some("qq-a")).await;
    let b = make_user(&h, "b", None, Some("qq-b")).await;
    let room_id = make_room(&h, &a, 4, ContactMethod::Qq).await;

    h.rooms.join_room(&b, &room_id).await.unwrap();
    assert_precondition(h.rooms.join_room(&b, &room_id).await, "already");

    // The owner is a member from creation and cannot join twice either
    assert_precondition(h.rooms.join_room(&a, &room_id).await, "already");
}

#[tokio::test]
async fn test_exit_preconditions() {
    let h = harness().await;
    let a = make_user(&h, "a", None, Some("qq-a")).await;
    let b = make_user(&h, "b", None, Some("qq-b")).await;
    let room_id = make_room(&h, &a, 2, ContactMethod::Qq).await;

    assert_precondition(h.rooms.exit_room(&b, &room_id).await, "not a member");

    assert!(matches!(
        h.rooms.exit_room(&a, "missing-room").await,
        Err(WaypointError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_respect_capacity() {
    let h = harness().await;
    let owner = make_user(&h, "owner", None, Some("qq-owner")).await;
    let room_id = make_room(&h, &owner, 2, ContactMethod::Qq).await;

    let mut contenders = Vec::new();
    for i in 0..8 {
        contenders.push(make_user(&h, &format!("u{}", i), None, Some("qq")).await);
    }

    let mut handles = Vec::new();
    for user_id in contenders {
        let rooms = Arc::clone(&h.rooms);
        let room_id = room_id.clone();
        handles.push(tokio::spawn(
            async move { rooms.join_room(&user_id, &room_id).await },
        ));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    // One free slot next to the owner
    assert_eq!(successes, 1);
    let state = h.rooms.query_live_room(&room_id).await.unwrap();
    assert_eq!(state.members.len(), 2);
}

#[tokio::test]
async fn test_ledger_survives_exit() {
    let h = harness().await;
    let a = make_user(&h, "a", None, Some("qq-a")).await;
    let b = make_user(&h, "b", None, Some("qq-b")).await;
    let room_id = make_room(&h, &a, 2, ContactMethod::Qq).await;

    h.rooms.join_room(&b, &room_id).await.unwrap();
    h.rooms.exit_room(&b, &room_id).await.unwrap();
    h.rooms.join_room(&b, &room_id).await.unwrap();

    // Two join events for B, none removed by the exit
    assert_eq!(h.memberships.count_by_user(&b).await.unwrap(), 2);
}

#[tokio::test]
async fn test_query_room_archives_closed_rooms_on_read() {
    let h = harness().await;
    let a = make_user(&h, "a", None, Some("qq-a")).await;
    let b = make_user(&h, "b", None, Some("qq-b")).await;
    let room_id = make_room(&h, &a, 2, ContactMethod::Qq).await;
    h.rooms.join_room(&b, &room_id).await.unwrap();

    // Open room: view embeds live state and persists nothing
    let view = h.rooms.query_room(&room_id).await.unwrap();
    assert!(!view.archived);
    assert_eq!(view.state.as_ref().unwrap().members.len(), 2);

    h.rooms.close_room(&room_id).await.unwrap();

    // First read after close captures the snapshot
    let view = h.rooms.query_room(&room_id).await.unwrap();
    assert!(!view.archived);
    assert_eq!(view.state.as_ref().unwrap().status, RoomStatus::Closed);

    // Simulate cache expiry; the archived snapshot takes over
    let key = h.cache.key(tags::ROOM_STATE, &room_id);
    h.backend.delete(&key).await.unwrap();

    let view = h.rooms.query_room(&room_id).await.unwrap();
    assert!(view.archived);
    let state = view.state.unwrap();
    assert_eq!(state.status, RoomStatus::Closed);
    assert_eq!(state.members, vec![a, b]);
}

#[tokio::test]
async fn test_query_joined_rooms_dedups_and_falls_back() {
    let h = harness().await;
    let a = make_user(&h, "a", None, Some("qq-a")).await;
    let b = make_user(&h, "b", None, Some("qq-b")).await;

    let first = make_room(&h, &a, 2, ContactMethod::Qq).await;
    let second = make_room(&h, &b, 2, ContactMethod::Qq).await;

    // B joins, exits and rejoins the first room: two ledger rows, one room
    h.rooms.join_room(&b, &first).await.unwrap();
    h.rooms.exit_room(&b, &first).await.unwrap();
    h.rooms.join_room(&b, &first).await.unwrap();

    // Close B's own room, archive it, and evict it from the cache
    h.rooms.close_room(&second).await.unwrap();
    h.rooms.query_room(&second).await.unwrap();
    let key = h.cache.key(tags::ROOM_STATE, &second);
    h.backend.delete(&key).await.unwrap();

    let views = h.rooms.query_joined_rooms(&b, 0, 20).await.unwrap();
    assert_eq!(views.len(), 2);

    let live = views.iter().find(|v| v.room_id == first).unwrap();
    assert!(!live.archived);
    assert!(live.state.as_ref().unwrap().members.contains(&b));

    let archived = views.iter().find(|v| v.room_id == second).unwrap();
    assert!(archived.archived);
    assert_eq!(
        archived.state.as_ref().unwrap().status,
        RoomStatus::Closed
    );
}

#[tokio::test]
async fn test_query_joined_rooms_pagination() {
    let h = harness().await;
    let owner = make_user(&h, "owner", None, Some("qq-o")).await;
    let joiner = make_user(&h, "joiner", None, Some("qq-j")).await;

    let mut room_ids = Vec::new();
    for _ in 0..3 {
        let room_id = make_room(&h, &owner, 4, ContactMethod::Qq).await;
        h.rooms.join_room(&joiner, &room_id).await.unwrap();
        room_ids.push(room_id);
    }

    let page = h.rooms.query_joined_rooms(&joiner, 0, 2).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].room_id, room_ids[0]);
    assert_eq!(page[1].room_id, room_ids[1]);

    let rest = h.rooms.query_joined_rooms(&joiner, 2, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].room_id, room_ids[2]);
}

#[tokio::test]
async fn test_search_rooms_by_criteria() {
    let h = harness().await;
    let a = make_user(&h, "a", None, Some("qq-a")).await;

    let chengdu = make_room(&h, &a, 2, ContactMethod::Qq).await;
    h.rooms
        .create_room(CreateRoom {
            owner_id: a.clone(),
            max_members: 2,
            required_contact: ContactMethod::Qq,
            origin: "Beijing".to_string(),
            destination: "Dali".to_string(),
            depart_on: NaiveDate::from_ymd_opt(2026, 11, 15).unwrap(),
        })
        .await
        .unwrap();

    let filter = RoomFilter {
        destination: Some("Cheng".to_string()),
        ..Default::default()
    };
    let views = h.rooms.search_rooms(&filter, 0, 20).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].room_id, chengdu);
    assert!(views[0].state.is_some());

    h.rooms.close_room(&chengdu).await.unwrap();
    let filter = RoomFilter {
        status: Some(RoomStatus::Open),
        ..Default::default()
    };
    let views = h.rooms.search_rooms(&filter, 0, 20).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].destination, "Dali");
}
