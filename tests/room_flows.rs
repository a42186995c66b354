mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use colabri_rooms::db::{MemoryStore, RoomField, RoomStore, StoreError};
use colabri_rooms::models::{ApiError, FileAction, JoinOutcome, Role, Room, ServerEvent};
use colabri_rooms::services::{file_service, room_service};
use colabri_rooms::AppState;
use common::*;

#[tokio::test]
async fn join_approve_kick_scenario() {
    let state = test_state();
    let (owner, _) = sign_up(&state, "olivia").await;
    let (bob, _) = sign_up(&state, "bob").await;
    let (carol, _) = sign_up(&state, "carol").await;

    let created = room_service::create_room(&state, &owner, None).await.unwrap();
    assert!(created.room_id.starts_with("room-"));
    assert_eq!(created.room_id.len(), "room-".len() + 8);
    let room_id = created.room_id.clone();

    let joined = room_service::join_room(&state, &owner, &room_id, &created.password).await.unwrap();
    assert_eq!(joined.role, Role::Owner);

    let (_, mut owner_rx) = connect(&state, &owner).await;
    let (_, mut bob_rx) = connect(&state, &bob).await;
    let (carol_conn, mut carol_rx) = connect(&state, &carol).await;
    state.hub.subscribe(carol_conn, &room_id).await;

    // Wrong credential: rejected and no entry
    let err = room_service::join_room(&state, &bob, &room_id, "not-the-password").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated(_)));
    assert_eq!(room_service::role_of(&state, &bob, &room_id).await.unwrap().role, "none");

    // Right credential: pending, owner gets a targeted signal
    let joined = room_service::join_room(&state, &bob, &room_id, &created.password).await.unwrap();
    assert_eq!(joined.role, Role::Pending);
    assert_eq!(names(&drain(&mut owner_rx)), vec!["members_updated"]);
    assert!(drain(&mut carol_rx).is_empty());

    // Approve: the target alone receives `approved`, subscribers get `members_updated`
    let updated = room_service::approve_member(&state, &owner, &room_id, &bob.id).await.unwrap();
    assert_eq!(updated.role, Some(Role::Member));
    assert_eq!(room_service::role_of(&state, &bob, &room_id).await.unwrap().role, "member");
    assert_eq!(names(&drain(&mut bob_rx)), vec!["approved"]);
    assert_eq!(names(&drain(&mut carol_rx)), vec!["members_updated"]);
    assert!(drain(&mut owner_rx).is_empty());

    // Kick: the target receives `kicked` and holds no entry afterwards
    room_service::kick_member(&state, &owner, &room_id, &bob.id).await.unwrap();
    assert_eq!(names(&drain(&mut bob_rx)), vec!["kicked"]);
    assert_eq!(names(&drain(&mut carol_rx)), vec!["members_updated"]);
    assert_eq!(room_service::role_of(&state, &bob, &room_id).await.unwrap().role, "none");
}

#[tokio::test]
async fn rejoin_is_idempotent_and_reject_removes_entry() {
    let state = test_state();
    let (owner, _) = sign_up(&state, "olivia").await;
    let (bob, _) = sign_up(&state, "bob").await;
    let created = room_service::create_room(&state, &owner, None).await.unwrap();
    let room_id = created.room_id.clone();

    room_service::join_room(&state, &bob, &room_id, &created.password).await.unwrap();
    let again = room_service::join_room(&state, &bob, &room_id, &created.password).await.unwrap();
    assert_eq!(again.role, Role::Pending);

    let room = state.rooms.find_room_by(RoomField::RoomId(&room_id)).await.unwrap().unwrap();
    assert_eq!(room.members.len(), 1);
    assert!(room.owner_invariant_holds());

    let (_, mut bob_rx) = connect(&state, &bob).await;
    room_service::reject_member(&state, &owner, &room_id, &bob.id).await.unwrap();
    assert_eq!(names(&drain(&mut bob_rx)), vec!["rejected"]);
    assert_eq!(room_service::role_of(&state, &bob, &room_id).await.unwrap().role, "none");

    // Only pending entries can be approved or rejected
    let err = room_service::approve_member(&state, &owner, &room_id, &bob.id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn only_the_owner_moderates() {
    let state = test_state();
    let (owner, _) = sign_up(&state, "olivia").await;
    let (bob, _) = sign_up(&state, "bob").await;
    let (mallory, _) = sign_up(&state, "mallory").await;
    let created = room_service::create_room(&state, &owner, None).await.unwrap();
    let room_id = created.room_id.clone();
    room_service::join_room(&state, &bob, &room_id, &created.password).await.unwrap();

    let err = room_service::approve_member(&state, &mallory, &room_id, &bob.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
    let err = room_service::delete_room(&state, &mallory, &room_id).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
    let err = room_service::change_member_role(&state, &mallory, &room_id, &bob.id, "editor")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let err = room_service::approve_member(&state, &owner, "room-00000000", &bob.id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn ownership_transfer_demotes_previous_owner() {
    let state = test_state();
    let (owner, _) = sign_up(&state, "olivia").await;
    let (mia, _) = sign_up(&state, "mia").await;
    let created = room_service::create_room(&state, &owner, None).await.unwrap();
    let room_id = created.room_id.clone();

    room_service::join_room(&state, &owner, &room_id, &created.password).await.unwrap();
    room_service::join_room(&state, &mia, &room_id, &created.password).await.unwrap();
    room_service::approve_member(&state, &owner, &room_id, &mia.id).await.unwrap();

    let updated = room_service::change_member_role(&state, &owner, &room_id, &mia.id, "owner")
        .await
        .unwrap();
    assert_eq!(updated.owner_id, mia.id);

    let room = state.rooms.find_room_by(RoomField::RoomId(&room_id)).await.unwrap().unwrap();
    assert_eq!(room.owner_id, mia.id);
    assert_eq!(room.role_of(&mia.id), Some(Role::Owner));
    assert_eq!(room.role_of(&owner.id), Some(Role::Member));
    assert!(room.owner_invariant_holds());

    // The previous owner lost every owner-only capability
    let err = room_service::kick_member(&state, &owner, &room_id, &mia.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let err = room_service::change_member_role(&state, &mia, &room_id, &owner.id, "pending")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn file_permissions_follow_roles() {
    let state = test_state();
    let (owner, _) = sign_up(&state, "olivia").await;
    let (vic, _) = sign_up(&state, "vic").await;
    let (pat, _) = sign_up(&state, "pat").await;
    let created = room_service::create_room(&state, &owner, None).await.unwrap();
    let room_id = created.room_id.clone();

    for user in [&vic, &pat] {
        room_service::join_room(&state, user, &room_id, &created.password).await.unwrap();
    }
    room_service::change_member_role(&state, &owner, &room_id, &vic.id, "viewer").await.unwrap();

    let err = file_service::create_file(&state, &pat, &room_id, "notes.md").await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let file = file_service::create_file(&state, &vic, &room_id, "notes.md").await.unwrap();
    let err = file_service::delete_file(&state, &vic, &room_id, &file.file_id).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let err = file_service::create_file(&state, &owner, &room_id, "  ").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    assert_eq!(file_service::list_files(&state, &room_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn double_file_delete_succeeds_and_saves_once() {
    let state = test_state();
    let (owner, _) = sign_up(&state, "olivia").await;
    let created = room_service::create_room(&state, &owner, None).await.unwrap();
    let room_id = created.room_id.clone();

    // Creating a room records the owner id only; file rights come with the joined entry
    let err = file_service::create_file(&state, &owner, &room_id, "plan.md").await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
    room_service::join_room(&state, &owner, &room_id, &created.password).await.unwrap();
    let file = file_service::create_file(&state, &owner, &room_id, "plan.md").await.unwrap();

    let (conn, mut rx) = connect(&state, &owner).await;
    state.hub.subscribe(conn, &room_id).await;

    let first = file_service::delete_file(&state, &owner, &room_id, &file.file_id).await.unwrap();
    assert!(first.success && first.removed);
    let version_after_first = state
        .rooms
        .find_room_by(RoomField::RoomId(&room_id))
        .await
        .unwrap()
        .unwrap()
        .version;

    let second = file_service::delete_file(&state, &owner, &room_id, &file.file_id).await.unwrap();
    assert!(second.success);
    assert!(!second.removed);
    let version_after_second = state
        .rooms
        .find_room_by(RoomField::RoomId(&room_id))
        .await
        .unwrap()
        .unwrap()
        .version;
    assert_eq!(version_after_first, version_after_second);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    for event in events {
        match event {
            ServerEvent::FilesUpdated(update) => {
                assert_eq!(update.action, FileAction::Deleted);
                assert_eq!(update.file_id.as_deref(), Some(file.file_id.as_str()));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}

#[tokio::test]
async fn force_delete_reaches_each_connection_exactly_once() {
    let state = test_state();
    let (owner, _) = sign_up(&state, "olivia").await;
    let (bob, _) = sign_up(&state, "bob").await;
    let (offline, _) = sign_up(&state, "otto").await;
    let created = room_service::create_room(&state, &owner, None).await.unwrap();
    let room_id = created.room_id.clone();

    room_service::join_room(&state, &owner, &room_id, &created.password).await.unwrap();
    for user in [&bob, &offline] {
        room_service::join_room(&state, user, &room_id, &created.password).await.unwrap();
        room_service::approve_member(&state, &owner, &room_id, &user.id).await.unwrap();
    }

    // Bob is both subscribed and a member on one device, and only a member on the other
    let (bob_phone, mut bob_phone_rx) = connect(&state, &bob).await;
    let (_, mut bob_laptop_rx) = connect(&state, &bob).await;
    state.hub.subscribe(bob_phone, &room_id).await;

    let deleted = room_service::delete_room(&state, &owner, &room_id).await.unwrap();
    assert!(deleted.success);
    assert_eq!(deleted.notified_members, 3);

    assert_eq!(names(&drain(&mut bob_phone_rx)), vec!["room_deleted"]);
    assert_eq!(names(&drain(&mut bob_laptop_rx)), vec!["room_deleted"]);

    let err = room_service::room_snapshot(&state, &room_id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(state.hub.stats().await.room_channels, 0);

    let err = room_service::delete_room(&state, &owner, &room_id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

type Interleave = Box<dyn FnOnce(&mut Room) + Send>;

/// Room store that commits one extra change right before the first delete reaches storage
struct InterleavingStore {
    inner: Arc<MemoryStore>,
    before_delete: Mutex<Option<Interleave>>,
}

#[async_trait]
impl RoomStore for InterleavingStore {
    async fn find_room_by(&self, field: RoomField<'_>) -> Result<Option<Room>, StoreError> {
        self.inner.find_room_by(field).await
    }

    async fn find_rooms_for_user(&self, user_id: &str) -> Result<Vec<Room>, StoreError> {
        self.inner.find_rooms_for_user(user_id).await
    }

    async fn create_room(&self, room: Room) -> Result<Room, StoreError> {
        self.inner.create_room(room).await
    }

    async fn save_room(&self, room: &Room) -> Result<Room, StoreError> {
        self.inner.save_room(room).await
    }

    async fn delete_room(&self, room: &Room) -> Result<bool, StoreError> {
        let change = self.before_delete.lock().unwrap().take();
        if let Some(change) = change {
            let mut current = self.inner.find_room_by(RoomField::RoomId(&room.room_id)).await?.unwrap();
            change(&mut current);
            self.inner.save_room(&current).await?;
        }
        self.inner.delete_room(room).await
    }
}

fn interleaving_state(change: Interleave) -> Arc<AppState> {
    let store = Arc::new(MemoryStore::new());
    let rooms = Arc::new(InterleavingStore {
        inner: store.clone(),
        before_delete: Mutex::new(Some(change)),
    });
    Arc::new(AppState::new(test_config(), store, rooms))
}

#[tokio::test]
async fn delete_rechecks_ownership_after_concurrent_transfer() {
    let bob_id = Arc::new(Mutex::new(String::new()));
    let transfer_to = bob_id.clone();
    let state = interleaving_state(Box::new(move |room| {
        let target = transfer_to.lock().unwrap().clone();
        room.change_role(&target, Role::Owner).unwrap();
    }));

    let (owner, _) = sign_up(&state, "olivia").await;
    let (bob, _) = sign_up(&state, "bob").await;
    *bob_id.lock().unwrap() = bob.id.clone();
    let created = room_service::create_room(&state, &owner, None).await.unwrap();
    let room_id = created.room_id.clone();
    room_service::join_room(&state, &owner, &room_id, &created.password).await.unwrap();
    room_service::join_room(&state, &bob, &room_id, &created.password).await.unwrap();
    room_service::approve_member(&state, &owner, &room_id, &bob.id).await.unwrap();

    let err = room_service::delete_room(&state, &owner, &room_id).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)), "{:?}", err);

    let room = state.rooms.find_room_by(RoomField::RoomId(&room_id)).await.unwrap().unwrap();
    assert_eq!(room.owner_id, bob.id);
    assert!(room_service::delete_room(&state, &bob, &room_id).await.unwrap().success);
}

#[tokio::test]
async fn delete_notifies_members_who_joined_while_it_was_in_flight() {
    let carol_id = Arc::new(Mutex::new(String::new()));
    let joiner = carol_id.clone();
    let state = interleaving_state(Box::new(move |room| {
        let id = joiner.lock().unwrap().clone();
        room.join(&id, Utc::now());
    }));

    let (owner, _) = sign_up(&state, "olivia").await;
    let (carol, _) = sign_up(&state, "carol").await;
    *carol_id.lock().unwrap() = carol.id.clone();
    let created = room_service::create_room(&state, &owner, None).await.unwrap();
    let room_id = created.room_id.clone();
    room_service::join_room(&state, &owner, &room_id, &created.password).await.unwrap();

    let (_, mut carol_rx) = connect(&state, &carol).await;
    let deleted = room_service::delete_room(&state, &owner, &room_id).await.unwrap();
    assert_eq!(deleted.notified_members, 2);
    assert_eq!(names(&drain(&mut carol_rx)), vec!["room_deleted"]);
    assert!(state.rooms.find_room_by(RoomField::RoomId(&room_id)).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_are_not_lost() {
    let mut config = test_config();
    config.room_save_retries = 50;
    let state = Arc::new(AppState::in_memory(config));
    let (owner, _) = sign_up(&state, "olivia").await;
    let created = room_service::create_room(&state, &owner, None).await.unwrap();
    let room_id = created.room_id.clone();

    let mut users = Vec::new();
    for i in 0..6 {
        let (user, _) = sign_up(&state, &format!("user{}", i)).await;
        room_service::join_room(&state, &user, &room_id, &created.password).await.unwrap();
        users.push(user);
    }

    let mut tasks = Vec::new();
    for user in &users {
        let state = state.clone();
        let owner = owner.clone();
        let room_id = room_id.clone();
        let target = user.id.clone();
        tasks.push(tokio::spawn(async move {
            room_service::approve_member(&state, &owner, &room_id, &target).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let room = state.rooms.find_room_by(RoomField::RoomId(&room_id)).await.unwrap().unwrap();
    for user in &users {
        assert_eq!(room.role_of(&user.id), Some(Role::Member), "{} lost its approval", user.username);
    }
}

#[tokio::test]
async fn snapshot_projects_usernames_and_rooms_list_includes_pending() {
    let state = test_state();
    let (owner, _) = sign_up(&state, "olivia").await;
    let (bob, _) = sign_up(&state, "bob").await;
    let created = room_service::create_room(&state, &owner, Some(serde_json::json!({"topic": "design"})))
        .await
        .unwrap();
    let room_id = created.room_id.clone();
    room_service::join_room(&state, &owner, &room_id, &created.password).await.unwrap();
    room_service::join_room(&state, &bob, &room_id, &created.password).await.unwrap();

    let snapshot = room_service::room_snapshot(&state, &room_id).await.unwrap();
    assert_eq!(snapshot.metadata["topic"], "design");
    let bob_view = snapshot.members.iter().find(|m| m.user_id == bob.id).unwrap();
    assert_eq!(bob_view.username, "bob");
    assert_eq!(bob_view.role, Role::Pending);

    let rooms = room_service::list_rooms(&state, &bob).await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].role, "pending");
    let rooms = room_service::list_rooms(&state, &owner).await.unwrap();
    assert_eq!(rooms[0].role, "owner");
}

#[test]
fn join_outcome_reports_role() {
    assert_eq!(JoinOutcome::Pending.role(), Role::Pending);
    assert_eq!(JoinOutcome::Existing(Role::Editor).role(), Role::Editor);
}
