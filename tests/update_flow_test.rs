use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use schedule_helper::codec;
use schedule_helper::error::AppError;
use schedule_helper::models::{
    CoursesTakenUpdate, FriendProfile, FriendsUpdate, InterestedSectionsUpdate, UpdateRequest,
};
use schedule_helper::portal::dto::{FriendRequestEntry, RequestDirection, UserDataResponse};
use schedule_helper::portal::PortalClient;
use schedule_helper::services::UpdateService;
use schedule_helper::store::{self, MemoryCacheStore};

/// Scripted portal double: can be told to reject updates, records every
/// update it accepts, and serves canned profiles and user data.
struct FakePortal {
    fail_update_with: Option<String>,
    profiles: HashMap<String, FriendProfile>,
    user_data: UserDataResponse,
    update_calls: Mutex<Vec<UpdateRequest>>,
}

impl FakePortal {
    fn accepting() -> Self {
        Self {
            fail_update_with: None,
            profiles: HashMap::new(),
            user_data: UserDataResponse::default(),
            update_calls: Mutex::new(Vec::new()),
        }
    }

    fn rejecting(message: &str) -> Self {
        Self {
            fail_update_with: Some(message.to_string()),
            ..Self::accepting()
        }
    }

    fn recorded_updates(&self) -> Vec<UpdateRequest> {
        self.update_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PortalClient for FakePortal {
    async fn update_user(&self, update: &UpdateRequest) -> Result<(), AppError> {
        if let Some(message) = &self.fail_update_with {
            return Err(AppError::RemoteUpdate(message.clone()));
        }
        self.update_calls.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn get_user(&self, _items: &[&str]) -> Result<UserDataResponse, AppError> {
        Ok(self.user_data.clone())
    }

    async fn get_user_profile(&self, user_id: &str) -> Result<FriendProfile, AppError> {
        self.profiles.get(user_id).cloned().ok_or_else(|| {
            AppError::RemoteUpdate(format!("Error getting friend profile: {user_id} not found"))
        })
    }

    async fn query_users_by_name(&self, _name: &str) -> Result<Vec<FriendProfile>, AppError> {
        Ok(Vec::new())
    }
}

fn taken_token(code_and_name: &str, term: &str) -> String {
    codec::encode_taken("Jane Smith", code_and_name, term)
}

#[tokio::test]
async fn remote_failure_leaves_cache_untouched() {
    let store = Arc::new(MemoryCacheStore::new());
    let mut snapshot = schedule_helper::models::UserSnapshot::default();
    snapshot
        .user_info
        .courses_taken
        .insert(taken_token("CSCI 10 - Intro", "Fall 2023"));
    store::save_snapshot(store.as_ref(), &snapshot).await.unwrap();
    let before = serde_json::to_string(&store::load_snapshot(store.as_ref()).await.unwrap()).unwrap();

    let portal = Arc::new(FakePortal::rejecting("Course limit exceeded."));
    let service = UpdateService::new(store.clone(), portal.clone());

    let result = service
        .update_user(&UpdateRequest {
            courses_taken: Some(CoursesTakenUpdate {
                add: vec![taken_token("MATH 11 - Calculus I", "Winter 2024")],
                remove: vec![],
            }),
            ..UpdateRequest::default()
        })
        .await;

    match result {
        Err(AppError::RemoteUpdate(message)) => assert_eq!(message, "Course limit exceeded."),
        other => panic!("expected remote update error, got {other:?}"),
    }

    // The reconciler must never have run: the snapshot is byte-identical.
    let after = serde_json::to_string(&store::load_snapshot(store.as_ref()).await.unwrap()).unwrap();
    assert_eq!(before, after);
    assert!(portal.recorded_updates().is_empty());
}

#[tokio::test]
async fn successful_update_reconciles_cache() {
    let store = Arc::new(MemoryCacheStore::new());
    let mut portal = FakePortal::accepting();
    portal.profiles.insert(
        "f1".to_string(),
        FriendProfile {
            id: "f1".to_string(),
            name: "Friend One".to_string(),
            courses_taken: vec![taken_token("CSCI 10 - Intro", "Fall 2023")],
            ..FriendProfile::default()
        },
    );
    let portal = Arc::new(portal);
    let service = UpdateService::new(store.clone(), portal.clone());

    let new_course = taken_token("PHYS 31 - Mechanics", "Spring 2024");
    service
        .update_user(&UpdateRequest {
            courses_taken: Some(CoursesTakenUpdate {
                add: vec![new_course.clone()],
                remove: vec![],
            }),
            friends: Some(FriendsUpdate {
                add: vec!["f1".to_string()],
                remove: vec![],
            }),
            ..UpdateRequest::default()
        })
        .await
        .unwrap();

    let snapshot = store::load_snapshot(store.as_ref()).await.unwrap();
    assert!(snapshot.user_info.courses_taken.contains(&new_course));
    assert_eq!(snapshot.friends["f1"].name, "Friend One");
    assert!(snapshot.friend_courses_taken.by_course.contains_key("CSCI10"));
    assert_eq!(portal.recorded_updates().len(), 1);
}

#[tokio::test]
async fn edit_course_replaces_key_atomically() {
    let store = Arc::new(MemoryCacheStore::new());
    let old_key = taken_token("CSCI 10 - Intro", "Fall 2023");
    let mut snapshot = schedule_helper::models::UserSnapshot::default();
    snapshot.user_info.courses_taken.insert(old_key.clone());
    store::save_snapshot(store.as_ref(), &snapshot).await.unwrap();

    let service = UpdateService::new(store.clone(), Arc::new(FakePortal::accepting()));

    let new_key = taken_token("CSCI 10 - Intro", "Winter 2024");
    service
        .update_user(&UpdateRequest {
            courses_taken: Some(CoursesTakenUpdate {
                remove: vec![old_key.clone()],
                add: vec![new_key.clone()],
            }),
            ..UpdateRequest::default()
        })
        .await
        .unwrap();

    let snapshot = store::load_snapshot(store.as_ref()).await.unwrap();
    assert!(!snapshot.user_info.courses_taken.contains(&old_key));
    assert!(snapshot.user_info.courses_taken.contains(&new_key));
}

#[tokio::test]
async fn sweep_removes_only_expired_sections() {
    let store = Arc::new(MemoryCacheStore::new());
    let mut snapshot = schedule_helper::models::UserSnapshot::default();
    let expired_key = codec::encode_interested("A", "CSCI 10 - Intro", "M W F | 9:15 AM - 10:20 AM");
    let live_key = codec::encode_interested("B", "MATH 11 - Calculus I", "T Th | 2:00 PM - 3:40 PM");
    snapshot
        .user_info
        .interested_sections
        .insert(expired_key.clone(), "2020-01-01T00:00:00Z".to_string());
    snapshot
        .user_info
        .interested_sections
        .insert(live_key.clone(), "2999-01-01T00:00:00Z".to_string());
    store::save_snapshot(store.as_ref(), &snapshot).await.unwrap();

    let portal = Arc::new(FakePortal::accepting());
    let service = UpdateService::new(store.clone(), portal.clone());

    let swept = service.sweep_expired_sections().await.unwrap();
    assert_eq!(swept, 1);

    let updates = portal.recorded_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].interested_sections,
        Some(InterestedSectionsUpdate {
            add: Default::default(),
            remove: vec![expired_key.clone()],
        })
    );

    let snapshot = store::load_snapshot(store.as_ref()).await.unwrap();
    assert!(!snapshot.user_info.interested_sections.contains_key(&expired_key));
    assert!(snapshot.user_info.interested_sections.contains_key(&live_key));

    // A second sweep finds nothing and issues no request.
    assert_eq!(service.sweep_expired_sections().await.unwrap(), 0);
    assert_eq!(portal.recorded_updates().len(), 1);
}

#[tokio::test]
async fn full_refresh_replaces_snapshot_wholesale() {
    let store = Arc::new(MemoryCacheStore::new());
    let mut stale = schedule_helper::models::UserSnapshot::default();
    stale.friends.insert("gone".to_string(), FriendProfile::default());
    stale
        .user_info
        .courses_taken
        .insert(taken_token("OLD 1 - Gone", "Fall 2020"));
    store::save_snapshot(store.as_ref(), &stale).await.unwrap();

    let mut portal = FakePortal::accepting();
    portal.user_data = UserDataResponse {
        id: "u1".to_string(),
        name: "Test User".to_string(),
        photo_url: "https://example.test/photo".to_string(),
        courses_taken: vec![taken_token("CSCI 10 - Intro", "Fall 2023")],
        friends: vec![FriendProfile {
            id: "f1".to_string(),
            name: "Friend One".to_string(),
            courses_taken: vec![taken_token("CSCI 10 - Intro", "Fall 2023")],
            ..FriendProfile::default()
        }],
        friend_requests: vec![FriendRequestEntry {
            direction: RequestDirection::Incoming,
            profile: FriendProfile {
                id: "f2".to_string(),
                name: "Friend Two".to_string(),
                ..FriendProfile::default()
            },
        }],
        ..UserDataResponse::default()
    };
    let service = UpdateService::new(store.clone(), Arc::new(portal));

    service.refresh_user_data(&[]).await.unwrap();

    let snapshot = store::load_snapshot(store.as_ref()).await.unwrap();
    assert_eq!(snapshot.user_info.id, "u1");
    assert_eq!(snapshot.user_info.courses_taken.len(), 1);
    assert!(!snapshot.friends.contains_key("gone"));
    assert!(snapshot.friends.contains_key("f1"));
    assert!(snapshot.friend_requests_in.contains_key("f2"));
    assert!(snapshot.friend_requests_out.is_empty());
    assert!(snapshot.friend_courses_taken.by_course.contains_key("CSCI10"));
}

#[tokio::test]
async fn sign_out_keeps_only_preferences() {
    use schedule_helper::models::{Preferences, ScoreWeighting};

    let store = Arc::new(MemoryCacheStore::new());
    let mut snapshot = schedule_helper::models::UserSnapshot::default();
    snapshot.user_info.id = "u1".to_string();
    snapshot.user_info.preferences = Preferences {
        score_weighting: Some(ScoreWeighting { scu_evals: 70, rmp: 30 }),
        ..Preferences::default()
    };
    snapshot
        .user_info
        .courses_taken
        .insert(taken_token("CSCI 10 - Intro", "Fall 2023"));
    snapshot.friends.insert("f1".to_string(), FriendProfile::default());
    store::save_snapshot(store.as_ref(), &snapshot).await.unwrap();

    let service = UpdateService::new(store.clone(), Arc::new(FakePortal::accepting()));
    service.sign_out().await.unwrap();

    let cleared = store::load_snapshot(store.as_ref()).await.unwrap();
    assert_eq!(
        cleared.user_info.preferences.score_weighting,
        Some(ScoreWeighting { scu_evals: 70, rmp: 30 })
    );
    assert!(cleared.user_info.id.is_empty());
    assert!(cleared.user_info.courses_taken.is_empty());
    assert!(cleared.friends.is_empty());
}

#[tokio::test]
async fn partial_refresh_leaves_other_sections() {
    let store = Arc::new(MemoryCacheStore::new());
    let mut snapshot = schedule_helper::models::UserSnapshot::default();
    let kept = taken_token("CSCI 10 - Intro", "Fall 2023");
    snapshot.user_info.courses_taken.insert(kept.clone());
    store::save_snapshot(store.as_ref(), &snapshot).await.unwrap();

    let mut portal = FakePortal::accepting();
    portal.user_data = UserDataResponse {
        friends: vec![FriendProfile {
            id: "f1".to_string(),
            ..FriendProfile::default()
        }],
        ..UserDataResponse::default()
    };
    let service = UpdateService::new(store.clone(), Arc::new(portal));

    service.refresh_user_data(&["friends"]).await.unwrap();

    let snapshot = store::load_snapshot(store.as_ref()).await.unwrap();
    assert!(snapshot.friends.contains_key("f1"));
    // coursesTaken was not in the requested items, so it survives.
    assert!(snapshot.user_info.courses_taken.contains(&kept));
}
