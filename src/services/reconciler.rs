//! Applies an already-remote-committed update to the local cached snapshot,
//! so the UI reflects the change without waiting for a full refresh.
//!
//! The merge is pure: profiles needed for friend additions are fetched by
//! the caller and passed in, and missing cached state defaults to empty.
//! The reconciler itself never fails.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::codec;
use crate::models::{
    FriendProfile, PersonalUpdate, Preferences, UpdateRequest, UserSnapshot,
};

const DEFAULT_AVATAR_URL: &str =
    "https://scu-schedule-helper.s3.us-west-1.amazonaws.com/default-avatar.jpg";

fn user_photo_url(user_id: &str) -> String {
    format!("https://scu-schedule-helper.s3.amazonaws.com/u%23{user_id}/photo")
}

/// Patches `snapshot` in place with the mutations in `update`.
///
/// Callers must only invoke this after the remote update succeeded; the
/// commit-order invariant (remote success strictly precedes local mutation)
/// lives in `UpdateService`, not here.
pub fn apply(
    snapshot: &mut UserSnapshot,
    update: &UpdateRequest,
    fetched_profiles: &HashMap<String, FriendProfile>,
    now: DateTime<Utc>,
) {
    if let Some(personal) = &update.personal {
        apply_personal(snapshot, personal, now);
    }
    if let Some(preferences) = &update.preferences {
        merge_preferences(&mut snapshot.user_info.preferences, preferences);
    }
    if let Some(courses) = &update.courses_taken {
        // Remove before add, so a request carrying the same key in both
        // (the edit-course flow) ends with the key present.
        for key in &courses.remove {
            snapshot.user_info.courses_taken.remove(key);
        }
        for key in &courses.add {
            snapshot.user_info.courses_taken.insert(key.clone());
        }
    }
    if let Some(sections) = &update.interested_sections {
        for key in &sections.remove {
            snapshot.user_info.interested_sections.remove(key);
        }
        for (key, expiration) in &sections.add {
            snapshot
                .user_info
                .interested_sections
                .insert(key.clone(), expiration.clone());
        }
    }
    if let Some(friends) = &update.friends {
        for id in &friends.add {
            let profile = profile_for(fetched_profiles, id);
            // Accepting a request: it stops being pending.
            snapshot.friend_requests_in.remove(id);
            index_friend_records(snapshot, &profile);
            snapshot.friends.insert(id.clone(), profile);
        }
        for id in &friends.remove {
            snapshot.friends.remove(id);
            snapshot.friend_courses_taken.remove_friend(id);
            snapshot.friend_interested_sections.remove_friend(id);
        }
    }
    if let Some(requests) = &update.friend_requests {
        for id in &requests.send {
            let profile = profile_for(fetched_profiles, id);
            snapshot.friend_requests_out.insert(id.clone(), profile);
        }
        for id in &requests.remove_incoming {
            snapshot.friend_requests_in.remove(id);
        }
        for id in &requests.remove_outgoing {
            snapshot.friend_requests_out.remove(id);
        }
    }
}

fn apply_personal(snapshot: &mut UserSnapshot, personal: &PersonalUpdate, now: DateTime<Utc>) {
    let info = &mut snapshot.user_info;
    if let Some(name) = &personal.name {
        info.name = name.clone();
    }
    if personal.photo_url.as_deref() == Some("default") {
        info.photo_url = DEFAULT_AVATAR_URL.to_string();
    }
    if personal.photo.is_some() {
        // Cache-bust so the browser does not keep serving the old image
        // from the same URL.
        info.photo_url = format!("{}?ts={}", user_photo_url(&info.id), now.timestamp());
    }
}

/// Shallow merge: only sub-objects present in the request are replaced;
/// omitted fields are never nulled out.
fn merge_preferences(current: &mut Preferences, update: &Preferences) {
    if let Some(weighting) = &update.score_weighting {
        current.score_weighting = Some(weighting.clone());
    }
    if let Some(range) = &update.preferred_section_time_range {
        current.preferred_section_time_range = Some(range.clone());
    }
    if let Some(tracking) = update.course_tracking {
        current.course_tracking = Some(tracking);
    }
    if let Some(show) = update.show_ratings {
        current.show_ratings = Some(show);
    }
    if let Some(difficulty) = update.difficulty {
        current.difficulty = Some(difficulty);
    }
}

fn profile_for(fetched: &HashMap<String, FriendProfile>, id: &str) -> FriendProfile {
    fetched.get(id).cloned().unwrap_or_else(|| FriendProfile {
        id: id.to_string(),
        ..FriendProfile::default()
    })
}

/// Extends the snapshot's reverse indexes with every parseable record in a
/// friend's profile. Taken courses whose code fails the shape check are
/// skipped; interested sections are indexed unconditionally.
pub fn index_friend_records(snapshot: &mut UserSnapshot, profile: &FriendProfile) {
    for encoded in &profile.courses_taken {
        let Ok(course) = codec::decode_taken(encoded, false) else {
            continue;
        };
        if !codec::looks_like_course_code(&course.course_code) {
            continue;
        }
        snapshot.friend_courses_taken.insert(
            &profile.id,
            &course.course_code,
            &course.professor_name,
            encoded,
        );
    }
    for encoded in profile.interested_sections.keys() {
        let Ok(section) = codec::decode_interested(encoded, false) else {
            continue;
        };
        snapshot.friend_interested_sections.insert(
            &profile.id,
            &section.course_code,
            &section.professor_name,
            encoded,
        );
    }
}
