use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Weighting between SCU course evaluations and RateMyProfessors data,
/// expressed as percentages that sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeighting {
    pub scu_evals: u32,
    pub rmp: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionTimeRange {
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_hour: u32,
    pub end_minute: u32,
}

/// User preferences. Every field is optional: an update request carries only
/// the sub-objects it wants changed, and the reconciler merges them without
/// nulling out anything omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub score_weighting: Option<ScoreWeighting>,
    pub preferred_section_time_range: Option<SectionTimeRange>,
    pub course_tracking: Option<bool>,
    pub show_ratings: Option<bool>,
    /// Preferred difficulty on a 0-4 scale; divided by 4 it becomes the
    /// preferred percentile used for color mapping.
    pub difficulty: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub photo_url: String,
    pub preferences: Preferences,
    /// Encoded taken-course keys. Two entries are the same course iff the
    /// keys are byte-for-byte equal.
    pub courses_taken: BTreeSet<String>,
    /// Encoded section key -> RFC-3339 expiration timestamp.
    pub interested_sections: BTreeMap<String, String>,
}

/// A friend's public profile as returned by the portal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FriendProfile {
    pub id: String,
    pub name: String,
    pub photo_url: String,
    pub courses_taken: Vec<String>,
    pub interested_sections: BTreeMap<String, String>,
}

/// Reverse lookup from course code / professor name to the friends who took
/// that course (or saved that section) and the encoded records themselves.
///
/// A friend has at most one entry per course code, but may appear under a
/// professor with several records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FriendIndex {
    pub by_course: BTreeMap<String, BTreeMap<String, String>>,
    pub by_professor: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl FriendIndex {
    pub fn insert(&mut self, friend_id: &str, course_code: &str, professor: &str, encoded: &str) {
        self.by_course
            .entry(course_code.to_string())
            .or_default()
            .insert(friend_id.to_string(), encoded.to_string());
        self.by_professor
            .entry(professor.to_string())
            .or_default()
            .entry(friend_id.to_string())
            .or_default()
            .push(encoded.to_string());
    }

    /// Scrubs every entry belonging to `friend_id`, pruning emptied buckets.
    pub fn remove_friend(&mut self, friend_id: &str) {
        for bucket in self.by_course.values_mut() {
            bucket.remove(friend_id);
        }
        self.by_course.retain(|_, bucket| !bucket.is_empty());
        for bucket in self.by_professor.values_mut() {
            bucket.remove(friend_id);
        }
        self.by_professor.retain(|_, bucket| !bucket.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        self.by_course.is_empty() && self.by_professor.is_empty()
    }
}

/// The locally cached mirror of a user's server-side state. Created on
/// sign-in, patched in place by the reconciler after every successful remote
/// update, and replaced wholesale on periodic full refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSnapshot {
    pub user_info: UserInfo,
    pub friends: BTreeMap<String, FriendProfile>,
    pub friend_requests_in: BTreeMap<String, FriendProfile>,
    pub friend_requests_out: BTreeMap<String, FriendProfile>,
    pub friend_courses_taken: FriendIndex,
    pub friend_interested_sections: FriendIndex,
}
