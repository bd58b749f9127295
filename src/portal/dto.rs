use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{FriendProfile, Preferences};

/// Error body returned by the portal on a non-2xx response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// A pending friend request as returned by `GET /user/me`, tagged with its
/// direction relative to the requesting user.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FriendRequestEntry {
    #[serde(rename = "type")]
    pub direction: RequestDirection,
    #[serde(flatten)]
    pub profile: FriendProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDirection {
    Incoming,
    Outgoing,
}

/// Response of `GET /user/me`. When the request selects specific items the
/// portal omits the rest, so every field defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDataResponse {
    pub id: String,
    pub name: String,
    pub photo_url: String,
    pub preferences: Preferences,
    pub courses_taken: Vec<String>,
    pub interested_sections: BTreeMap<String, String>,
    pub friends: Vec<FriendProfile>,
    pub friend_requests: Vec<FriendRequestEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserQueryResponse {
    pub users: Vec<FriendProfile>,
}
