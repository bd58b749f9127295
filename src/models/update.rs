use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::user::Preferences;

/// A discriminated collection of optional mutation instructions, sent as the
/// JSON body of `PUT /user`. Absent fields mean "no change requested".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal: Option<PersonalUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses_taken: Option<CoursesTakenUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interested_sections: Option<InterestedSectionsUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friends: Option<FriendsUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friend_requests: Option<FriendRequestsUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Base64 photo payload uploaded to the portal. Its presence means the
    /// cached photo URL must be cache-busted after the update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// The literal `"default"` resets the avatar to the stock image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoursesTakenUpdate {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestedSectionsUpdate {
    /// New encoded key -> RFC-3339 expiration timestamp.
    pub add: BTreeMap<String, String>,
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FriendsUpdate {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FriendRequestsUpdate {
    pub send: Vec<String>,
    pub remove_incoming: Vec<String>,
    pub remove_outgoing: Vec<String>,
}

impl UpdateRequest {
    /// Ids whose public profiles must be fetched before the local cache can
    /// be patched (new friends and recipients of outgoing requests).
    pub fn profile_ids_needed(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        if let Some(friends) = &self.friends {
            ids.extend(friends.add.iter().map(String::as_str));
        }
        if let Some(requests) = &self.friend_requests {
            ids.extend(requests.send.iter().map(String::as_str));
        }
        ids
    }
}
