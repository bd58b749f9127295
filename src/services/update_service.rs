use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{FriendIndex, FriendProfile, InterestedSectionsUpdate, UpdateRequest};
use crate::portal::PortalClient;
use crate::portal::dto::RequestDirection;
use crate::services::reconciler;
use crate::store::{self, CacheStore};

/// Orchestrates user updates: the remote portal commits first, then the
/// local snapshot is patched to match, so the cache only ever reflects
/// state the server has accepted.
#[derive(Clone)]
pub struct UpdateService {
    store: Arc<dyn CacheStore>,
    portal: Arc<dyn PortalClient>,
}

impl UpdateService {
    pub fn new(store: Arc<dyn CacheStore>, portal: Arc<dyn PortalClient>) -> Self {
        Self { store, portal }
    }

    /// Sends `update` to the portal and, only on success, reconciles the
    /// cached snapshot. A remote failure leaves the cache untouched and
    /// propagates the portal's message verbatim.
    pub async fn update_user(&self, update: &UpdateRequest) -> Result<(), AppError> {
        self.portal.update_user(update).await?;
        let profiles = self.fetch_needed_profiles(update).await?;
        let mut snapshot = store::load_snapshot(self.store.as_ref()).await?;
        reconciler::apply(&mut snapshot, update, &profiles, Utc::now());
        store::save_snapshot(self.store.as_ref(), &snapshot).await?;
        debug!("local cache reconciled after remote update");
        Ok(())
    }

    async fn fetch_needed_profiles(
        &self,
        update: &UpdateRequest,
    ) -> Result<HashMap<String, FriendProfile>, AppError> {
        let mut profiles = HashMap::new();
        for id in update.profile_ids_needed() {
            let profile = self.portal.get_user_profile(id).await?;
            profiles.insert(id.to_string(), profile);
        }
        Ok(profiles)
    }

    /// Replaces the selected snapshot sections wholesale from `GET
    /// /user/me`. An empty `items` slice refreshes everything.
    pub async fn refresh_user_data(&self, items: &[&str]) -> Result<(), AppError> {
        let data = self.portal.get_user(items).await?;
        let all = items.is_empty();
        let mut snapshot = store::load_snapshot(self.store.as_ref()).await?;

        if all || items.contains(&"friends") {
            snapshot.friends.clear();
            snapshot.friend_courses_taken = FriendIndex::default();
            snapshot.friend_interested_sections = FriendIndex::default();
            for friend in &data.friends {
                reconciler::index_friend_records(&mut snapshot, friend);
                snapshot.friends.insert(friend.id.clone(), friend.clone());
            }
        }
        if all || items.contains(&"friendRequests") {
            snapshot.friend_requests_in.clear();
            snapshot.friend_requests_out.clear();
            for request in &data.friend_requests {
                let entry = (request.profile.id.clone(), request.profile.clone());
                match request.direction {
                    RequestDirection::Incoming => {
                        snapshot.friend_requests_in.insert(entry.0, entry.1)
                    }
                    RequestDirection::Outgoing => {
                        snapshot.friend_requests_out.insert(entry.0, entry.1)
                    }
                };
            }
        }
        if all || items.contains(&"personal") {
            snapshot.user_info.id = data.id.clone();
            snapshot.user_info.name = data.name.clone();
            snapshot.user_info.photo_url = data.photo_url.clone();
        }
        if all || items.contains(&"preferences") {
            snapshot.user_info.preferences = data.preferences.clone();
        }
        if all || items.contains(&"coursesTaken") {
            snapshot.user_info.courses_taken = data.courses_taken.iter().cloned().collect();
        }
        if all || items.contains(&"interestedSections") {
            snapshot.user_info.interested_sections = data.interested_sections.clone();
        }

        store::save_snapshot(self.store.as_ref(), &snapshot).await?;
        info!(
            "refreshed user data ({} friends, {} courses, {} sections)",
            snapshot.friends.len(),
            snapshot.user_info.courses_taken.len(),
            snapshot.user_info.interested_sections.len()
        );
        Ok(())
    }

    /// Clears the cached snapshot on sign-out, keeping only the user's
    /// preferences so they survive into the next session.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let snapshot = store::load_snapshot(self.store.as_ref()).await?;
        let mut cleared = crate::models::UserSnapshot::default();
        cleared.user_info.preferences = snapshot.user_info.preferences;
        store::save_snapshot(self.store.as_ref(), &cleared).await?;
        info!("cleared local cache on sign-out");
        Ok(())
    }

    /// Removes interested sections whose expiration has passed, via a
    /// normal update so the remote copy is pruned too. Returns the number
    /// of sections removed; issues no request when nothing expired.
    pub async fn sweep_expired_sections(&self) -> Result<usize, AppError> {
        let snapshot = store::load_snapshot(self.store.as_ref()).await?;
        let now = Utc::now();
        let expired: Vec<String> = snapshot
            .user_info
            .interested_sections
            .iter()
            .filter(|(_, expiration)| is_expired(expiration, now))
            .map(|(key, _)| key.clone())
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }
        let count = expired.len();
        info!("sweeping {} expired interested sections", count);
        self.update_user(&UpdateRequest {
            interested_sections: Some(InterestedSectionsUpdate {
                add: Default::default(),
                remove: expired,
            }),
            ..UpdateRequest::default()
        })
        .await?;
        Ok(count)
    }
}

/// Unparseable expirations are kept, not swept.
fn is_expired(expiration: &str, now: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(expiration)
        .map(|date| date.with_timezone(&Utc) < now)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiration_parsing() {
        let now = Utc::now();
        assert!(is_expired("2020-01-01T00:00:00Z", now));
        assert!(!is_expired("2999-01-01T00:00:00Z", now));
        assert!(!is_expired("not a date", now));
    }
}
