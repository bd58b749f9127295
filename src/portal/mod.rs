pub mod dto;

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{FriendProfile, UpdateRequest};

/// Configuration for the remote portal API.
#[derive(Clone, Debug)]
pub struct PortalConfig {
    pub api_base_url: String,
    pub auth_token: String,
}

const DEFAULT_API_BASE_URL: &str = "https://api.scu-schedule-helper.me";

impl PortalConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let api_base_url =
            env::var("PORTAL_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let auth_token = env::var("PORTAL_AUTH_TOKEN")
            .map_err(|_| AppError::BadRequest("PORTAL_AUTH_TOKEN is not set".to_string()))?;
        Ok(Self {
            api_base_url,
            auth_token,
        })
    }
}

/// The remote source of truth for user state. `update_user` is the only
/// mutating call; everything else is a read used to seed or repair the
/// local cache.
#[async_trait]
pub trait PortalClient: Send + Sync {
    /// `PUT /user`. A non-2xx response surfaces the server's message
    /// verbatim as `AppError::RemoteUpdate`.
    async fn update_user(&self, update: &UpdateRequest) -> Result<(), AppError>;

    /// `GET /user/me`, optionally restricted to the named items
    /// (`friends`, `friendRequests`, `personal`, `preferences`,
    /// `coursesTaken`, `interestedSections`).
    async fn get_user(&self, items: &[&str]) -> Result<dto::UserDataResponse, AppError>;

    /// `GET /user/{id}` — another user's public profile.
    async fn get_user_profile(&self, user_id: &str) -> Result<FriendProfile, AppError>;

    /// `GET /user/query?name=…` — prefix search over user names.
    async fn query_users_by_name(&self, name: &str) -> Result<Vec<FriendProfile>, AppError>;
}

pub struct HttpPortalClient {
    client: Client,
    config: PortalConfig,
}

impl HttpPortalClient {
    pub fn new(config: PortalConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }

    fn user_endpoint(&self) -> String {
        format!("{}/user", self.config.api_base_url)
    }

    /// Extracts the portal's error message from a failed response,
    /// falling back to `unknown_message` when the body is not parseable.
    async fn error_message(response: reqwest::Response, unknown_message: &str) -> String {
        response
            .json::<dto::ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| unknown_message.to_string())
    }
}

#[async_trait]
impl PortalClient for HttpPortalClient {
    async fn update_user(&self, update: &UpdateRequest) -> Result<(), AppError> {
        let operation_id = Uuid::new_v4().to_string();
        debug!("PUT /user (operation {})", operation_id);
        let response = self
            .client
            .put(self.user_endpoint())
            .bearer_auth(&self.config.auth_token)
            .header("operation-id", &operation_id)
            .json(update)
            .send()
            .await
            .map_err(|_| {
                AppError::RemoteUpdate(
                    "Error updating user data (you may have been signed out).".to_string(),
                )
            })?;
        if !response.status().is_success() {
            let message =
                Self::error_message(response, "Unknown error updating user data.").await;
            return Err(AppError::RemoteUpdate(message));
        }
        Ok(())
    }

    async fn get_user(&self, items: &[&str]) -> Result<dto::UserDataResponse, AppError> {
        let mut url = format!("{}/me", self.user_endpoint());
        if !items.is_empty() {
            url.push_str(&format!("?items={}", items.join(",")));
        }
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.auth_token)
            .header("operation-id", Uuid::new_v4().to_string())
            .send()
            .await
            .map_err(|_| {
                AppError::RemoteUpdate(
                    "Unknown error fetching user data. Please try again later.".to_string(),
                )
            })?;
        if !response.status().is_success() {
            let message = Self::error_message(response, "Unknown error.").await;
            return Err(AppError::RemoteUpdate(format!(
                "Error fetching user data: {message}"
            )));
        }
        Ok(response.json().await.map_err(|e| {
            AppError::RemoteUpdate(format!("Error parsing user data response: {e}"))
        })?)
    }

    async fn get_user_profile(&self, user_id: &str) -> Result<FriendProfile, AppError> {
        let url = format!("{}/{}", self.user_endpoint(), user_id);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.auth_token)
            .header("operation-id", Uuid::new_v4().to_string())
            .send()
            .await
            .map_err(|_| {
                AppError::RemoteUpdate(
                    "Unknown error getting friend profile. Please try again later.".to_string(),
                )
            })?;
        if !response.status().is_success() {
            let message = Self::error_message(response, "Unknown error.").await;
            return Err(AppError::RemoteUpdate(format!(
                "Error getting friend profile: {message}"
            )));
        }
        Ok(response.json().await.map_err(|e| {
            AppError::RemoteUpdate(format!("Error parsing friend profile response: {e}"))
        })?)
    }

    async fn query_users_by_name(&self, name: &str) -> Result<Vec<FriendProfile>, AppError> {
        let url = format!("{}/query", self.user_endpoint());
        debug!("GET {} (name={})", url, name);
        let response = self
            .client
            .get(&url)
            .query(&[("name", name)])
            .bearer_auth(&self.config.auth_token)
            .header("operation-id", Uuid::new_v4().to_string())
            .send()
            .await
            .map_err(|_| {
                AppError::RemoteUpdate(
                    "Unknown error querying users. Please try again later.".to_string(),
                )
            })?;
        if !response.status().is_success() {
            let message = Self::error_message(response, "Unknown error.").await;
            return Err(AppError::RemoteUpdate(format!(
                "Error searching users: {message}"
            )));
        }
        let body: dto::UserQueryResponse = response.json().await.map_err(|e| {
            AppError::RemoteUpdate(format!("Error parsing user query response: {e}"))
        })?;
        Ok(body.users)
    }
}

/// Portal stub that accepts every update and returns empty data. Useful for
/// local development and tests that only exercise the cache side.
pub struct NoopPortalClient;

#[async_trait]
impl PortalClient for NoopPortalClient {
    async fn update_user(&self, _update: &UpdateRequest) -> Result<(), AppError> {
        Ok(())
    }

    async fn get_user(&self, _items: &[&str]) -> Result<dto::UserDataResponse, AppError> {
        Ok(dto::UserDataResponse::default())
    }

    async fn get_user_profile(&self, user_id: &str) -> Result<FriendProfile, AppError> {
        Ok(FriendProfile {
            id: user_id.to_string(),
            ..FriendProfile::default()
        })
    }

    async fn query_users_by_name(&self, _name: &str) -> Result<Vec<FriendProfile>, AppError> {
        Ok(Vec::new())
    }
}
