use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

static APP_CLIENT: OnceCell<Arc<AppClient>> = OnceCell::const_new();

/// Client for the main policy application backend: role data for the
/// capability checks and delivery of mention notifications. This core only
/// decides who to notify; delivery is the backend's concern.
#[derive(Debug)]
pub struct AppClient {
    client: Client,
    base_url: String,
    jwt_secret: String,
    service_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "type")]
    type_: String,
    exp: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MentionNotification<'a> {
    document_id: Uuid,
    comment_id: Uuid,
    author_id: &'a str,
    mentioned_user_ids: &'a [String],
}

impl AppClient {
    pub fn new(base_url: String, jwt_secret: String, service_name: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            jwt_secret,
            service_name,
        }
    }

    fn generate_token(&self) -> String {
        let expiration = Utc::now()
            .checked_add_signed(Duration::seconds(60)) // 1 minute expiration
            .expect("valid timestamp")
            .timestamp();

        let claims = Claims {
            sub: self.service_name.clone(),
            type_: "service".to_string(),
            exp: expiration as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .expect("Failed to generate JWT")
    }

    /// Fetch the principal list for a user
    pub async fn get_prpls(&self, uid: &str) -> Result<serde_json::Value, reqwest::Error> {
        let token = self.generate_token();
        let url = format!("{}/auth/prpls/{}", self.base_url, uid);
        self.client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?
            .json()
            .await
    }

    /// Ask the backend to notify mentioned users about a new comment
    pub async fn notify_mentions(
        &self,
        document_id: Uuid,
        comment_id: Uuid,
        author_id: &str,
        mentioned_user_ids: &[String],
    ) -> Result<(), reqwest::Error> {
        let token = self.generate_token();
        let url = format!("{}/notifications/mentions", self.base_url);
        self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(&MentionNotification {
                document_id,
                comment_id,
                author_id,
                mentioned_user_ids,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Initialize the global AppClient
pub fn init_app_client(
    base_url: String,
    jwt_secret: String,
    service_name: String,
) -> Result<(), &'static str> {
    let client = AppClient::new(base_url, jwt_secret, service_name);
    APP_CLIENT
        .set(Arc::new(client))
        .map_err(|_| "AppClient already initialized")
}

/// Get the global AppClient instance
pub fn get_app_client() -> Option<Arc<AppClient>> {
    APP_CLIENT.get().cloned()
}
