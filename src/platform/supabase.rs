// Production implementation of the `Platform` trait over the hosted
// platform's HTTP surfaces: GoTrue (/auth/v1), PostgREST (/rest/v1),
// object storage (/storage/v1) and the realtime websocket.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::config::{PlatformConfig, RealtimeConfig};
use crate::platform::query::TableQuery;
use crate::platform::realtime::RealtimeClient;
use crate::platform::{Platform, PlatformError, Subscription};
use crate::types::{Document, Note, Profile};

const STORAGE_BUCKET: &str = "documents";

pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
    service_role_key: String,
    realtime: RealtimeClient,
}

impl SupabaseClient {
    pub fn new(
        platform: &PlatformConfig,
        realtime: RealtimeConfig,
    ) -> Result<Self, PlatformError> {
        let base_url = Url::parse(&platform.base_url)
            .map_err(|e| PlatformError::Decode(format!("invalid platform URL: {}", e)))?;
        let realtime = RealtimeClient::new(&platform.base_url, &platform.anon_key, realtime)?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            anon_key: platform.anon_key.clone(),
            service_role_key: platform.service_role_key.clone(),
            realtime,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PlatformError> {
        self.base_url
            .join(path)
            .map_err(|e| PlatformError::Decode(format!("invalid endpoint {}: {}", path, e)))
    }

    /// Headers for privileged server-side calls. The admin gate has
    /// already run by the time these fire; row-level policy is bypassed
    /// on purpose, exactly like the original admin client.
    fn service_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&self.service_role_key) {
            headers.insert("apikey", v);
        }
        if let Ok(v) = HeaderValue::from_str(&format!("Bearer {}", self.service_role_key)) {
            headers.insert(AUTHORIZATION, v);
        }
        headers
    }

    /// Headers for calls made on behalf of the caller's own session.
    fn user_headers(&self, access_token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", v);
        }
        if let Ok(v) = HeaderValue::from_str(&format!("Bearer {}", access_token)) {
            headers.insert(AUTHORIZATION, v);
        }
        headers
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body).unwrap_or(body);
        Err(PlatformError::from_status(status.as_u16(), message))
    }

    async fn rows<T: DeserializeOwned>(&self, query: TableQuery) -> Result<Vec<T>, PlatformError> {
        let url = self.endpoint(&format!("/rest/v1/{}", query.table()))?;
        let response = self
            .http
            .get(url)
            .headers(self.service_headers())
            .query(query.params())
            .send()
            .await?;
        let response = Self::check(response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))
    }

    async fn insert_row(&self, table: &str, body: Value) -> Result<(), PlatformError> {
        let url = self.endpoint(&format!("/rest/v1/{}", table))?;
        let response = self
            .http
            .post(url)
            .headers(self.service_headers())
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn delete_rows(&self, query: TableQuery) -> Result<(), PlatformError> {
        let url = self.endpoint(&format!("/rest/v1/{}", query.table()))?;
        let response = self
            .http
            .delete(url)
            .headers(self.service_headers())
            .query(query.params())
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl Platform for SupabaseClient {
    async fn invite_by_email(&self, email: &str) -> Result<(), PlatformError> {
        let url = self.endpoint("/auth/v1/invite")?;
        let response = self
            .http
            .post(url)
            .headers(self.service_headers())
            .json(&json!({ "email": email }))
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), PlatformError> {
        let url = self.endpoint("/auth/v1/user")?;
        let response = self
            .http
            .put(url)
            .headers(self.user_headers(access_token))
            .json(&json!({ "password": new_password }))
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), PlatformError> {
        let mut url = self.endpoint("/auth/v1/recover")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        let response = self
            .http
            .post(url)
            .headers(self.user_headers(&self.anon_key))
            .json(&json!({ "email": email }))
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), PlatformError> {
        let url = self.endpoint("/auth/v1/logout")?;
        let response = self
            .http
            .post(url)
            .headers(self.user_headers(access_token))
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn fetch_profile(&self, id: Uuid) -> Result<Option<Profile>, PlatformError> {
        let query = TableQuery::new("profiles").eq("id", id).limit(1);
        let mut rows: Vec<Profile> = self.rows(query).await?;
        Ok(rows.pop())
    }

    async fn list_customers(&self) -> Result<Vec<Profile>, PlatformError> {
        let query = TableQuery::new("profiles")
            .neq("role", "admin")
            .order("created_at", false);
        self.rows(query).await
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<Document>, PlatformError> {
        let query = TableQuery::new("documents")
            .eq("user_id", user_id)
            .order("created_at", false);
        self.rows(query).await
    }

    async fn fetch_document(&self, id: Uuid) -> Result<Option<Document>, PlatformError> {
        let query = TableQuery::new("documents").eq("id", id).limit(1);
        let mut rows: Vec<Document> = self.rows(query).await?;
        Ok(rows.pop())
    }

    async fn delete_document_row(&self, id: Uuid) -> Result<(), PlatformError> {
        self.delete_rows(TableQuery::new("documents").eq("id", id)).await
    }

    async fn list_notes(&self, document_id: Uuid) -> Result<Vec<Note>, PlatformError> {
        let query = TableQuery::new("notes")
            .eq("document_id", document_id)
            .order("created_at", true);
        self.rows(query).await
    }

    async fn insert_note(
        &self,
        document_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.insert_row(
            "notes",
            json!({
                "document_id": document_id,
                "author_id": author_id,
                "content": content,
            }),
        )
        .await
    }

    async fn pinged_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<bool, PlatformError> {
        let query = TableQuery::new("ping")
            .select("id")
            .gte("created_at", from.to_rfc3339())
            .lt("created_at", to.to_rfc3339())
            .limit(1);
        let rows: Vec<Value> = self.rows(query).await?;
        Ok(!rows.is_empty())
    }

    async fn insert_ping(&self, source: &str) -> Result<(), PlatformError> {
        self.insert_row("ping", json!({ "source": source })).await
    }

    async fn remove_object(&self, path: &str) -> Result<(), PlatformError> {
        let url = self.endpoint(&format!("/storage/v1/object/{}", STORAGE_BUCKET))?;
        let response = self
            .http
            .delete(url)
            .headers(self.service_headers())
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn create_signed_url(&self, path: &str, ttl_secs: u32) -> Result<String, PlatformError> {
        let url =
            self.endpoint(&format!("/storage/v1/object/sign/{}/{}", STORAGE_BUCKET, path))?;
        let response = self
            .http
            .post(url)
            .headers(self.service_headers())
            .json(&json!({ "expiresIn": ttl_secs }))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        let signed_path = body
            .get("signedURL")
            .and_then(Value::as_str)
            .ok_or_else(|| PlatformError::Decode("missing signedURL in response".to_string()))?;
        let full = self.endpoint(&format!("/storage/v1{}", signed_path))?;
        Ok(full.to_string())
    }

    async fn subscribe_notes(&self, document_id: Uuid) -> Result<Subscription, PlatformError> {
        Ok(self.realtime.subscribe_note_inserts(document_id))
    }

    async fn health_check(&self) -> Result<(), PlatformError> {
        let url = self.endpoint("/auth/v1/health")?;
        let response = self
            .http
            .get(url)
            .headers(self.service_headers())
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }
}

/// GoTrue and PostgREST error bodies both carry a message field, under
/// different names.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["message", "msg", "error_description", "error"] {
        if let Some(message) = value.get(key).and_then(Value::as_str) {
            return Some(message.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_postgrest_message() {
        assert_eq!(
            extract_message(r#"{"message":"duplicate key"}"#).as_deref(),
            Some("duplicate key")
        );
        assert_eq!(
            extract_message(r#"{"msg":"User not allowed"}"#).as_deref(),
            Some("User not allowed")
        );
        assert_eq!(extract_message("not json"), None);
    }

    #[test]
    fn client_rejects_bad_base_url() {
        let platform = PlatformConfig {
            base_url: "not a url".to_string(),
            anon_key: String::new(),
            service_role_key: String::new(),
            jwt_secret: String::new(),
            reset_redirect_url: String::new(),
        };
        let realtime = RealtimeConfig {
            heartbeat_secs: 25,
            subscribe_timeout_secs: 5,
            reconnect_base_ms: 250,
            reconnect_max_secs: 30,
        };
        assert!(SupabaseClient::new(&platform, realtime).is_err());
    }
}
