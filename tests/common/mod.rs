#![allow(dead_code)]

// Shared harness: the real router driven in-process over an in-memory
// platform, one oneshot call per request. No sockets, no external state.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use maury_portal_api::app::app;
use maury_portal_api::testing::{mint_token, test_state, FakePlatform};
use maury_portal_api::types::Profile;

pub struct Harness {
    pub platform: Arc<FakePlatform>,
    pub app: Router,
}

impl Harness {
    pub fn new() -> Self {
        let platform = Arc::new(FakePlatform::new());
        let app = app(test_state(platform.clone()));
        Self { platform, app }
    }

    /// Seed an admin profile and mint a token for it.
    pub fn admin(&self) -> (Profile, String) {
        let profile = self.platform.seed_admin("admin@maury.it");
        let token = mint_token(profile.id, &profile.email);
        (profile, token)
    }

    /// Seed a customer profile and mint a token for it.
    pub fn customer(&self, email: &str, company: &str) -> (Profile, String) {
        let profile = self.platform.seed_customer(email, company);
        let token = mint_token(profile.id, &profile.email);
        (profile, token)
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .context("reading response body")?
            .to_bytes();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response was not JSON")?
        };
        Ok((status, json))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request("GET", path, token, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        self.request("POST", path, token, body).await
    }

    pub async fn put(
        &self,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        self.request("PUT", path, token, body).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request("DELETE", path, token, None).await
    }
}
