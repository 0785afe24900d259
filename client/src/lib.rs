//! HTTP client for the MiniBank API.
//!
//! Wraps the REST surface, normalizes the response envelope differences
//! between server variants, keeps the session cookie across calls, and
//! renders transaction receipts to PDF.

pub mod normalize;
pub mod receipt;
pub mod session;
pub mod types;

use serde_json::Value;
use thiserror::Error;

use types::{ProfilePatch, Settings, SettingsPatch, SignupForm, Transaction, TransactionForm, User};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The credential is missing or no longer accepted. Callers route this
    /// straight to their login navigation instead of normal error handling.
    #[error("authentication required")]
    AuthRequired,

    #[error("{message} (HTTP {status}, {code})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("receipt rendering failed: {0}")]
    Receipt(String),
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:3000`. The
    /// session cookie set at login is stored and replayed automatically.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Common response funnel: 401 becomes `AuthRequired`, other failures
    /// become `Api` with whatever error body shape the server produced.
    async fn handle(resp: reqwest::Response) -> Result<Value, ClientError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::AuthRequired);
        }

        let body: Value = resp.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let (code, message) = normalize::error_parts(&body);
            return Err(ClientError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }
        Ok(body)
    }

    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        Self::handle(self.http.get(self.url(path)).send().await?).await
    }

    async fn post_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<Value, ClientError> {
        Self::handle(self.http.post(self.url(path)).json(body).send().await?).await
    }

    async fn patch_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<Value, ClientError> {
        Self::handle(self.http.patch(self.url(path)).json(body).send().await?).await
    }

    async fn delete(&self, path: &str) -> Result<(), ClientError> {
        Self::handle(self.http.delete(self.url(path)).send().await?)
            .await
            .map(|_| ())
    }

    // ─── Session ───

    pub async fn signup(&self, form: &SignupForm) -> Result<User, ClientError> {
        let body = self.post_json("/api/signup", form).await?;
        normalize::user(&body)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let body = self
            .post_json(
                "/api/login",
                &serde_json::json!({ "username": username, "password": password }),
            )
            .await?;
        normalize::user(&body)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        Self::handle(self.http.post(self.url("/api/logout")).send().await?)
            .await
            .map(|_| ())
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        let body = self.get("/api/me").await?;
        normalize::user(&body)
    }

    // ─── Users ───

    pub async fn users(&self) -> Result<Vec<User>, ClientError> {
        let body = self.get("/api/users").await?;
        normalize::list(&body, &["users"])?
            .into_iter()
            .map(normalize::user)
            .collect()
    }

    pub async fn user(&self, id: &str) -> Result<User, ClientError> {
        let body = self.get(&format!("/api/users/{id}")).await?;
        normalize::user(&body)
    }

    pub async fn create_user(&self, form: &SignupForm) -> Result<User, ClientError> {
        let body = self.post_json("/api/users", form).await?;
        normalize::user(&body)
    }

    pub async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<User, ClientError> {
        let body = self.patch_json(&format!("/api/users/{id}"), patch).await?;
        normalize::user(&body)
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/api/users/{id}")).await
    }

    pub async fn set_status(&self, id: &str, status: &str) -> Result<User, ClientError> {
        let body = self
            .patch_json(
                &format!("/api/users/{id}/status"),
                &serde_json::json!({ "status": status }),
            )
            .await?;
        normalize::user(&body)
    }

    pub async fn set_balance(&self, id: &str, balance: f64) -> Result<User, ClientError> {
        let body = self
            .patch_json(
                &format!("/api/users/{id}/balance"),
                &serde_json::json!({ "balance": balance }),
            )
            .await?;
        normalize::user(&body)
    }

    pub async fn set_pin(&self, id: &str, pin: &str) -> Result<(), ClientError> {
        Self::handle(
            self.http
                .patch(self.url(&format!("/api/users/{id}/pin")))
                .json(&serde_json::json!({ "pin": pin }))
                .send()
                .await?,
        )
        .await
        .map(|_| ())
    }

    pub async fn verify_pin(&self, id: &str, pin: &str) -> Result<bool, ClientError> {
        let body = self
            .post_json(
                &format!("/api/users/{id}/verify-pin"),
                &serde_json::json!({ "pin": pin }),
            )
            .await?;
        body.get("valid")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| ClientError::Malformed("verify-pin payload missing valid flag".into()))
    }

    // ─── Avatars ───

    pub async fn upload_avatar(
        &self,
        id: &str,
        filename: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ClientError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new().part("avatar", part);

        let body = Self::handle(
            self.http
                .patch(self.url(&format!("/api/users/{id}/avatar")))
                .multipart(form)
                .send()
                .await?,
        )
        .await?;

        body.get("avatar_url")
            .or_else(|| body.get("avatarUrl"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ClientError::Malformed("avatar payload missing url".into()))
    }

    pub async fn delete_avatar(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/api/users/{id}/avatar")).await
    }

    // ─── Transactions ───

    pub async fn create_transaction(&self, form: &TransactionForm) -> Result<Transaction, ClientError> {
        let body = self.post_json("/api/transactions", form).await?;
        normalize::transaction(&body)
    }

    pub async fn transactions_for(&self, user_id: &str) -> Result<Vec<Transaction>, ClientError> {
        let body = self.get(&format!("/api/users/{user_id}/transactions")).await?;
        normalize::list(&body, &["transactions"])?
            .into_iter()
            .map(normalize::transaction)
            .collect()
    }

    pub async fn all_transactions(&self) -> Result<Vec<Transaction>, ClientError> {
        let body = self.get("/api/transactions").await?;
        normalize::list(&body, &["transactions"])?
            .into_iter()
            .map(normalize::transaction)
            .collect()
    }

    pub async fn delete_transaction(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/api/transactions/{id}")).await
    }

    // ─── Settings ───

    pub async fn settings(&self) -> Result<Settings, ClientError> {
        let body = self.get("/api/settings").await?;
        normalize::settings(&body)
    }

    pub async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, ClientError> {
        let body = self.patch_json("/api/settings", patch).await?;
        normalize::settings(&body)
    }
}
