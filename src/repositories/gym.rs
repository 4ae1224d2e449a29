use anyhow::bail;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::models::members::{Member, NewMemberRecord};

/// Client for the membership backend. The backend is authoritative; this
/// client only moves JSON and reports failures upward.
#[derive(Clone)]
pub struct GymApi {
    base_url: String,
    client: reqwest::Client,
}

impl GymApi {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn nonce() -> String {
        Uuid::new_v4().hyphenated().to_string()
    }

    /// `POST admin-login/`. Non-2xx means denied, not an error; only
    /// transport failures bubble up as `Err`.
    pub async fn login_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, anyhow::Error> {
        let payload = json!({
            "username": username,
            "password": password
        });

        let response = self
            .client
            .post(self.url("admin-login/"))
            .header("X-Request-Id", Self::nonce())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(false);
        }

        let body: serde_json::Value = response.json().await?;
        Ok(body
            .get("admin")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false))
    }

    pub async fn list_members(&self) -> Result<Vec<Member>, anyhow::Error> {
        let response = self
            .client
            .get(self.url("admin/viewdetails/"))
            .header("X-Request-Id", Self::nonce())
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("member listing rejected: {}", response.status());
        }

        Ok(response.json().await?)
    }

    pub async fn create_member(
        &self,
        record: &NewMemberRecord,
    ) -> Result<Member, anyhow::Error> {
        let response = self
            .client
            .post(self.url("admin/create-user/"))
            .header("X-Request-Id", Self::nonce())
            .json(record)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("member creation rejected: {}", response.status());
        }

        Ok(response.json().await?)
    }

    pub async fn update_subscription(
        &self,
        id: i64,
        end_date: &str,
    ) -> Result<Member, anyhow::Error> {
        let payload = json!({ "subscription_end_date": end_date });

        let response = self
            .client
            .put(self.url(&format!("admin/update-user/{}/", id)))
            .header("X-Request-Id", Self::nonce())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("subscription update rejected: {}", response.status());
        }

        Ok(response.json().await?)
    }

    pub async fn delete_member(&self, id: i64) -> Result<(), anyhow::Error> {
        let response = self
            .client
            .delete(self.url(&format!("admin/delete-user/{}/", id)))
            .header("X-Request-Id", Self::nonce())
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("member deletion rejected: {}", response.status());
        }

        Ok(())
    }

    /// `POST users/login/` with the mobile number exactly as typed. A 404 is
    /// "no such member", not a transport error.
    pub async fn login_member(
        &self,
        mobile_number: &str,
    ) -> Result<Option<Member>, anyhow::Error> {
        let payload = json!({ "mobile_number": mobile_number });

        let response = self
            .client
            .post(self.url("users/login/"))
            .header("X-Request-Id", Self::nonce())
            .json(&payload)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            bail!("member lookup rejected: {}", response.status());
        }

        Ok(Some(response.json().await?))
    }

    pub async fn update_weight(&self, id: i64, weight: f64) -> Result<Member, anyhow::Error> {
        let payload = json!({ "weight": weight });

        let response = self
            .client
            .patch(self.url(&format!("users/update-weight/{}/", id)))
            .header("X-Request-Id", Self::nonce())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("weight update rejected: {}", response.status());
        }

        Ok(response.json().await?)
    }
}
