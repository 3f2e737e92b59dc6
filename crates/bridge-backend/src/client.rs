// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the cloud backend (Supabase-style REST + RPC).
//!
//! All queue operations go through `/rest/v1/rpc/<function>`, table reads
//! through `/rest/v1/<table>`, and session endpoints through `/auth/v1/`.
//! A backend reply indicating that an RPC function is missing from the
//! schema becomes [`BridgeError::RpcMissing`] so the worker can degrade that
//! job family for the rest of the run.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;

use bridge_core::jobs::{FiscalJob, KitchenJob, ReceiptJob};
use bridge_core::types::{
    AgentInfo, AgentRegistration, JobOutcome, LiveRoutes, RestaurantSummary, RoleMembership,
    SessionSnapshot, UserInfo,
};
use bridge_core::{BridgeError, PrintQueue, SessionBackend, SessionErrorCode};

/// Default timeout for backend calls.
const BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend HTTP client holding the current session tokens.
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<SessionSnapshot>>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            session: RwLock::new(None),
        })
    }

    /// Bearer token for data-plane calls: user access token when signed in,
    /// anon key otherwise.
    async fn bearer(&self) -> String {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    /// Invoke a PostgREST RPC function. An empty reply body parses as Null.
    pub async fn rpc(&self, function: &str, params: Value) -> Result<Value, BridgeError> {
        let url = format!("{}/rest/v1/rpc/{function}", self.base_url);
        let bearer = self.bearer().await;

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("authorization", format!("Bearer {bearer}"))
            .json(&params)
            .send()
            .await
            .map_err(|e| BridgeError::Backend {
                message: format!("rpc {function}: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(function, status = status.as_u16(), "rpc response");

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body).map_err(|e| BridgeError::Backend {
                message: format!("rpc {function}: unparseable reply: {e}"),
                source: Some(Box::new(e)),
            });
        }

        if is_function_missing(&body, function) {
            return Err(BridgeError::RpcMissing {
                function: function.to_string(),
            });
        }

        Err(BridgeError::Backend {
            message: bridge_core::truncate_error(&format!(
                "rpc {function}: HTTP {}: {body}",
                status.as_u16()
            )),
            source: None,
        })
    }

    /// GET a PostgREST table read; `path_and_query` is everything after
    /// `/rest/v1/`.
    async fn select(&self, path_and_query: &str) -> Result<Value, BridgeError> {
        let url = format!("{}/rest/v1/{path_and_query}", self.base_url);
        let bearer = self.bearer().await;

        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("authorization", format!("Bearer {bearer}"))
            .send()
            .await
            .map_err(|e| BridgeError::Backend {
                message: format!("select {path_and_query}: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(BridgeError::Backend {
                message: bridge_core::truncate_error(&format!(
                    "select {path_and_query}: HTTP {}: {body}",
                    status.as_u16()
                )),
                source: None,
            });
        }
        serde_json::from_str(&body).map_err(|e| BridgeError::Backend {
            message: format!("select {path_and_query}: unparseable reply: {e}"),
            source: Some(Box::new(e)),
        })
    }

    fn rows<T: serde::de::DeserializeOwned>(
        value: Value,
        what: &str,
    ) -> Result<Vec<T>, BridgeError> {
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value).map_err(|e| BridgeError::Backend {
            message: format!("{what}: unexpected row shape: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

/// Whether a backend error body reports `function` as missing/unknown.
fn is_function_missing(body: &str, function: &str) -> bool {
    let lower = body.to_lowercase();
    if !lower.contains("function") || !lower.contains(&function.to_lowercase()) {
        return false;
    }
    ["schema cache", "does not exist", "not found", "could not find"]
        .iter()
        .any(|marker| lower.contains(marker))
}

fn outcome_meta(outcome: &JobOutcome) -> Value {
    outcome.meta.clone()
}

#[async_trait]
impl PrintQueue for SupabaseClient {
    async fn claim_kitchen_jobs(
        &self,
        restaurant_id: &str,
        consumer_id: &str,
        limit: u32,
    ) -> Result<Vec<KitchenJob>, BridgeError> {
        let value = self
            .rpc(
                "print_claim_jobs",
                json!({
                    "p_restaurant_id": restaurant_id,
                    "p_consumer_id": consumer_id,
                    "p_limit": limit,
                }),
            )
            .await?;
        Self::rows(value, "print_claim_jobs")
    }

    async fn complete_kitchen_job(
        &self,
        job_id: &str,
        consumer_id: &str,
        outcome: &JobOutcome,
    ) -> Result<(), BridgeError> {
        self.rpc(
            "print_complete_job",
            json!({
                "p_job_id": job_id,
                "p_consumer_id": consumer_id,
                "p_success": outcome.success,
                "p_error": outcome.error,
                "p_meta": outcome_meta(outcome),
            }),
        )
        .await?;
        Ok(())
    }

    async fn claim_fiscal_jobs(
        &self,
        restaurant_id: &str,
        consumer_id: &str,
        limit: u32,
    ) -> Result<Vec<FiscalJob>, BridgeError> {
        let value = self
            .rpc(
                "physical_receipt_claim_jobs",
                json!({
                    "p_restaurant_id": restaurant_id,
                    "p_consumer_id": consumer_id,
                    "p_limit": limit,
                }),
            )
            .await?;
        Self::rows(value, "physical_receipt_claim_jobs")
    }

    async fn complete_fiscal_job(
        &self,
        job_id: &str,
        consumer_id: &str,
        receipt_id: Option<&str>,
        outcome: &JobOutcome,
    ) -> Result<(), BridgeError> {
        self.rpc(
            "physical_receipt_complete_job",
            json!({
                "p_job_id": job_id,
                "p_consumer_id": consumer_id,
                "p_success": outcome.success,
                "p_receipt_id": receipt_id,
                "p_error": outcome.error,
                "p_meta": outcome_meta(outcome),
            }),
        )
        .await?;
        Ok(())
    }

    async fn claim_receipt_jobs(
        &self,
        restaurant_id: &str,
        consumer_id: &str,
        limit: u32,
    ) -> Result<Vec<ReceiptJob>, BridgeError> {
        let value = self
            .rpc(
                "non_fiscal_receipt_claim_jobs",
                json!({
                    "p_restaurant_id": restaurant_id,
                    "p_consumer_id": consumer_id,
                    "p_limit": limit,
                }),
            )
            .await?;
        Self::rows(value, "non_fiscal_receipt_claim_jobs")
    }

    async fn complete_receipt_job(
        &self,
        job_id: &str,
        consumer_id: &str,
        receipt_id: Option<&str>,
        outcome: &JobOutcome,
    ) -> Result<(), BridgeError> {
        self.rpc(
            "non_fiscal_receipt_complete_job",
            json!({
                "p_job_id": job_id,
                "p_consumer_id": consumer_id,
                "p_success": outcome.success,
                "p_receipt_id": receipt_id,
                "p_error": outcome.error,
                "p_meta": outcome_meta(outcome),
            }),
        )
        .await?;
        Ok(())
    }

    async fn register_agent(
        &self,
        registration: &AgentRegistration,
    ) -> Result<Option<String>, BridgeError> {
        let value = self
            .rpc(
                "printing_register_agent",
                json!({
                    "p_restaurant_id": registration.restaurant_id,
                    "p_agent_id": registration.agent_id,
                    "p_printer_id": registration.printer_id,
                    "p_device_name": registration.device_name,
                    "p_app_version": registration.app_version,
                    "p_is_active": registration.is_active,
                }),
            )
            .await?;
        // The function may reply with an object or a single-row array.
        let row = match &value {
            Value::Array(rows) => rows.first().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        };
        Ok(row
            .get("printer_id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn list_agents(&self, restaurant_id: &str) -> Result<Vec<AgentInfo>, BridgeError> {
        let value = self
            .rpc(
                "printing_list_agents",
                json!({ "p_restaurant_id": restaurant_id }),
            )
            .await?;
        Self::rows(value, "printing_list_agents")
    }

    async fn live_routes(&self, restaurant_id: &str) -> Result<LiveRoutes, BridgeError> {
        let restaurant = self.restaurant_by_id(restaurant_id).await?;
        Ok(LiveRoutes::from_printing_settings(
            restaurant.and_then(|r| r.settings).as_ref(),
        ))
    }
}

#[async_trait]
impl SessionBackend for SupabaseClient {
    async fn current_user(&self) -> Result<Option<UserInfo>, BridgeError> {
        if self.session.read().await.is_none() {
            return Ok(None);
        }
        let url = format!("{}/auth/v1/user", self.base_url);
        let bearer = self.bearer().await;

        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("authorization", format!("Bearer {bearer}"))
            .send()
            .await
            .map_err(|e| BridgeError::Backend {
                message: format!("auth user: {e}"),
                source: Some(Box::new(e)),
            })?;

        if matches!(response.status().as_u16(), 401 | 403) {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(BridgeError::Backend {
                message: format!("auth user: HTTP {status}"),
                source: None,
            });
        }
        let body: Value = response.json().await.map_err(|e| BridgeError::Backend {
            message: format!("auth user: unparseable reply: {e}"),
            source: Some(Box::new(e)),
        })?;
        let Some(id) = body.get("id").and_then(Value::as_str) else {
            return Ok(None);
        };
        Ok(Some(UserInfo {
            id: id.to_string(),
            email: body
                .get("email")
                .and_then(Value::as_str)
                .map(str::to_string),
        }))
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<SessionSnapshot, BridgeError> {
        let url = format!(
            "{}/auth/v1/token?grant_type=refresh_token",
            self.base_url
        );
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("authorization", format!("Bearer {}", self.anon_key))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| BridgeError::Backend {
                message: format!("auth refresh: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(BridgeError::Session(SessionErrorCode::Invalid));
        }
        let body: Value = response.json().await.map_err(|e| BridgeError::Backend {
            message: format!("auth refresh: unparseable reply: {e}"),
            source: Some(Box::new(e)),
        })?;

        let access_token = body
            .get("access_token")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let refresh_token = body
            .get("refresh_token")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let snapshot = SessionSnapshot {
            access_token,
            refresh_token,
            expires_at: body.get("expires_at").and_then(Value::as_i64),
        };
        if !snapshot.is_usable() {
            return Err(BridgeError::Session(SessionErrorCode::Invalid));
        }
        Ok(snapshot)
    }

    async fn adopt_session(&self, snapshot: &SessionSnapshot) {
        *self.session.write().await = Some(snapshot.clone());
    }

    async fn drop_session(&self) {
        *self.session.write().await = None;
    }

    async fn owned_restaurants(
        &self,
        user_id: &str,
    ) -> Result<Vec<RestaurantSummary>, BridgeError> {
        let value = self
            .select(&format!(
                "restaurants?select=id,name,city,settings&owner_id=eq.{user_id}&order=created_at.desc"
            ))
            .await?;
        Self::rows(value, "restaurants by owner")
    }

    async fn role_memberships(
        &self,
        user_id: &str,
    ) -> Result<Vec<RoleMembership>, BridgeError> {
        let value = self
            .select(&format!(
                "user_roles?select=restaurant_id,role,created_at&user_id=eq.{user_id}&role=in.(admin,manager,staff)&order=created_at.asc"
            ))
            .await?;
        Self::rows(value, "user roles")
    }

    async fn restaurant_by_id(
        &self,
        restaurant_id: &str,
    ) -> Result<Option<RestaurantSummary>, BridgeError> {
        let value = self
            .select(&format!(
                "restaurants?select=id,name,city,settings&id=eq.{restaurant_id}&limit=1"
            ))
            .await?;
        let rows: Vec<RestaurantSummary> = Self::rows(value, "restaurant by id")?;
        Ok(rows.into_iter().next())
    }
}
