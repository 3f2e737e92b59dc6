// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway integration tests: real HTTP against the assembled router.

use std::sync::Arc;

use async_trait::async_trait;

use bridge_config::StateStore;
use bridge_core::jobs::{FiscalJob, KitchenJob, ReceiptJob};
use bridge_core::types::{
    AgentInfo, AgentRegistration, JobOutcome, LiveRoutes, RestaurantSummary, RoleMembership,
    SessionSnapshot, UserInfo,
};
use bridge_core::{BridgeError, PrintQueue, SessionBackend};
use bridge_gateway::{router, GatewayState};
use bridge_worker::Worker;

/// Queue fake that never has work.
struct IdleQueue;

#[async_trait]
impl PrintQueue for IdleQueue {
    async fn claim_kitchen_jobs(
        &self,
        _r: &str,
        _c: &str,
        _l: u32,
    ) -> Result<Vec<KitchenJob>, BridgeError> {
        Ok(Vec::new())
    }

    async fn complete_kitchen_job(
        &self,
        _j: &str,
        _c: &str,
        _o: &JobOutcome,
    ) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn claim_fiscal_jobs(
        &self,
        _r: &str,
        _c: &str,
        _l: u32,
    ) -> Result<Vec<FiscalJob>, BridgeError> {
        Ok(Vec::new())
    }

    async fn complete_fiscal_job(
        &self,
        _j: &str,
        _c: &str,
        _id: Option<&str>,
        _o: &JobOutcome,
    ) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn claim_receipt_jobs(
        &self,
        _r: &str,
        _c: &str,
        _l: u32,
    ) -> Result<Vec<ReceiptJob>, BridgeError> {
        Ok(Vec::new())
    }

    async fn complete_receipt_job(
        &self,
        _j: &str,
        _c: &str,
        _id: Option<&str>,
        _o: &JobOutcome,
    ) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn register_agent(
        &self,
        _reg: &AgentRegistration,
    ) -> Result<Option<String>, BridgeError> {
        Ok(None)
    }

    async fn list_agents(&self, _r: &str) -> Result<Vec<AgentInfo>, BridgeError> {
        Ok(Vec::new())
    }

    async fn live_routes(&self, _r: &str) -> Result<LiveRoutes, BridgeError> {
        Ok(LiveRoutes::default())
    }
}

/// Auth fake with no signed-in user.
struct NoAuth;

#[async_trait]
impl SessionBackend for NoAuth {
    async fn current_user(&self) -> Result<Option<UserInfo>, BridgeError> {
        Ok(None)
    }

    async fn refresh_session(&self, _t: &str) -> Result<SessionSnapshot, BridgeError> {
        Err(BridgeError::Session(bridge_core::SessionErrorCode::Invalid))
    }

    async fn adopt_session(&self, _s: &SessionSnapshot) {}

    async fn drop_session(&self) {}

    async fn owned_restaurants(&self, _u: &str) -> Result<Vec<RestaurantSummary>, BridgeError> {
        Ok(Vec::new())
    }

    async fn role_memberships(&self, _u: &str) -> Result<Vec<RoleMembership>, BridgeError> {
        Ok(Vec::new())
    }

    async fn restaurant_by_id(
        &self,
        _r: &str,
    ) -> Result<Option<RestaurantSummary>, BridgeError> {
        Ok(None)
    }
}

async fn spawn_gateway() -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path());
    let worker = Worker::new(Arc::new(IdleQueue), Arc::new(NoAuth), store, "0.0.0-test")
        .await
        .unwrap();
    let app = router(GatewayState {
        worker: Arc::new(worker),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), dir)
}

#[tokio::test]
async fn state_endpoint_returns_public_snapshot() {
    let (base, _dir) = spawn_gateway().await;
    let body: serde_json::Value = reqwest::get(format!("{base}/v1/state"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["service_running"], false);
    assert_eq!(body["has_session"], false);
    assert_eq!(body["physical_receipt_rpc_available"], true);
    assert!(body["config"]["consumer_id"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn config_endpoint_merges_and_returns_state() {
    let (base, _dir) = spawn_gateway().await;
    let client = reqwest::Client::new();
    let body: serde_json::Value = client
        .post(format!("{base}/v1/config"))
        .json(&serde_json::json!({"device_name": "Cassa Bar", "poll_ms": 4000}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["config"]["device_name"], "Cassa Bar");
    assert_eq!(body["config"]["poll_ms"], 4000);
}

#[tokio::test]
async fn empty_session_sync_is_rejected_with_400() {
    let (base, _dir) = spawn_gateway().await;
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/v1/session/sync"))
        .json(&serde_json::json!({"access_token": "", "refresh_token": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn rt_test_without_host_maps_the_error_code() {
    let (base, _dir) = spawn_gateway().await;
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/v1/test/rt"))
        .json(&serde_json::json!({"host": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "PHYSICAL_RT_HOST_MISSING");
}

#[tokio::test]
async fn log_stream_pushes_appended_rows() {
    let (base, _dir) = spawn_gateway().await;
    let client = reqwest::Client::new();

    // Subscribe first, then trigger a mutation that logs.
    let events = client
        .get(format!("{base}/v1/events/log"))
        .send()
        .await
        .unwrap();

    client
        .post(format!("{base}/v1/session/sync"))
        .json(&serde_json::json!({"access_token": "a", "refresh_token": "r"}))
        .send()
        .await
        .unwrap();

    let chunk = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let mut response = events;
        response.chunk().await.unwrap().unwrap()
    })
    .await
    .expect("log event within timeout");
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("printer-log"), "got: {text}");
}
