// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the print worker: claim → route → render → deliver
//! → ack, RPC degradation, heartbeat assignment, and the control surface.
//!
//! The cloud queue and the auth backend are in-memory fakes; printers are
//! real loopback TCP listeners and fiscal devices are wiremock servers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bridge_config::{ConfigPatch, StateStore};
use bridge_core::jobs::{FiscalJob, KitchenJob, ReceiptJob};
use bridge_core::log::LogLevel;
use bridge_core::types::{
    AgentInfo, AgentRegistration, JobOutcome, LiveRoutes, RestaurantSummary, RoleMembership,
    SessionSnapshot, UserInfo,
};
use bridge_core::{BridgeError, PrintQueue, SessionBackend};
use bridge_worker::Worker;

// ---- fakes ----

#[derive(Debug, Clone)]
struct RecordedCompletion {
    job_id: String,
    success: bool,
    error: Option<String>,
    receipt_id: Option<String>,
}

#[derive(Default)]
struct FakeQueue {
    kitchen_batches: Mutex<VecDeque<Vec<KitchenJob>>>,
    fiscal_batches: Mutex<VecDeque<Vec<FiscalJob>>>,
    receipt_batches: Mutex<VecDeque<Vec<ReceiptJob>>>,
    routes: Mutex<LiveRoutes>,
    completions: Mutex<Vec<RecordedCompletion>>,
    registrations: Mutex<Vec<AgentRegistration>>,
    agents: Mutex<Vec<AgentInfo>>,
    register_reply: Mutex<Option<String>>,
    fiscal_claim_calls: AtomicU32,
    fiscal_function_missing: AtomicBool,
    kitchen_ack_fails: AtomicBool,
}

impl FakeQueue {
    async fn push_kitchen(&self, jobs: Vec<KitchenJob>) {
        self.kitchen_batches.lock().await.push_back(jobs);
    }

    async fn push_fiscal(&self, jobs: Vec<FiscalJob>) {
        self.fiscal_batches.lock().await.push_back(jobs);
    }

    async fn set_routes(&self, routes: LiveRoutes) {
        *self.routes.lock().await = routes;
    }

    async fn completions(&self) -> Vec<RecordedCompletion> {
        self.completions.lock().await.clone()
    }

    async fn record(&self, job_id: &str, outcome: &JobOutcome, receipt_id: Option<&str>) {
        self.completions.lock().await.push(RecordedCompletion {
            job_id: job_id.to_string(),
            success: outcome.success,
            error: outcome.error.clone(),
            receipt_id: receipt_id.map(str::to_string),
        });
    }
}

#[async_trait]
impl PrintQueue for FakeQueue {
    async fn claim_kitchen_jobs(
        &self,
        _restaurant_id: &str,
        _consumer_id: &str,
        _limit: u32,
    ) -> Result<Vec<KitchenJob>, BridgeError> {
        Ok(self
            .kitchen_batches
            .lock()
            .await
            .pop_front()
            .unwrap_or_default())
    }

    async fn complete_kitchen_job(
        &self,
        job_id: &str,
        _consumer_id: &str,
        outcome: &JobOutcome,
    ) -> Result<(), BridgeError> {
        self.record(job_id, outcome, None).await;
        if self.kitchen_ack_fails.load(Ordering::SeqCst) {
            return Err(BridgeError::Backend {
                message: "ack rejected".into(),
                source: None,
            });
        }
        Ok(())
    }

    async fn claim_fiscal_jobs(
        &self,
        _restaurant_id: &str,
        _consumer_id: &str,
        _limit: u32,
    ) -> Result<Vec<FiscalJob>, BridgeError> {
        self.fiscal_claim_calls.fetch_add(1, Ordering::SeqCst);
        if self.fiscal_function_missing.load(Ordering::SeqCst) {
            return Err(BridgeError::RpcMissing {
                function: "physical_receipt_claim_jobs".into(),
            });
        }
        Ok(self
            .fiscal_batches
            .lock()
            .await
            .pop_front()
            .unwrap_or_default())
    }

    async fn complete_fiscal_job(
        &self,
        job_id: &str,
        _consumer_id: &str,
        receipt_id: Option<&str>,
        outcome: &JobOutcome,
    ) -> Result<(), BridgeError> {
        self.record(job_id, outcome, receipt_id).await;
        Ok(())
    }

    async fn claim_receipt_jobs(
        &self,
        _restaurant_id: &str,
        _consumer_id: &str,
        _limit: u32,
    ) -> Result<Vec<ReceiptJob>, BridgeError> {
        Ok(self
            .receipt_batches
            .lock()
            .await
            .pop_front()
            .unwrap_or_default())
    }

    async fn complete_receipt_job(
        &self,
        job_id: &str,
        _consumer_id: &str,
        receipt_id: Option<&str>,
        outcome: &JobOutcome,
    ) -> Result<(), BridgeError> {
        self.record(job_id, outcome, receipt_id).await;
        Ok(())
    }

    async fn register_agent(
        &self,
        registration: &AgentRegistration,
    ) -> Result<Option<String>, BridgeError> {
        self.registrations.lock().await.push(registration.clone());
        Ok(self.register_reply.lock().await.clone())
    }

    async fn list_agents(&self, _restaurant_id: &str) -> Result<Vec<AgentInfo>, BridgeError> {
        Ok(self.agents.lock().await.clone())
    }

    async fn live_routes(&self, _restaurant_id: &str) -> Result<LiveRoutes, BridgeError> {
        Ok(self.routes.lock().await.clone())
    }
}

/// Auth backend that always recognizes one signed-in owner.
struct FakeAuth;

#[async_trait]
impl SessionBackend for FakeAuth {
    async fn current_user(&self) -> Result<Option<UserInfo>, BridgeError> {
        Ok(Some(UserInfo {
            id: "user-1".into(),
            email: Some("owner@aoyama.it".into()),
        }))
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<SessionSnapshot, BridgeError> {
        Err(BridgeError::Session(bridge_core::SessionErrorCode::Invalid))
    }

    async fn adopt_session(&self, _snapshot: &SessionSnapshot) {}

    async fn drop_session(&self) {}

    async fn owned_restaurants(
        &self,
        _user_id: &str,
    ) -> Result<Vec<RestaurantSummary>, BridgeError> {
        Ok(vec![RestaurantSummary {
            id: "rest-1".into(),
            name: "Aoyama".into(),
            city: Some("Milano".into()),
            settings: None,
        }])
    }

    async fn role_memberships(&self, _user_id: &str) -> Result<Vec<RoleMembership>, BridgeError> {
        Ok(Vec::new())
    }

    async fn restaurant_by_id(
        &self,
        _restaurant_id: &str,
    ) -> Result<Option<RestaurantSummary>, BridgeError> {
        Ok(None)
    }
}

struct Harness {
    worker: Arc<Worker>,
    queue: Arc<FakeQueue>,
    _dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path());
    let queue = Arc::new(FakeQueue::default());
    let worker = Worker::new(queue.clone(), Arc::new(FakeAuth), store, "1.0.0-test")
        .await
        .unwrap();
    Harness {
        worker: Arc::new(worker),
        queue,
        _dir: dir,
    }
}

fn routes_for(host: &str, port: u16) -> LiveRoutes {
    LiveRoutes::from_printing_settings(Some(&json!({
        "printing": {
            "printers": [
                {"id": "p1", "name": "Cucina", "host": host, "port": port,
                 "enabled": true, "departments": ["cucina"]}
            ]
        }
    })))
}

async fn printer_listener() -> (u16, tokio::task::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        socket.read_to_end(&mut buf).await.unwrap();
        buf
    });
    (port, handle)
}

fn s1_job() -> KitchenJob {
    serde_json::from_value(json!({
        "id": "abc12345-6789",
        "department": "cucina",
        "payload": {
            "restaurant_name": "Aoyama",
            "table_number": "7",
            "order_number": 42,
            "created_at": "2024-01-15T12:30:00Z",
            "items": [
                {"name": "TUNA ROLL", "quantity": 2},
                {"name": "salmon nigiri", "quantity": 1, "notes": "no wasabi"}
            ]
        },
        "route": {"id": "p1"}
    }))
    .unwrap()
}

fn bytes_contain(haystack: &[u8], needle: &str) -> bool {
    let needle = needle.as_bytes();
    haystack.windows(needle.len()).any(|w| w == needle)
}

// ---- scenarios ----

#[tokio::test]
async fn happy_kitchen_path_prints_and_acks() {
    let h = harness().await;
    let (port, capture) = printer_listener().await;
    h.queue.set_routes(routes_for("127.0.0.1", port)).await;
    h.queue.push_kitchen(vec![s1_job()]).await;

    h.worker.run_tick().await;

    let bytes = capture.await.unwrap();
    assert!(bytes.starts_with(&[0x1B, 0x40, 0x1B, 0x4D, 0x01, 0x1B, 0x20, 0x02]));
    assert!(bytes.ends_with(&[0x1B, 0x64, 0x07, 0x1D, 0x56, 0x00]));
    assert!(bytes_contain(&bytes, "COMANDA CUCINA #42"));
    assert!(bytes_contain(&bytes, "TAVOLO: 7"));
    assert!(bytes_contain(&bytes, "2x Tuna Roll"));
    assert!(bytes_contain(&bytes, "1x Salmon Nigiri"));
    assert!(bytes_contain(&bytes, " Nota: no wasabi"));
    assert!(bytes_contain(&bytes, "-- Aoyama --"));

    let completions = h.queue.completions().await;
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].job_id, "abc12345-6789");
    assert!(completions[0].success);
    assert!(completions[0].error.is_none());

    let state = h.worker.public_state().await;
    assert_eq!(state.stats.claimed, 1);
    assert_eq!(state.stats.printed, 1);
    assert_eq!(state.stats.failed, 0);
    assert!(state.stats.last_error.is_none());
    assert_eq!(state.restaurant.unwrap().name, "Aoyama");
}

#[tokio::test]
async fn every_claimed_job_is_acked_even_on_failure() {
    let h = harness().await;
    let (port, capture) = printer_listener().await;
    h.queue.set_routes(routes_for("127.0.0.1", port)).await;

    // First job routes nowhere, second prints fine.
    let broken: KitchenJob = serde_json::from_value(json!({
        "id": "job-broken",
        "department": "bar",
        "payload": {"items": []}
    }))
    .unwrap();
    let mut good = s1_job();
    good.id = "job-good".into();
    h.queue.push_kitchen(vec![broken, good]).await;

    h.worker.run_tick().await;
    let _ = capture.await.unwrap();

    let completions = h.queue.completions().await;
    assert_eq!(completions.len(), 2);
    assert_eq!(completions[0].job_id, "job-broken");
    assert!(!completions[0].success);
    assert!(completions[0]
        .error
        .as_deref()
        .unwrap()
        .contains("no printer host"));
    assert_eq!(completions[1].job_id, "job-good");
    assert!(completions[1].success);

    let state = h.worker.public_state().await;
    assert_eq!(state.stats.printed, 1);
    assert_eq!(state.stats.failed, 1);
}

#[tokio::test]
async fn failing_ack_does_not_abort_the_tick() {
    let h = harness().await;
    let (port, capture) = printer_listener().await;
    h.queue.set_routes(routes_for("127.0.0.1", port)).await;
    h.queue.kitchen_ack_fails.store(true, Ordering::SeqCst);

    let mut first = s1_job();
    first.id = "job-1".into();
    h.queue.push_kitchen(vec![first]).await;

    h.worker.run_tick().await;
    let _ = capture.await.unwrap();

    // The completion was attempted exactly once and the tick finished.
    assert_eq!(h.queue.completions().await.len(), 1);
    let state = h.worker.public_state().await;
    assert!(state.stats.last_run_at.is_some());
    assert!(state.stats.last_error.is_none());
}

#[tokio::test]
async fn missing_rpc_disables_the_family_for_the_run() {
    let h = harness().await;
    h.queue.fiscal_function_missing.store(true, Ordering::SeqCst);

    h.worker.run_tick().await;
    h.worker.run_tick().await;
    h.worker.run_tick().await;

    // One claim attempt, then the family stays dark.
    assert_eq!(h.queue.fiscal_claim_calls.load(Ordering::SeqCst), 1);
    let state = h.worker.public_state().await;
    assert!(!state.physical_receipt_rpc_available);
    assert!(state.non_fiscal_receipt_rpc_available);

    // Exactly one warning about the missing function.
    let warnings: Vec<_> = h
        .worker
        .logs()
        .await
        .into_iter()
        .filter(|row| {
            row.level == LogLevel::Warn && row.message.contains("physical_receipt_claim_jobs")
        })
        .collect();
    assert_eq!(warnings.len(), 1);
}

#[tokio::test]
async fn fiscal_job_gets_synthetic_receipt_id_when_device_reports_none() {
    let h = harness().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/fpmate.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<response status="ok"/>"#))
        .mount(&server)
        .await;
    let addr = server.address();

    let job: FiscalJob = serde_json::from_value(json!({
        "id": "fiscal-12345678",
        "payload": {
            "total_amount": 12.34,
            "payment_method": "card",
            "table_number": "9",
            "route": {
                "host": addr.ip().to_string(),
                "port": addr.port(),
                "brand": "epson",
                "api_path": "/cgi-bin/fpmate.cgi"
            }
        }
    }))
    .unwrap();
    h.queue.push_fiscal(vec![job]).await;

    h.worker.run_tick().await;

    let completions = h.queue.completions().await;
    assert_eq!(completions.len(), 1);
    assert!(completions[0].success);
    let receipt_id = completions[0].receipt_id.as_deref().unwrap();
    let re = regex::Regex::new(r"^RT-[a-zA-Z0-9]{1,8}-\d+$").unwrap();
    assert!(re.is_match(receipt_id), "got: {receipt_id}");
}

#[tokio::test]
async fn fiscal_rejection_is_acked_with_excerpt_and_not_retried() {
    let h = harness().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<response status="error"/>"#))
        .expect(1)
        .mount(&server)
        .await;
    let addr = server.address();

    let job: FiscalJob = serde_json::from_value(json!({
        "id": "fiscal-reject",
        "payload": {
            "total_amount": 5.0,
            "route": {"host": addr.ip().to_string(), "port": addr.port()}
        }
    }))
    .unwrap();
    h.queue.push_fiscal(vec![job]).await;

    h.worker.run_tick().await;

    let completions = h.queue.completions().await;
    assert_eq!(completions.len(), 1);
    assert!(!completions[0].success);
    assert!(completions[0].receipt_id.is_none());
    assert!(completions[0].error.as_deref().unwrap().contains("HTTP 200"));
}

#[tokio::test]
async fn heartbeat_prefers_server_assignment() {
    let h = harness().await;
    *h.queue.agents.lock().await = vec![AgentInfo {
        agent_id: h.worker.public_state().await.config.consumer_id.clone(),
        printer_id: Some("printer-server".into()),
    }];
    *h.queue.register_reply.lock().await = Some("printer-final".into());

    h.worker.run_tick().await;

    let registrations = h.queue.registrations.lock().await.clone();
    assert_eq!(registrations.len(), 1);
    assert!(registrations[0].is_active);
    assert_eq!(
        registrations[0].printer_id.as_deref(),
        Some("printer-server")
    );

    let state = h.worker.public_state().await;
    assert_eq!(state.assigned_printer_id.as_deref(), Some("printer-final"));
}

// ---- control surface ----

#[tokio::test]
async fn sync_session_rejects_empty_tokens() {
    let h = harness().await;
    let err = h
        .worker
        .sync_session(SessionSnapshot {
            access_token: "".into(),
            refresh_token: "".into(),
            expires_at: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Config(_)));
}

#[tokio::test]
async fn sync_session_with_equal_snapshot_is_a_no_op() {
    let h = harness().await;
    let snapshot = SessionSnapshot {
        access_token: "at".into(),
        refresh_token: "rt".into(),
        expires_at: Some(99),
    };
    h.worker.sync_session(snapshot.clone()).await.unwrap();

    let store_path = {
        // The state file exists after the first sync.
        let state = h.worker.public_state().await;
        assert!(state.has_session);
        h._dir.path().join("desktop-print-worker.json")
    };
    let before = tokio::fs::read_to_string(&store_path).await.unwrap();
    let mtime_before = tokio::fs::metadata(&store_path).await.unwrap().modified().unwrap();

    h.worker.sync_session(snapshot).await.unwrap();

    let after = tokio::fs::read_to_string(&store_path).await.unwrap();
    let mtime_after = tokio::fs::metadata(&store_path).await.unwrap().modified().unwrap();
    assert_eq!(before, after);
    assert_eq!(mtime_before, mtime_after);
}

#[tokio::test]
async fn auto_start_kicks_in_on_session_sync() {
    let h = harness().await;
    h.worker
        .save_config(ConfigPatch {
            auto_start: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();

    h.worker
        .sync_session(SessionSnapshot {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: None,
        })
        .await
        .unwrap();

    assert!(h.worker.service_running().await);
    h.worker.stop_service().await;
    assert!(!h.worker.service_running().await);
}

#[tokio::test]
async fn start_service_is_idempotent_and_resets_stats() {
    let h = harness().await;
    h.queue.fiscal_function_missing.store(true, Ordering::SeqCst);

    // Degrade the fiscal family and accumulate stats outside the service.
    h.worker.run_tick().await;
    assert!(!h.worker.public_state().await.physical_receipt_rpc_available);

    h.worker.start_service().await.unwrap();
    h.worker.start_service().await.unwrap();
    assert!(h.worker.service_running().await);

    // Flags and stats reset on start.
    let state = h.worker.public_state().await;
    assert!(state.service_running);

    h.worker.stop_service().await;
    h.worker.stop_service().await; // idempotent
    assert!(!h.worker.service_running().await);

    // The final heartbeat went out inactive.
    let registrations = h.queue.registrations.lock().await.clone();
    let last = registrations.last().expect("at least the stop heartbeat");
    assert!(!last.is_active);
}

#[tokio::test]
async fn clear_session_stops_service_and_wipes_auth() {
    let h = harness().await;
    h.worker
        .sync_session(SessionSnapshot {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: None,
        })
        .await
        .unwrap();
    h.worker.start_service().await.unwrap();

    let state = h.worker.clear_session().await.unwrap();
    assert!(!state.has_session);
    assert!(!state.service_running);
    assert!(state.restaurant.is_none());
    assert!(!h.worker.service_running().await);
}

#[tokio::test]
async fn test_rt_receipt_requires_a_host() {
    let h = harness().await;
    let err = h
        .worker
        .test_rt_receipt(bridge_worker::RtTestRequest {
            host: "  ".into(),
            port: None,
            brand: None,
            api_path: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("PHYSICAL_RT_HOST_MISSING"));
}

#[tokio::test]
async fn test_rt_receipt_posts_the_test_document() {
    let h = harness().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/fpmate.cgi"))
        .and(wiremock::matchers::body_string_contains("beginNonFiscal"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<response status="ok"/>"#))
        .mount(&server)
        .await;
    let addr = server.address();

    let report = h
        .worker
        .test_rt_receipt(bridge_worker::RtTestRequest {
            host: addr.ip().to_string(),
            port: Some(addr.port()),
            brand: Some("epson".into()),
            api_path: None,
        })
        .await
        .unwrap();
    assert!(report.ok, "detail: {}", report.detail);
}

#[tokio::test]
async fn save_config_sanitizes_and_persists() {
    let h = harness().await;
    let state = h
        .worker
        .save_config(ConfigPatch {
            consumer_id: Some("Cassa Uno!".into()),
            poll_ms: Some(100),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(state.config.consumer_id, "cassa-uno-");
    assert_eq!(state.config.poll_ms, 1000);

    // A fresh worker over the same store observes the saved config.
    let store = StateStore::new(h._dir.path());
    let reloaded = store.load_config().await;
    assert_eq!(reloaded.consumer_id, "cassa-uno-");
}

#[tokio::test]
async fn state_broadcast_fires_on_mutation() {
    let h = harness().await;
    let mut rx = h.worker.broadcast().subscribe_state();

    h.worker
        .save_config(ConfigPatch {
            device_name: Some("Banco".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let pushed = rx.recv().await.unwrap();
    assert_eq!(pushed.config.device_name, "Banco");
}
