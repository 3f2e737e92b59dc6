// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend adapter traits.
//!
//! The worker talks to the cloud queue and the auth backend exclusively
//! through these traits so tests can substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::jobs::{FiscalJob, KitchenJob, ReceiptJob};
use crate::types::{
    AgentInfo, AgentRegistration, JobOutcome, LiveRoutes, RestaurantSummary, RoleMembership,
    SessionSnapshot, UserInfo,
};

/// Claim/ack queue plus heartbeat and settings reads.
#[async_trait]
pub trait PrintQueue: Send + Sync {
    /// Claim up to `limit` kitchen jobs for this consumer.
    async fn claim_kitchen_jobs(
        &self,
        restaurant_id: &str,
        consumer_id: &str,
        limit: u32,
    ) -> Result<Vec<KitchenJob>, BridgeError>;

    /// Record the outcome of a claimed kitchen job.
    async fn complete_kitchen_job(
        &self,
        job_id: &str,
        consumer_id: &str,
        outcome: &JobOutcome,
    ) -> Result<(), BridgeError>;

    async fn claim_fiscal_jobs(
        &self,
        restaurant_id: &str,
        consumer_id: &str,
        limit: u32,
    ) -> Result<Vec<FiscalJob>, BridgeError>;

    async fn complete_fiscal_job(
        &self,
        job_id: &str,
        consumer_id: &str,
        receipt_id: Option<&str>,
        outcome: &JobOutcome,
    ) -> Result<(), BridgeError>;

    async fn claim_receipt_jobs(
        &self,
        restaurant_id: &str,
        consumer_id: &str,
        limit: u32,
    ) -> Result<Vec<ReceiptJob>, BridgeError>;

    async fn complete_receipt_job(
        &self,
        job_id: &str,
        consumer_id: &str,
        receipt_id: Option<&str>,
        outcome: &JobOutcome,
    ) -> Result<(), BridgeError>;

    /// Heartbeat registration; returns the server-assigned printer id, if any.
    async fn register_agent(
        &self,
        registration: &AgentRegistration,
    ) -> Result<Option<String>, BridgeError>;

    /// Read the server's agent registry for this restaurant.
    async fn list_agents(&self, restaurant_id: &str) -> Result<Vec<AgentInfo>, BridgeError>;

    /// Fetch the live printer index from the restaurant settings.
    async fn live_routes(&self, restaurant_id: &str) -> Result<LiveRoutes, BridgeError>;
}

/// Session restore and restaurant-scope reads.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// The user the backend currently recognizes, if the held access token
    /// is still valid.
    async fn current_user(&self) -> Result<Option<UserInfo>, BridgeError>;

    /// Exchange a refresh token for a fresh session.
    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<SessionSnapshot, BridgeError>;

    /// Make the given tokens the ones used for subsequent calls.
    async fn adopt_session(&self, snapshot: &SessionSnapshot);

    /// Drop any held tokens.
    async fn drop_session(&self);

    /// Restaurants owned by the user, most recently created first.
    async fn owned_restaurants(
        &self,
        user_id: &str,
    ) -> Result<Vec<RestaurantSummary>, BridgeError>;

    /// Non-owner role memberships for the user, oldest first.
    async fn role_memberships(
        &self,
        user_id: &str,
    ) -> Result<Vec<RoleMembership>, BridgeError>;

    async fn restaurant_by_id(
        &self,
        restaurant_id: &str,
    ) -> Result<Option<RestaurantSummary>, BridgeError>;
}
