// SPDX-FileCopyrightText: 2026 Sushiamo Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session restore and restaurant-scope resolution.
//!
//! The manager adopts whatever user the backend currently recognizes, falls
//! back to refreshing the persisted snapshot, and resolves the restaurant
//! the user operates under: owned restaurants first, then role memberships
//! ranked by privilege and assignment age so the bridge lands on the same
//! scope across restarts.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use bridge_core::types::{AuthState, RestaurantRole, RestaurantScope, SessionSnapshot, UserInfo};
use bridge_core::{BridgeError, SessionBackend, SessionErrorCode};

/// Result of [`SessionManager::ensure_signed_in`].
#[derive(Debug, Clone)]
pub struct EnsureOutcome {
    pub user: UserInfo,
    /// New tokens to persist when the refresh produced different ones.
    pub refreshed: Option<SessionSnapshot>,
}

/// Owns the in-memory auth state.
pub struct SessionManager {
    backend: Arc<dyn SessionBackend>,
    auth: Mutex<AuthState>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            auth: Mutex::new(AuthState::default()),
        }
    }

    pub async fn auth_state(&self) -> AuthState {
        self.auth.lock().await.clone()
    }

    /// Hand fresh tokens to the backend client.
    pub async fn adopt(&self, snapshot: &SessionSnapshot) {
        self.backend.adopt_session(snapshot).await;
    }

    /// Forget the user and scope, locally and on the backend client.
    pub async fn clear(&self) {
        self.auth.lock().await.clear();
        self.backend.drop_session().await;
    }

    /// Drop the cached scope so the next tick re-resolves it.
    pub async fn invalidate_scope(&self) {
        self.auth.lock().await.scope = None;
    }

    /// Make sure a user is signed in, restoring from `snapshot` when the
    /// backend no longer recognizes the held token.
    pub async fn ensure_signed_in(
        &self,
        snapshot: Option<&SessionSnapshot>,
    ) -> Result<EnsureOutcome, BridgeError> {
        if let Some(user) = self.backend.current_user().await? {
            self.auth.lock().await.user = Some(user.clone());
            return Ok(EnsureOutcome {
                user,
                refreshed: None,
            });
        }

        let Some(snapshot) = snapshot.filter(|s| s.is_usable()) else {
            return Err(BridgeError::Session(SessionErrorCode::Absent));
        };

        let refreshed = self.backend.refresh_session(&snapshot.refresh_token).await?;
        self.backend.adopt_session(&refreshed).await;

        let user = self
            .backend
            .current_user()
            .await?
            .ok_or(BridgeError::Session(SessionErrorCode::Invalid))?;
        info!(user = %user.id, "session restored from snapshot");
        self.auth.lock().await.user = Some(user.clone());

        let refreshed = (refreshed != *snapshot).then_some(refreshed);
        Ok(EnsureOutcome { user, refreshed })
    }

    /// The cached scope, resolving it when absent.
    pub async fn ensure_scope(
        &self,
        user_id: &str,
    ) -> Result<Option<RestaurantScope>, BridgeError> {
        if let Some(scope) = self.auth.lock().await.scope.clone() {
            return Ok(Some(scope));
        }
        self.resolve_scope(user_id).await
    }

    /// Resolve the restaurant scope from scratch and cache it.
    ///
    /// Owned restaurants win (most recent first); otherwise role memberships
    /// ranked by privilege then by membership creation time ascending.
    pub async fn resolve_scope(
        &self,
        user_id: &str,
    ) -> Result<Option<RestaurantScope>, BridgeError> {
        let owned = self.backend.owned_restaurants(user_id).await?;
        if let Some(restaurant) = owned.into_iter().next() {
            let scope = RestaurantScope {
                id: restaurant.id,
                name: restaurant.name,
                city: restaurant.city,
                role: RestaurantRole::Owner,
            };
            debug!(restaurant = %scope.id, "scope resolved via ownership");
            self.auth.lock().await.scope = Some(scope.clone());
            return Ok(Some(scope));
        }

        let mut memberships = self.backend.role_memberships(user_id).await?;
        memberships.sort_by(|a, b| {
            a.role
                .rank()
                .cmp(&b.role.rank())
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        for membership in memberships {
            let Some(restaurant) = self
                .backend
                .restaurant_by_id(&membership.restaurant_id)
                .await?
            else {
                continue;
            };
            let scope = RestaurantScope {
                id: restaurant.id,
                name: restaurant.name,
                city: restaurant.city,
                role: membership.role,
            };
            debug!(restaurant = %scope.id, role = %scope.role, "scope resolved via membership");
            self.auth.lock().await.scope = Some(scope.clone());
            return Ok(Some(scope));
        }

        Ok(None)
    }
}
