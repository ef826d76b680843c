//! In-memory implementations of the scan flow's environment traits
//!
//! Used by unit tests, the integration tests under `tests/` and anyone
//! embedding the flow who wants to exercise it without a backend.

use crate::api::{ApiError, EntradaApi};
use crate::environment::{CameraPermissions, Navigator};
use crate::types::{PermissionStatus, ResultRoute, ScanPayload};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// What [`MockEntradaApi::validate`] does for a ticket
#[derive(Debug, Clone)]
enum ScriptedValidation {
    Respond(Result<Value, ApiError>),
    Panic,
}

/// Scripted backend
///
/// Validation answers can be set for all tickets or per ticket id. Event,
/// user and image lookups answer from their maps and fail with a 404 for
/// unknown ids. Clones share counters and recorded payloads.
#[derive(Debug, Clone)]
pub struct MockEntradaApi {
    default_validation: ScriptedValidation,
    validations: HashMap<String, ScriptedValidation>,
    events: HashMap<String, Value>,
    users: HashMap<String, Value>,
    images: HashMap<String, Value>,
    latency: Option<Duration>,
    validated: Arc<Mutex<Vec<ScanPayload>>>,
    lookups: Arc<AtomicUsize>,
}

impl MockEntradaApi {
    /// Backend that fails every validation with a transport error
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_validation: ScriptedValidation::Respond(Err(ApiError::Transport(
                "no response scripted".to_owned(),
            ))),
            validations: HashMap::new(),
            events: HashMap::new(),
            users: HashMap::new(),
            images: HashMap::new(),
            latency: None,
            validated: Arc::new(Mutex::new(Vec::new())),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer every validation with `body`
    #[must_use]
    pub fn with_validation(mut self, body: Value) -> Self {
        self.default_validation = ScriptedValidation::Respond(Ok(body));
        self
    }

    /// Fail every validation with `error`
    #[must_use]
    pub fn with_validation_error(mut self, error: ApiError) -> Self {
        self.default_validation = ScriptedValidation::Respond(Err(error));
        self
    }

    /// Answer validations of one ticket id
    #[must_use]
    pub fn with_validation_for(
        mut self,
        id_entrada: impl Into<String>,
        result: Result<Value, ApiError>,
    ) -> Self {
        self.validations
            .insert(id_entrada.into(), ScriptedValidation::Respond(result));
        self
    }

    /// Make validation of every ticket panic
    #[must_use]
    pub fn with_panicking_validation(mut self) -> Self {
        self.default_validation = ScriptedValidation::Panic;
        self
    }

    /// Delay every validation answer
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Serve an event lookup
    #[must_use]
    pub fn with_event(mut self, event_id: impl Into<String>, event: Value) -> Self {
        self.events.insert(event_id.into(), event);
        self
    }

    /// Serve a user lookup
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>, user: Value) -> Self {
        self.users.insert(user_id.into(), user);
        self
    }

    /// Serve a first-image lookup
    #[must_use]
    pub fn with_first_image(mut self, entity_id: impl Into<String>, image: Value) -> Self {
        self.images.insert(entity_id.into(), image);
        self
    }

    /// Payloads validated so far, in call order
    #[must_use]
    pub fn validated_payloads(&self) -> Vec<ScanPayload> {
        self.validated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of validation calls
    #[must_use]
    pub fn validate_count(&self) -> usize {
        self.validated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of event, user and image lookups
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn lookup(&self, table: &HashMap<String, Value>, id: &str) -> Result<Value, ApiError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        table.get(id).cloned().ok_or(ApiError::Status {
            status: 404,
            body: None,
        })
    }
}

impl Default for MockEntradaApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntradaApi for MockEntradaApi {
    #[allow(clippy::panic)] // Scripted crash of the backend client
    async fn validate(&self, payload: &ScanPayload) -> Result<Value, ApiError> {
        self.validated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let script = self
            .validations
            .get(&payload.id_entrada)
            .unwrap_or(&self.default_validation);
        match script {
            ScriptedValidation::Respond(result) => result.clone(),
            ScriptedValidation::Panic => panic!("scripted validation panic"),
        }
    }

    async fn event(&self, event_id: &str) -> Result<Value, ApiError> {
        self.lookup(&self.events, event_id)
    }

    async fn user(&self, user_id: &str) -> Result<Value, ApiError> {
        self.lookup(&self.users, user_id)
    }

    async fn first_image(&self, entity_id: &str) -> Result<Value, ApiError> {
        self.lookup(&self.images, entity_id)
    }
}

/// Navigator that records every route it is given
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<ResultRoute>>>,
}

impl RecordingNavigator {
    /// Empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes navigated to, oldest first
    #[must_use]
    pub fn routes(&self) -> Vec<ResultRoute> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of navigations
    #[must_use]
    pub fn count(&self) -> usize {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: ResultRoute) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }
}

/// Permission source answering every request with a fixed status
#[derive(Debug, Clone)]
pub struct MockPermissions {
    answer: PermissionStatus,
    requests: Arc<AtomicUsize>,
}

impl MockPermissions {
    /// Answer requests with `answer`
    #[must_use]
    pub fn answering(answer: PermissionStatus) -> Self {
        Self {
            answer,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of prompts shown
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraPermissions for MockPermissions {
    async fn request(&self) -> PermissionStatus {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn per_ticket_scripts_override_default() {
        let api = MockEntradaApi::new()
            .with_validation(json!({ "isOk": 1 }))
            .with_validation_for("E2", Err(ApiError::Transport("down".into())));

        assert!(api.validate(&ScanPayload::new("E1", "")).await.is_ok());
        assert!(api.validate(&ScanPayload::new("E2", "")).await.is_err());
        assert_eq!(api.validate_count(), 2);
        assert_eq!(api.validated_payloads()[1].id_entrada, "E2");
    }

    #[tokio::test]
    async fn unknown_lookups_are_not_found() {
        let api = MockEntradaApi::new().with_event("EV1", json!({ "nombre": "X" }));

        assert!(api.event("EV1").await.is_ok());
        assert_eq!(api.user("U1").await.unwrap_err().status(), Some(404));
        assert_eq!(api.lookup_count(), 2);
    }

    #[tokio::test]
    async fn permissions_count_requests() {
        let permissions = MockPermissions::answering(PermissionStatus::Denied);
        assert_eq!(permissions.request().await, PermissionStatus::Denied);
        assert_eq!(permissions.request_count(), 1);
    }
}
