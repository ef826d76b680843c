//! Integration tests for the scan flow running inside a real Store
//!
//! Drives `ScanReducer` through `puerta_runtime::Store` with a scripted
//! backend and a recording navigator, so permission prompts, validation,
//! enrichment, navigation and cancellation all run as real effects.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use puerta_core::environment::Clock;
use puerta_runtime::Store;
use puerta_scanner::api::ApiError;
use puerta_scanner::mocks::{MockEntradaApi, MockPermissions, RecordingNavigator};
use puerta_scanner::types::{CameraPhase, HistoryStatus, PermissionStatus, RouteStatus, ScanId};
use puerta_scanner::{ScanAction, ScanEnvironment, ScanReducer, ScanState};
use puerta_testing::{ManualClock, init_test_tracing, test_clock};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

type ScanStore = Store<ScanState, ScanAction, ScanEnvironment, ScanReducer>;

struct Fixture {
    store: ScanStore,
    api: MockEntradaApi,
    navigator: RecordingNavigator,
    permissions: MockPermissions,
    clock: ManualClock,
}

fn fixture(api: MockEntradaApi, permission_answer: PermissionStatus) -> Fixture {
    init_test_tracing();

    let clock = ManualClock::starting_at(test_clock().now());
    let navigator = RecordingNavigator::new();
    let permissions = MockPermissions::answering(permission_answer);
    let env = ScanEnvironment::new(
        Arc::new(clock.clone()),
        Arc::new(api.clone()),
        Arc::new(permissions.clone()),
        Arc::new(navigator.clone()),
    );

    Fixture {
        store: Store::new(ScanState::default(), ScanReducer::new(), env),
        api,
        navigator,
        permissions,
        clock,
    }
}

impl Fixture {
    /// Open the camera (asking for permission if needed) and start reading
    async fn start_reading(&self) {
        let mut handle = self.store.send(ScanAction::OpenCamera).await.unwrap();
        handle.wait().await;
        self.store.send(ScanAction::StartReading).await.unwrap();
    }

    /// Feed a frame and wait for its validation effect
    async fn scan(&self, raw: &str) {
        let mut handle = self
            .store
            .send(ScanAction::CodeScanned { raw: raw.into() })
            .await
            .unwrap();
        handle
            .wait_with_timeout(Duration::from_secs(5))
            .await
            .expect("validation effect did not finish");
    }

    /// Wait until the navigator saw `count` routes
    async fn wait_for_navigations(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.navigator.count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("navigation did not happen");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_valid_ticket_end_to_end() {
    let api = MockEntradaApi::new()
        .with_validation(json!({
            "raw": { "isOk": 1, "estadoEntrada": "Activa" },
            "idEvento": "EV1",
            "idUsuario": "U1",
            "tipoEntrada": { "nombre": "General" },
            "precio": 1500
        }))
        .with_event("EV1", json!({ "nombre": "Fiesta Bresh" }))
        .with_user("U1", json!({ "nombre": "Ana", "apellido": "Paz", "avatar": "https://a/ana.png" }));
    let f = fixture(api, PermissionStatus::Granted);

    f.start_reading().await;
    assert_eq!(f.permissions.request_count(), 1);
    assert_eq!(f.store.state(|s| s.camera).await, CameraPhase::Reading);

    f.scan("https://tickets.example.com/validar?idEntrada=E123&mdQr=QR456").await;
    f.wait_for_navigations(1).await;

    let route = f.navigator.routes().remove(0);
    assert_eq!(route.status, RouteStatus::Ok);
    assert_eq!(route.ticket_id, "E123");
    assert_eq!(route.estado_entrada.as_deref(), Some("Activa"));
    assert_eq!(route.event_name.as_deref(), Some("Fiesta Bresh"));
    assert_eq!(route.ticket_type.as_deref(), Some("General"));
    assert_eq!(route.price.as_deref(), Some("$ 1.500,00"));
    assert_eq!(route.customer_name.as_deref(), Some("Ana Paz"));
    assert_eq!(route.customer_avatar_url.as_deref(), Some("https://a/ana.png"));
    assert_eq!(route.date_time, f.clock.now());

    let (busy, camera, history) = f
        .store
        .state(|s| (s.busy, s.camera, s.history.clone()))
        .await;
    assert!(!busy);
    assert_eq!(camera, CameraPhase::Closed);
    assert_eq!(history.len(), 1);
    let entry = history.newest().unwrap();
    assert_eq!(entry.title, "Entrada E123");
    assert_eq!(entry.subtitle, "Fiesta Bresh");
    assert_eq!(entry.status, HistoryStatus::Ok);
}

#[tokio::test]
async fn test_already_controlled_ticket() {
    let api = MockEntradaApi::new()
        .with_validation(json!({ "raw": { "isOk": 0, "estadoEntrada": "Controlada" } }));
    let f = fixture(api, PermissionStatus::Granted);

    f.start_reading().await;
    f.scan(r#"{"idEntrada":"E5","mdQr":"Q5"}"#).await;
    f.wait_for_navigations(1).await;

    let route = f.navigator.routes().remove(0);
    assert_eq!(route.status, RouteStatus::Error);
    assert_eq!(route.message, "Entrada ya controlada (estado: Controlada)");
}

#[tokio::test]
async fn test_not_found_ticket() {
    let api = MockEntradaApi::new().with_validation_error(ApiError::Status {
        status: 404,
        body: Some(json!({ "message": "anything" })),
    });
    let f = fixture(api, PermissionStatus::Granted);

    f.start_reading().await;
    f.scan("E404,Q").await;
    f.wait_for_navigations(1).await;

    let route = f.navigator.routes().remove(0);
    assert_eq!(route.message, "La entrada no existe");
    assert_eq!(route.ticket_id, "E404");
}

#[tokio::test]
async fn test_malformed_code_never_reaches_backend() {
    let f = fixture(MockEntradaApi::new(), PermissionStatus::Granted);

    f.start_reading().await;
    f.scan("not a valid code").await;
    f.wait_for_navigations(1).await;

    assert_eq!(f.api.validate_count(), 0);
    assert_eq!(f.navigator.routes()[0].message, "Formato de QR inválido");
    assert!(!f.store.state(|s| s.busy).await);
}

#[tokio::test]
async fn test_failed_lookups_still_navigate() {
    let api = MockEntradaApi::new().with_validation(json!({
        "isOk": 1,
        "idEvento": "gone",
        "idUsuario": "gone"
    }));
    let f = fixture(api, PermissionStatus::Granted);

    f.start_reading().await;
    f.scan("idEntrada:E1|mdQr:Q1").await;
    f.wait_for_navigations(1).await;

    let route = f.navigator.routes().remove(0);
    assert_eq!(route.status, RouteStatus::Ok);
    assert_eq!(route.event_name, None);
    assert_eq!(route.customer_name, None);
    assert_eq!(route.customer_email, None);
    assert_eq!(route.customer_avatar_url, None);
    assert!(f.api.lookup_count() >= 2);
}

#[tokio::test]
async fn test_denied_permission_blocks_scanning() {
    let f = fixture(MockEntradaApi::new(), PermissionStatus::Denied);

    f.start_reading().await;
    f.store
        .send(ScanAction::CodeScanned {
            raw: "E1,Q1".into(),
        })
        .await
        .unwrap();

    let (camera, notice) = f.store.state(|s| (s.camera, s.notice.clone())).await;
    assert_eq!(camera, CameraPhase::Closed);
    assert!(notice.is_some());
    assert_eq!(f.api.validate_count(), 0);
}

#[tokio::test]
async fn test_frames_during_processing_are_dropped() {
    let api = MockEntradaApi::new()
        .with_validation(json!({ "isOk": 1 }))
        .with_latency(Duration::from_millis(100));
    let f = fixture(api, PermissionStatus::Granted);

    f.start_reading().await;
    let mut first = f
        .store
        .send(ScanAction::CodeScanned {
            raw: "E1,Q1".into(),
        })
        .await
        .unwrap();
    for raw in ["E2,Q2", "E3,Q3", "E1,Q1"] {
        f.store
            .send(ScanAction::CodeScanned { raw: raw.into() })
            .await
            .unwrap();
    }
    first.wait().await;
    f.wait_for_navigations(1).await;

    assert_eq!(f.api.validate_count(), 1);
    let last_seen = f.store.state(|s| s.duplicates.last_seen().cloned()).await;
    assert_eq!(last_seen.map(|seen| seen.text).as_deref(), Some("E1,Q1"));
}

#[tokio::test]
async fn test_duplicate_scan_window() {
    let f = fixture(
        MockEntradaApi::new().with_validation(json!({ "isOk": 1 })),
        PermissionStatus::Granted,
    );

    f.start_reading().await;
    f.scan("E1,Q1").await;
    f.wait_for_navigations(1).await;

    f.clock.advance_millis(4_999);
    f.start_reading().await;
    f.scan("E1,Q1").await;
    assert_eq!(f.api.validate_count(), 1);
    assert_eq!(f.store.state(|s| s.camera).await, CameraPhase::Reading);

    f.clock.advance_millis(1);
    f.scan("E1,Q1").await;
    f.wait_for_navigations(2).await;
    assert_eq!(f.api.validate_count(), 2);
}

#[tokio::test]
async fn test_dismissal_cancels_in_flight_scan() {
    let api = MockEntradaApi::new()
        .with_validation(json!({ "isOk": 1 }))
        .with_latency(Duration::from_millis(200));
    let f = fixture(api, PermissionStatus::Granted);

    f.start_reading().await;
    f.store
        .send(ScanAction::CodeScanned {
            raw: "E1,Q1".into(),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(f.store.active_in_group(ScanId::new(1).effect_id()), 1);

    f.store.send(ScanAction::Dismissed).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(f.store.active_in_group(ScanId::new(1).effect_id()), 0);
    assert_eq!(f.navigator.count(), 0);
    let (busy, in_flight, history_len) = f
        .store
        .state(|s| (s.busy, s.in_flight, s.history.len()))
        .await;
    assert!(!busy);
    assert_eq!(in_flight, None);
    assert_eq!(history_len, 0);
}

#[tokio::test]
async fn test_panicking_backend_clears_the_guard() {
    let f = fixture(
        MockEntradaApi::new().with_panicking_validation(),
        PermissionStatus::Granted,
    );

    f.start_reading().await;
    f.scan("E1,Q1").await;
    f.wait_for_navigations(1).await;

    assert_eq!(
        f.navigator.routes()[0].message,
        "Error inesperado al validar la entrada"
    );
    assert!(!f.store.state(|s| s.busy).await);
}

#[tokio::test]
async fn test_history_is_capped_at_twenty() {
    let f = fixture(
        MockEntradaApi::new().with_validation(json!({ "isOk": 1 })),
        PermissionStatus::Granted,
    );

    for n in 1..=21 {
        f.start_reading().await;
        f.scan(&format!("E{n},Q{n}")).await;
        f.wait_for_navigations(n).await;
    }

    let history = f.store.state(|s| s.history.clone()).await;
    assert_eq!(history.len(), 20);
    assert_eq!(history.newest().unwrap().title, "Entrada E21");
    assert!(history.iter().all(|entry| entry.title != "Entrada E1"));
}
