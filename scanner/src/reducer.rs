//! The scan flow as a reducer
//!
//! All decisions live here: the permission gate, the camera phases, the
//! re-entrancy guard, duplicate suppression, parsing and what happens when
//! a scan finishes. Backend calls, permission prompts and navigation are
//! returned as effects for the store to run.
//!
//! ```text
//! OpenCamera ──(permission)──▶ Previewing ──StartReading──▶ Reading
//!      ▲                                                      │ CodeScanned
//!      │                                                      ▼
//!   Closed ◀──── ScanCompleted / Dismissed / malformed ─── Processing
//! ```

use crate::config::ScanSettings;
use crate::dedup::DuplicateFilter;
use crate::environment::ScanEnvironment;
use crate::history::ScanHistory;
use crate::parser::parse_payload;
use crate::types::{
    CameraPhase, PermissionStatus, ResultRoute, ScanHistoryEntry, ScanId, ScanPayload, ScanReport,
    Verdict,
};
use crate::validation::validate_ticket;
use futures::FutureExt;
use puerta_core::effect::Effect;
use puerta_core::reducer::Reducer;
use puerta_core::{SmallVec, async_effect, cancellable_effect, smallvec};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Notice shown when the camera permission was refused
pub const PERMISSION_DENIED_NOTICE: &str =
    "Sin permiso de cámara. Habilitalo desde la configuración del sistema para escanear entradas.";

type Effects = SmallVec<[Effect<ScanAction>; 4]>;

/// Session state of the scanner screen
#[derive(Debug, Clone, PartialEq)]
pub struct ScanState {
    /// Last known camera permission
    pub permission: PermissionStatus,
    /// What the camera is doing
    pub camera: CameraPhase,
    /// The user asked to open the camera before permission was known
    pub open_requested: bool,
    /// A scan is being validated; new frames are dropped
    pub busy: bool,
    /// Last admitted raw text, for duplicate suppression
    pub duplicates: DuplicateFilter,
    /// Scan whose result is awaited
    pub in_flight: Option<ScanId>,
    /// Finished scans, newest first
    pub history: ScanHistory,
    /// Route of the most recent finished scan
    pub last_route: Option<ResultRoute>,
    /// Message for the user (permission denied)
    pub notice: Option<String>,
    last_scan_id: u64,
}

impl ScanState {
    /// Fresh session keeping `history_limit` history rows
    #[must_use]
    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            permission: PermissionStatus::Undetermined,
            camera: CameraPhase::Closed,
            open_requested: false,
            busy: false,
            duplicates: DuplicateFilter::default(),
            in_flight: None,
            history: ScanHistory::with_limit(history_limit),
            last_route: None,
            notice: None,
            last_scan_id: 0,
        }
    }

    /// Fresh session sized by `settings`
    #[must_use]
    pub fn from_settings(settings: &ScanSettings) -> Self {
        Self::with_history_limit(settings.history_limit)
    }

    /// Whether camera frames are currently fed to the flow
    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.camera == CameraPhase::Reading && !self.busy
    }

    fn begin_scan(&mut self) -> ScanId {
        self.last_scan_id += 1;
        let scan_id = ScanId::new(self.last_scan_id);
        self.busy = true;
        self.camera = CameraPhase::Processing;
        self.in_flight = Some(scan_id);
        scan_id
    }

    fn end_scan(&mut self) {
        self.busy = false;
        self.camera = CameraPhase::Closed;
        self.in_flight = None;
        self.open_requested = false;
    }
}

impl Default for ScanState {
    fn default() -> Self {
        Self::from_settings(&ScanSettings::default())
    }
}

/// Inputs of the scan flow
#[derive(Debug, Clone)]
pub enum ScanAction {
    /// Ask for camera permission
    PermissionRequested,
    /// The platform answered the permission prompt
    PermissionResolved {
        /// The answer
        status: PermissionStatus,
    },
    /// User opened the camera modal
    OpenCamera,
    /// User tapped "start scanning"
    StartReading,
    /// User closed the camera modal without scanning
    CloseCamera,
    /// The camera decoded a QR code
    CodeScanned {
        /// Decoded text, as reported by the camera
        raw: String,
    },
    /// A validation effect finished
    ScanCompleted {
        /// Scan the result belongs to
        scan_id: ScanId,
        /// What was learned
        report: Box<ScanReport>,
    },
    /// The scanner screen went away
    Dismissed,
    /// User cleared the session log
    HistoryCleared,
}

/// Reducer of the scan flow
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanReducer;

impl ScanReducer {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn request_permission(state: &ScanState, env: &ScanEnvironment) -> Effects {
        if state.permission == PermissionStatus::Granted {
            return smallvec![Effect::None];
        }

        let permissions = Arc::clone(env.permissions());
        smallvec![async_effect! {
            let status = permissions.request().await;
            Some(ScanAction::PermissionResolved { status })
        }]
    }

    fn resolve_permission(state: &mut ScanState, status: PermissionStatus) -> Effects {
        tracing::info!(?status, "Camera permission resolved");
        state.permission = status;

        match status {
            PermissionStatus::Granted => {
                state.notice = None;
                if std::mem::take(&mut state.open_requested) && state.camera == CameraPhase::Closed {
                    state.camera = CameraPhase::Previewing;
                }
            },
            PermissionStatus::Denied => {
                state.open_requested = false;
                if !state.busy {
                    state.camera = CameraPhase::Closed;
                }
                state.notice = Some(PERMISSION_DENIED_NOTICE.to_owned());
            },
            PermissionStatus::Undetermined => {},
        }

        smallvec![Effect::None]
    }

    fn open_camera(state: &mut ScanState, env: &ScanEnvironment) -> Effects {
        match state.permission {
            PermissionStatus::Granted => {
                state.notice = None;
                if state.camera == CameraPhase::Closed {
                    state.camera = CameraPhase::Previewing;
                }
                smallvec![Effect::None]
            },
            PermissionStatus::Denied => {
                state.notice = Some(PERMISSION_DENIED_NOTICE.to_owned());
                smallvec![Effect::None]
            },
            PermissionStatus::Undetermined => {
                state.open_requested = true;
                Self::request_permission(state, env)
            },
        }
    }

    fn code_scanned(state: &mut ScanState, raw: &str, env: &ScanEnvironment) -> Effects {
        if state.busy {
            return suppressed("busy");
        }
        if state.camera != CameraPhase::Reading {
            return suppressed("not_reading");
        }
        if raw.trim().is_empty() {
            return suppressed("blank");
        }

        let now = env.clock().now();
        if !state
            .duplicates
            .admit(raw, now, env.settings().dedup_window_ms)
        {
            return suppressed("duplicate");
        }

        let scan_id = state.begin_scan();
        match parse_payload(raw) {
            Some(payload) => {
                tracing::debug!(%scan_id, id_entrada = %payload.id_entrada, "Validating ticket");
                smallvec![Self::validation_effect(scan_id, payload, env)]
            },
            None => {
                tracing::debug!(%scan_id, "QR text not recognized");
                Self::finish(state, env, scan_id, &ScanReport::bare(Verdict::malformed()))
            },
        }
    }

    fn validation_effect(
        scan_id: ScanId,
        payload: ScanPayload,
        env: &ScanEnvironment,
    ) -> Effect<ScanAction> {
        let api = Arc::clone(env.api());
        let currency = env.currency().clone();

        cancellable_effect! {
            id: scan_id.effect_id(),
            {
                let ticket_id = payload.id_entrada.clone();
                let report = AssertUnwindSafe(validate_ticket(api.as_ref(), &payload, &currency))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        tracing::error!(%scan_id, "Validation task panicked");
                        ScanReport::bare(Verdict::unexpected_failure(ticket_id))
                    });
                Some(ScanAction::ScanCompleted { scan_id, report: Box::new(report) })
            }
        }
    }

    fn scan_completed(
        state: &mut ScanState,
        env: &ScanEnvironment,
        scan_id: ScanId,
        report: &ScanReport,
    ) -> Effects {
        if state.in_flight != Some(scan_id) {
            tracing::debug!(%scan_id, in_flight = ?state.in_flight, "Discarding stale scan result");
            return smallvec![Effect::None];
        }
        Self::finish(state, env, scan_id, report)
    }

    /// Close out a scan: log it, reset the guard, hand off to the result screen
    fn finish(
        state: &mut ScanState,
        env: &ScanEnvironment,
        scan_id: ScanId,
        report: &ScanReport,
    ) -> Effects {
        let outcome = report.verdict.outcome;
        metrics::counter!("scanner.scans.total", "outcome" => outcome.as_str()).increment(1);
        tracing::info!(
            %scan_id,
            %outcome,
            message = %report.verdict.message,
            "Scan finished"
        );

        state.end_scan();
        state
            .history
            .push(ScanHistoryEntry::from_report(scan_id, report));

        let route = ResultRoute::from_report(report, env.clock().now());
        state.last_route = Some(route.clone());

        let navigator = Arc::clone(env.navigator());
        smallvec![async_effect! {
            navigator.navigate(route);
            None::<ScanAction>
        }]
    }

    fn dismissed(state: &mut ScanState) -> Effects {
        let in_flight = state.in_flight;
        state.end_scan();

        match in_flight {
            Some(scan_id) => {
                tracing::info!(%scan_id, "Scan dismissed before completion");
                smallvec![Effect::Cancel(scan_id.effect_id())]
            },
            None => smallvec![Effect::None],
        }
    }
}

fn suppressed(reason: &'static str) -> Effects {
    tracing::trace!(reason, "Frame ignored");
    metrics::counter!("scanner.scans.suppressed", "reason" => reason).increment(1);
    smallvec![Effect::None]
}

impl Reducer for ScanReducer {
    type State = ScanState;
    type Action = ScanAction;
    type Environment = ScanEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ScanAction::PermissionRequested => Self::request_permission(state, env),
            ScanAction::PermissionResolved { status } => Self::resolve_permission(state, status),
            ScanAction::OpenCamera => Self::open_camera(state, env),
            ScanAction::StartReading => {
                if state.camera == CameraPhase::Previewing {
                    state.camera = CameraPhase::Reading;
                }
                smallvec![Effect::None]
            },
            ScanAction::CloseCamera => {
                if state.camera != CameraPhase::Processing {
                    state.camera = CameraPhase::Closed;
                    state.open_requested = false;
                }
                smallvec![Effect::None]
            },
            ScanAction::CodeScanned { raw } => Self::code_scanned(state, &raw, env),
            ScanAction::ScanCompleted { scan_id, report } => {
                Self::scan_completed(state, env, scan_id, &report)
            },
            ScanAction::Dismissed => Self::dismissed(state),
            ScanAction::HistoryCleared => {
                state.history.clear();
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::mocks::{MockEntradaApi, MockPermissions, RecordingNavigator};
    use crate::types::{HistoryStatus, RouteStatus, ScanOutcome};
    use puerta_core::effect::EffectId;
    use puerta_core::environment::Clock;
    use puerta_testing::{ManualClock, ReducerTest, assertions, test_clock};
    use serde_json::json;

    struct Harness {
        env: ScanEnvironment,
        api: MockEntradaApi,
        navigator: RecordingNavigator,
        permissions: MockPermissions,
        clock: ManualClock,
    }

    fn harness(api: MockEntradaApi, permission_answer: PermissionStatus) -> Harness {
        let clock = ManualClock::starting_at(test_clock().now());
        let navigator = RecordingNavigator::new();
        let permissions = MockPermissions::answering(permission_answer);
        let env = ScanEnvironment::new(
            Arc::new(clock.clone()),
            Arc::new(api.clone()),
            Arc::new(permissions.clone()),
            Arc::new(navigator.clone()),
        );
        Harness {
            env,
            api,
            navigator,
            permissions,
            clock,
        }
    }

    fn env() -> ScanEnvironment {
        harness(MockEntradaApi::new(), PermissionStatus::Granted).env
    }

    fn reading_state() -> ScanState {
        ScanState {
            permission: PermissionStatus::Granted,
            camera: CameraPhase::Reading,
            ..ScanState::default()
        }
    }

    fn scanned(raw: &str) -> ScanAction {
        ScanAction::CodeScanned { raw: raw.into() }
    }

    /// Run a future effect (possibly wrapped in a cancellable group)
    async fn run_effect(effect: Effect<ScanAction>) -> Option<ScanAction> {
        match effect {
            Effect::Future(fut) => fut.await,
            Effect::Cancellable { effect, .. } => Box::pin(run_effect(*effect)).await,
            other => panic!("expected a future effect, got {other:?}"),
        }
    }

    fn completion(scan_id: u64, outcome: ScanOutcome) -> ScanAction {
        ScanAction::ScanCompleted {
            scan_id: ScanId::new(scan_id),
            report: Box::new(ScanReport::bare(Verdict {
                outcome,
                message: "Entrada válida".into(),
                raw_status: None,
                ticket_id: Some("E1".into()),
                embedded: None,
            })),
        }
    }

    #[tokio::test]
    async fn opening_camera_asks_for_permission_first() {
        let h = harness(MockEntradaApi::new(), PermissionStatus::Granted);
        let reducer = ScanReducer::new();
        let mut state = ScanState::default();

        let mut effects = reducer.reduce(&mut state, ScanAction::OpenCamera, &h.env);
        assert!(state.open_requested);
        assert_eq!(state.camera, CameraPhase::Closed);

        let resolved = run_effect(effects.remove(0)).await.unwrap();
        assert_eq!(h.permissions.request_count(), 1);

        reducer.reduce(&mut state, resolved, &h.env);
        assert_eq!(state.permission, PermissionStatus::Granted);
        assert_eq!(state.camera, CameraPhase::Previewing);
        assert!(!state.open_requested);
    }

    #[test]
    fn denied_permission_blocks_the_camera() {
        ReducerTest::new(ScanReducer::new())
            .with_env(env())
            .given_state(ScanState::default())
            .when_actions([
                ScanAction::PermissionResolved {
                    status: PermissionStatus::Denied,
                },
                ScanAction::OpenCamera,
                ScanAction::StartReading,
            ])
            .then_state(|state| {
                assert_eq!(state.camera, CameraPhase::Closed);
                assert_eq!(state.notice.as_deref(), Some(PERMISSION_DENIED_NOTICE));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn frames_are_read_only_after_start() {
        ReducerTest::new(ScanReducer::new())
            .with_env(env())
            .given_state(ScanState {
                permission: PermissionStatus::Granted,
                ..ScanState::default()
            })
            .when_actions([ScanAction::OpenCamera, scanned("E1,Q1")])
            .then_state(|state| {
                assert_eq!(state.camera, CameraPhase::Previewing);
                assert!(!state.busy);
                assert!(state.duplicates.last_seen().is_none());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();

        ReducerTest::new(ScanReducer::new())
            .with_env(env())
            .given_state(ScanState {
                permission: PermissionStatus::Granted,
                ..ScanState::default()
            })
            .when_actions([ScanAction::OpenCamera, ScanAction::StartReading])
            .then_state(|state| assert!(state.is_reading()))
            .run();
    }

    #[test]
    fn parsed_code_starts_a_cancellable_validation() {
        ReducerTest::new(ScanReducer::new())
            .with_env(env())
            .given_state(reading_state())
            .when_action(scanned("idEntrada:E123|mdQr:QR456"))
            .then_state(|state| {
                assert!(state.busy);
                assert_eq!(state.camera, CameraPhase::Processing);
                assert_eq!(state.in_flight, Some(ScanId::new(1)));
                assert!(state.history.is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_cancellable_effect(effects, EffectId::new(1));
            })
            .run();
    }

    #[tokio::test]
    async fn malformed_code_finishes_without_backend_call() {
        let h = harness(MockEntradaApi::new(), PermissionStatus::Granted);
        let reducer = ScanReducer::new();
        let mut state = reading_state();

        let mut effects = reducer.reduce(&mut state, scanned("not a valid code"), &h.env);

        assert!(!state.busy);
        assert_eq!(state.camera, CameraPhase::Closed);
        assert_eq!(state.history.len(), 1);
        let entry = state.history.newest().unwrap();
        assert_eq!(entry.title, "QR inválido");
        assert_eq!(entry.status, HistoryStatus::Error);

        assert!(run_effect(effects.remove(0)).await.is_none());
        assert_eq!(h.api.validate_count(), 0);
        let routes = h.navigator.routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].status, RouteStatus::Error);
        assert_eq!(routes[0].message, "Formato de QR inválido");
        assert_eq!(routes[0].ticket_id, "");
    }

    #[test]
    fn duplicate_inside_window_is_suppressed() {
        let h = harness(MockEntradaApi::new(), PermissionStatus::Granted);
        let reducer = ScanReducer::new();
        let mut state = reading_state();

        reducer.reduce(&mut state, scanned("E1,Q1"), &h.env);
        reducer.reduce(&mut state, completion(1, ScanOutcome::Ok), &h.env);
        reducer.reduce(&mut state, ScanAction::OpenCamera, &h.env);
        reducer.reduce(&mut state, ScanAction::StartReading, &h.env);

        h.clock.advance_millis(4_999);
        let effects = reducer.reduce(&mut state, scanned("E1,Q1"), &h.env);
        assertions::assert_no_effects(&effects);
        assert!(!state.busy);
        assert_eq!(state.history.len(), 1);

        h.clock.advance_millis(1);
        let effects = reducer.reduce(&mut state, scanned("E1,Q1"), &h.env);
        assertions::assert_has_cancellable_effect(&effects, EffectId::new(2));
        assert!(state.busy);
    }

    #[test]
    fn frames_while_busy_do_not_touch_the_dedup_slot() {
        let h = harness(MockEntradaApi::new(), PermissionStatus::Granted);
        let reducer = ScanReducer::new();
        let mut state = reading_state();

        reducer.reduce(&mut state, scanned("E1,Q1"), &h.env);
        h.clock.advance_millis(100);
        let effects = reducer.reduce(&mut state, scanned("E2,Q2"), &h.env);

        assertions::assert_no_effects(&effects);
        assert_eq!(state.in_flight, Some(ScanId::new(1)));
        let last = state.duplicates.last_seen().unwrap();
        assert_eq!(last.text, "E1,Q1");
        assert_eq!(last.at, test_clock().now());
    }

    #[tokio::test]
    async fn completion_records_history_and_navigates() {
        let api = MockEntradaApi::new()
            .with_validation(json!({ "raw": { "isOk": 0, "estadoEntrada": "Controlada" } }));
        let h = harness(api, PermissionStatus::Granted);
        let reducer = ScanReducer::new();
        let mut state = reading_state();

        let mut effects = reducer.reduce(&mut state, scanned(r#"["E123","QR456"]"#), &h.env);
        let completed = run_effect(effects.remove(0)).await.unwrap();
        let mut effects = reducer.reduce(&mut state, completed, &h.env);
        run_effect(effects.remove(0)).await;

        assert!(!state.busy);
        assert_eq!(state.in_flight, None);
        assert_eq!(state.camera, CameraPhase::Closed);

        let entry = state.history.newest().unwrap();
        assert_eq!(entry.title, "Entrada E123");
        assert_eq!(entry.subtitle, "Entrada ya controlada (estado: Controlada)");
        assert!(!entry.valid);

        let route = state.last_route.clone().unwrap();
        assert_eq!(route.estado_entrada.as_deref(), Some("Controlada"));
        assert_eq!(route.date_time, h.clock.now());
        assert_eq!(h.navigator.routes(), vec![route]);
    }

    #[tokio::test]
    async fn panicking_validation_degrades_to_unexpected_error() {
        let h = harness(
            MockEntradaApi::new().with_panicking_validation(),
            PermissionStatus::Granted,
        );
        let reducer = ScanReducer::new();
        let mut state = reading_state();

        let mut effects = reducer.reduce(&mut state, scanned("E7,Q7"), &h.env);
        let completed = run_effect(effects.remove(0)).await.unwrap();
        reducer.reduce(&mut state, completed, &h.env);

        assert!(!state.busy);
        let route = state.last_route.unwrap();
        assert_eq!(route.status, RouteStatus::Error);
        assert_eq!(route.message, "Error inesperado al validar la entrada");
        assert_eq!(route.ticket_id, "E7");
    }

    #[test]
    fn stale_completion_is_discarded() {
        ReducerTest::new(ScanReducer::new())
            .with_env(env())
            .given_state(reading_state())
            .when_actions([scanned("E1,Q1"), completion(99, ScanOutcome::Ok)])
            .then_state(|state| {
                assert!(state.busy);
                assert_eq!(state.in_flight, Some(ScanId::new(1)));
                assert!(state.history.is_empty());
                assert!(state.last_route.is_none());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn dismissal_cancels_and_late_result_is_dropped() {
        ReducerTest::new(ScanReducer::new())
            .with_env(env())
            .given_state(reading_state())
            .when_actions([scanned("E1,Q1"), ScanAction::Dismissed])
            .then_state(|state| {
                assert!(!state.busy);
                assert_eq!(state.in_flight, None);
                assert_eq!(state.camera, CameraPhase::Closed);
            })
            .then_effects(|effects| {
                assertions::assert_has_cancel_effect(effects, EffectId::new(1));
            })
            .run();

        ReducerTest::new(ScanReducer::new())
            .with_env(env())
            .given_state(reading_state())
            .when_actions([
                scanned("E1,Q1"),
                ScanAction::Dismissed,
                completion(1, ScanOutcome::Ok),
            ])
            .then_state(|state| {
                assert!(state.history.is_empty());
                assert!(state.last_route.is_none());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn history_keeps_twenty_newest() {
        let h = harness(MockEntradaApi::new(), PermissionStatus::Granted);
        let reducer = ScanReducer::new();
        let mut state = ScanState {
            permission: PermissionStatus::Granted,
            ..ScanState::default()
        };

        for n in 1..=21_u64 {
            reducer.reduce(&mut state, ScanAction::OpenCamera, &h.env);
            reducer.reduce(&mut state, ScanAction::StartReading, &h.env);
            reducer.reduce(&mut state, scanned(&format!("E{n},Q{n}")), &h.env);
            reducer.reduce(&mut state, completion(n, ScanOutcome::Ok), &h.env);
        }

        assert_eq!(state.history.len(), 20);
        assert_eq!(state.history.newest().unwrap().id, ScanId::new(21));
        assert!(state.history.iter().all(|entry| entry.id != ScanId::new(1)));
    }

    #[test]
    fn clearing_history() {
        ReducerTest::new(ScanReducer::new())
            .with_env(env())
            .given_state(reading_state())
            .when_actions([scanned("nope"), ScanAction::HistoryCleared])
            .then_state(|state| assert!(state.history.is_empty()))
            .run();
    }
}
