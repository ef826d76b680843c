//! Injected dependencies of the scan reducer

use crate::api::EntradaApi;
use crate::config::ScanSettings;
use crate::price::CurrencyFormat;
use crate::types::{PermissionStatus, ResultRoute};
use async_trait::async_trait;
use puerta_core::environment::Clock;
use std::sync::Arc;

/// Platform camera permission prompt
#[async_trait]
pub trait CameraPermissions: Send + Sync {
    /// Ask the user for camera access and report the answer
    async fn request(&self) -> PermissionStatus;
}

/// Result screen handoff
pub trait Navigator: Send + Sync {
    /// Show the result of a finished scan
    fn navigate(&self, route: ResultRoute);
}

/// Permission source with a fixed answer, for kiosks and headless runs
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions(pub PermissionStatus);

#[async_trait]
impl CameraPermissions for StaticPermissions {
    async fn request(&self) -> PermissionStatus {
        self.0
    }
}

/// Everything the scan reducer and its effects depend on
///
/// Cheap to clone; the store clones it into every effect.
#[derive(Clone)]
pub struct ScanEnvironment {
    clock: Arc<dyn Clock>,
    api: Arc<dyn EntradaApi>,
    permissions: Arc<dyn CameraPermissions>,
    navigator: Arc<dyn Navigator>,
    currency: CurrencyFormat,
    settings: ScanSettings,
}

impl ScanEnvironment {
    /// Create an environment with default currency format and settings
    pub fn new(
        clock: Arc<dyn Clock>,
        api: Arc<dyn EntradaApi>,
        permissions: Arc<dyn CameraPermissions>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            clock,
            api,
            permissions,
            navigator,
            currency: CurrencyFormat::default(),
            settings: ScanSettings::default(),
        }
    }

    /// Use a different currency format for prices
    #[must_use]
    pub fn with_currency(mut self, currency: CurrencyFormat) -> Self {
        self.currency = currency;
        self
    }

    /// Use different scan settings
    #[must_use]
    pub fn with_settings(mut self, settings: ScanSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Time source
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Backend
    #[must_use]
    pub const fn api(&self) -> &Arc<dyn EntradaApi> {
        &self.api
    }

    /// Permission prompt
    #[must_use]
    pub const fn permissions(&self) -> &Arc<dyn CameraPermissions> {
        &self.permissions
    }

    /// Result screen handoff
    #[must_use]
    pub const fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Price format
    #[must_use]
    pub const fn currency(&self) -> &CurrencyFormat {
        &self.currency
    }

    /// Dedup window and history size
    #[must_use]
    pub const fn settings(&self) -> &ScanSettings {
        &self.settings
    }
}

impl std::fmt::Debug for ScanEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEnvironment")
            .field("currency", &self.currency)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
