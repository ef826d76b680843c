//! # Puerta Scanner
//!
//! The door-control scan flow of the ticketing app: a camera hands over the
//! text of a QR code, the flow figures out which ticket it names, asks the
//! backend whether it may enter and hands the verdict to a result screen.
//!
//! ```text
//! camera ─▶ dedup ─▶ parser ─▶ validation ─▶ enrichment ─▶ navigator
//! ```
//!
//! The flow is a [`reducer::ScanReducer`] hosted by a
//! [`puerta_runtime::Store`]; everything with side effects sits behind a
//! trait in [`environment::ScanEnvironment`].
//!
//! ## Example
//!
//! ```no_run
//! use puerta_core::environment::SystemClock;
//! use puerta_runtime::Store;
//! use puerta_scanner::api::HttpEntradaApi;
//! use puerta_scanner::environment::{ScanEnvironment, StaticPermissions};
//! use puerta_scanner::mocks::RecordingNavigator;
//! use puerta_scanner::reducer::{ScanAction, ScanReducer, ScanState};
//! use puerta_scanner::types::PermissionStatus;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let env = ScanEnvironment::new(
//!     Arc::new(SystemClock),
//!     Arc::new(HttpEntradaApi::new("http://localhost:8080/api")?),
//!     Arc::new(StaticPermissions(PermissionStatus::Granted)),
//!     Arc::new(RecordingNavigator::new()),
//! );
//! let store = Store::new(ScanState::default(), ScanReducer::new(), env);
//!
//! store.send(ScanAction::OpenCamera).await?;
//! store.send(ScanAction::StartReading).await?;
//! store
//!     .send(ScanAction::CodeScanned { raw: "idEntrada:E123|mdQr:QR456".into() })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod dedup;
pub mod enrich;
pub mod environment;
pub mod history;
pub mod interpret;
pub mod mocks;
pub mod parser;
pub mod price;
pub mod probe;
pub mod reducer;
pub mod types;
pub mod validation;

pub use api::{ApiError, EntradaApi, HttpEntradaApi};
pub use config::{ConfigError, ScannerConfig};
pub use environment::{CameraPermissions, Navigator, ScanEnvironment};
pub use parser::parse_payload;
pub use reducer::{ScanAction, ScanReducer, ScanState};
pub use types::{ResultRoute, ScanOutcome, ScanPayload, Verdict};
