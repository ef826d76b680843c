//! Domain types of the scan flow
//!
//! Everything here is plain data: what the parser produces, what the
//! interpreter classifies, what lands in the session history and what is
//! handed to the result screen.

use chrono::{DateTime, Utc};
use puerta_core::effect::EffectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Ticket identifier and signature extracted from one QR code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayload {
    /// Ticket id (`idEntrada` on the wire), never empty
    pub id_entrada: String,
    /// Signature (`mdQr` on the wire), may be empty
    pub md_qr: String,
}

impl ScanPayload {
    /// Create a payload from its two parts
    pub fn new(id_entrada: impl Into<String>, md_qr: impl Into<String>) -> Self {
        Self {
            id_entrada: id_entrada.into(),
            md_qr: md_qr.into(),
        }
    }
}

/// Normalized view of a validation response
///
/// `message` is whatever human text the backend sent (possibly empty);
/// user-facing wording is decided by [`crate::interpret::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    /// Whether the backend accepted the ticket
    pub valid: bool,
    /// Backend message, empty when none was found
    pub message: String,
    /// Opaque ticket state label (`estadoEntrada`)
    pub raw_status: Option<String>,
}

/// Bucket a finished scan falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Ticket accepted
    Ok,
    /// Ticket was already scanned at the door
    AlreadyControlled,
    /// Ticket rejected for any other reason
    Invalid,
    /// Backend unreachable, non-2xx, or the validation task failed
    TransportError,
    /// QR text could not be parsed
    Malformed,
}

impl ScanOutcome {
    /// Whether the ticket may enter
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Stable label, used for metrics and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::AlreadyControlled => "already_controlled",
            Self::Invalid => "invalid",
            Self::TransportError => "transport_error",
            Self::Malformed => "malformed",
        }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of one validation
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Outcome bucket
    pub outcome: ScanOutcome,
    /// User-facing message
    pub message: String,
    /// Opaque ticket state label, when the backend sent one
    pub raw_status: Option<String>,
    /// Ticket id the scan was about, `None` for malformed input
    pub ticket_id: Option<String>,
    /// Response body the verdict came from, mined by enrichment
    pub embedded: Option<Value>,
}

impl Verdict {
    /// Verdict for QR text no parser strategy understood
    #[must_use]
    pub fn malformed() -> Self {
        Self {
            outcome: ScanOutcome::Malformed,
            message: crate::interpret::MALFORMED_MESSAGE.to_owned(),
            raw_status: None,
            ticket_id: None,
            embedded: None,
        }
    }

    /// Verdict for a validation task that panicked
    #[must_use]
    pub fn unexpected_failure(ticket_id: impl Into<String>) -> Self {
        Self {
            outcome: ScanOutcome::TransportError,
            message: crate::interpret::UNEXPECTED_FAILURE_MESSAGE.to_owned(),
            raw_status: None,
            ticket_id: Some(ticket_id.into()),
            embedded: None,
        }
    }

    /// Whether the ticket may enter
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Display data gathered after classification, every field optional
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    /// Event name
    pub event_name: Option<String>,
    /// Ticket type label
    pub ticket_type: Option<String>,
    /// Formatted price
    pub price: Option<String>,
    /// Purchaser display name
    pub customer_name: Option<String>,
    /// Purchaser email
    pub customer_email: Option<String>,
    /// Purchaser avatar URL
    pub customer_avatar_url: Option<String>,
}

/// Everything the flow learned about one scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    /// Classified result
    pub verdict: Verdict,
    /// Best-effort display data
    pub enrichment: Enrichment,
}

impl ScanReport {
    /// Report without enrichment
    #[must_use]
    pub fn bare(verdict: Verdict) -> Self {
        Self {
            verdict,
            enrichment: Enrichment::default(),
        }
    }
}

/// Status parameter of the result screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    /// Ticket accepted
    Ok,
    /// Anything else
    Error,
}

/// Navigation handoff payload for the result screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRoute {
    /// `ok` or `error`
    pub status: RouteStatus,
    /// User-facing message
    pub message: String,
    /// Ticket id, empty when the QR was unreadable
    pub ticket_id: String,
    /// Opaque ticket state label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado_entrada: Option<String>,
    /// Event name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    /// Ticket type label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
    /// Formatted price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Purchaser display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Purchaser email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    /// Purchaser avatar URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_avatar_url: Option<String>,
    /// When the scan finished
    pub date_time: DateTime<Utc>,
}

impl ResultRoute {
    /// Build the route for a finished scan
    #[must_use]
    pub fn from_report(report: &ScanReport, finished_at: DateTime<Utc>) -> Self {
        let ScanReport {
            verdict,
            enrichment,
        } = report;

        Self {
            status: if verdict.is_ok() {
                RouteStatus::Ok
            } else {
                RouteStatus::Error
            },
            message: verdict.message.clone(),
            ticket_id: verdict.ticket_id.clone().unwrap_or_default(),
            estado_entrada: verdict.raw_status.clone(),
            event_name: enrichment.event_name.clone(),
            ticket_type: enrichment.ticket_type.clone(),
            price: enrichment.price.clone(),
            customer_name: enrichment.customer_name.clone(),
            customer_email: enrichment.customer_email.clone(),
            customer_avatar_url: enrichment.customer_avatar_url.clone(),
            date_time: finished_at,
        }
    }
}

/// Per-session scan sequence number
///
/// Doubles as the id of the cancellable effect group running the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScanId(u64);

impl ScanId {
    /// Create a scan id from a raw value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Effect group the scan's validation runs in
    #[must_use]
    pub const fn effect_id(self) -> EffectId {
        EffectId::new(self.0)
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan-{}", self.0)
    }
}

/// Status column of a history row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryStatus {
    /// Ticket accepted
    Ok,
    /// Anything else
    Error,
}

/// One row of the session scan log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanHistoryEntry {
    /// Scan this row belongs to
    pub id: ScanId,
    /// "Entrada <id>" or "QR inválido"
    pub title: String,
    /// Event name when known, otherwise the message
    pub subtitle: String,
    /// Whether the ticket was accepted
    pub valid: bool,
    /// `OK` or `ERROR`
    pub status: HistoryStatus,
    /// Message followed by ticket type and price when known
    pub details: String,
}

impl ScanHistoryEntry {
    /// Build the history row for a finished scan
    #[must_use]
    pub fn from_report(id: ScanId, report: &ScanReport) -> Self {
        let ScanReport {
            verdict,
            enrichment,
        } = report;

        let title = match verdict.ticket_id.as_deref() {
            Some(ticket) if !ticket.is_empty() => format!("Entrada {ticket}"),
            _ => "QR inválido".to_owned(),
        };

        let subtitle = enrichment
            .event_name
            .clone()
            .unwrap_or_else(|| verdict.message.clone());

        let details = std::iter::once(verdict.message.as_str())
            .chain(enrichment.ticket_type.as_deref())
            .chain(enrichment.price.as_deref())
            .collect::<Vec<_>>()
            .join(" · ");

        Self {
            id,
            title,
            subtitle,
            valid: verdict.is_ok(),
            status: if verdict.is_ok() {
                HistoryStatus::Ok
            } else {
                HistoryStatus::Error
            },
            details,
        }
    }
}

/// Camera permission as last reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermissionStatus {
    /// Never asked
    #[default]
    Undetermined,
    /// Camera may be used
    Granted,
    /// User refused; only system settings can change it
    Denied,
}

/// What the camera is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraPhase {
    /// Modal closed
    #[default]
    Closed,
    /// Preview visible, frames not read
    Previewing,
    /// Frames are decoded and fed to the flow
    Reading,
    /// A scan is being validated, frame stream paused
    Processing,
}
