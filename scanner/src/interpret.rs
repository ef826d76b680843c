//! Validation response interpretation
//!
//! Two steps. [`normalize`] maps whatever the backend sent into a
//! [`ValidationResult`]; it is the only place that knows the alias paths.
//! [`classify`] turns that into a [`Verdict`] with the wording door staff
//! see. Failed requests go through [`classify_failure`].

use crate::api::ApiError;
use crate::probe::{self, Path};
use crate::types::{ScanOutcome, ValidationResult, Verdict};
use serde_json::Value;

/// Message for QR text no parser strategy understood
pub const MALFORMED_MESSAGE: &str = "Formato de QR inválido";

/// Message when the validation task itself failed
pub const UNEXPECTED_FAILURE_MESSAGE: &str = "Error inesperado al validar la entrada";

/// Message for a ticket the backend does not know
pub const NOT_FOUND_MESSAGE: &str = "La entrada no existe";

/// Fallback message for an accepted ticket
pub const VALID_MESSAGE: &str = "Entrada válida";

/// Fallback message for a rejected ticket
pub const INVALID_MESSAGE: &str = "Entrada inválida";

/// Lower-case fragments of a ticket state meaning "already scanned"
const ALREADY_CONTROLLED_TERMS: [&str; 6] =
    ["controlad", "ya usad", "ya utiliz", "utilizad", "already", "scanned"];

/// Words that negate a state fragment when they come before it
const NEGATIONS: [&str; 5] = ["no", "sin", "not", "never", "nunca"];

/// Paths of the integer success flag, highest priority first
const SUCCESS_FLAG_PATHS: [Path<'static>; 2] = [&["raw", "isOk"], &["isOk"]];

/// Paths of an explicit boolean success field
const SUCCESS_BOOL_PATHS: [Path<'static>; 5] =
    [&["valid"], &["esValida"], &["isValid"], &["success"], &["ok"]];

/// Paths of the opaque ticket state label
const STATUS_PATHS: [Path<'static>; 5] = [
    &["raw", "estadoEntrada"],
    &["estadoEntrada"],
    &["data", "estadoEntrada"],
    &["raw", "estado"],
    &["estado"],
];

/// Fields that may hold a human message
const MESSAGE_PATHS: [Path<'static>; 6] = [
    &["message"],
    &["mensaje"],
    &["msg"],
    &["error"],
    &["detail"],
    &["title"],
];

/// Objects a message may be nested in
const MESSAGE_WRAPPERS: [Path<'static>; 2] = [&["raw"], &["data"]];

/// Normalize a validation response body
#[must_use]
pub fn normalize(body: &Value) -> ValidationResult {
    let roots = [body];

    let valid = match probe::first(&roots, &SUCCESS_FLAG_PATHS, probe::flag) {
        Some(flag) => flag == 1,
        None => probe::first(&roots, &SUCCESS_BOOL_PATHS, probe::boolean).unwrap_or(false),
    };

    ValidationResult {
        valid,
        message: backend_message(body).unwrap_or_default(),
        raw_status: ticket_status(body),
    }
}

/// Whether a ticket state label means the ticket was already scanned
#[must_use]
pub fn is_already_controlled(status: &str) -> bool {
    let status = status.to_lowercase();
    ALREADY_CONTROLLED_TERMS.iter().any(|term| {
        status
            .match_indices(term)
            .any(|(at, _)| !is_negated(&status[..at]))
    })
}

/// Whether the text leading up to a fragment contains a negation word
fn is_negated(prefix: &str) -> bool {
    prefix
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| NEGATIONS.contains(&word))
}

/// Turn a normalized response into a verdict
#[must_use]
pub fn classify(result: &ValidationResult) -> Verdict {
    let backend_message = Some(result.message.trim()).filter(|m| !m.is_empty());
    let status = result.raw_status.as_deref();

    let (outcome, message) = if result.valid {
        (
            ScanOutcome::Ok,
            backend_message.unwrap_or(VALID_MESSAGE).to_owned(),
        )
    } else if let Some(status) = status.filter(|s| is_already_controlled(s)) {
        (
            ScanOutcome::AlreadyControlled,
            format!("Entrada ya controlada (estado: {status})"),
        )
    } else {
        let message = match status.and_then(rejection_reason) {
            Some(reason) => reason.to_owned(),
            None => backend_message.unwrap_or(INVALID_MESSAGE).to_owned(),
        };
        (ScanOutcome::Invalid, message)
    };

    Verdict {
        outcome,
        message,
        raw_status: result.raw_status.clone(),
        ticket_id: None,
        embedded: None,
    }
}

/// Interpret a successful HTTP exchange for `ticket_id`
#[must_use]
pub fn interpret_response(ticket_id: &str, body: Value) -> Verdict {
    let verdict = classify(&normalize(&body));
    Verdict {
        ticket_id: Some(ticket_id.to_owned()),
        embedded: Some(body),
        ..verdict
    }
}

/// Turn a failed request into a verdict
///
/// A 404 always reads "La entrada no existe". Other statuses surface the
/// backend message, prefixed with the ticket state when one was sent.
/// Anything else falls back to the transport error text.
#[must_use]
pub fn classify_failure(ticket_id: &str, error: &ApiError) -> Verdict {
    let body = error.body();
    let raw_status = body.and_then(ticket_status);

    let message = match error {
        ApiError::Status { status: 404, .. } => NOT_FOUND_MESSAGE.to_owned(),
        ApiError::Status { .. } => {
            let backend = body.and_then(backend_message);
            match (raw_status.as_deref(), backend) {
                (Some(state), Some(message)) => format!("{state}: {message}"),
                (None, Some(message)) => message,
                (Some(state), None) => format!("{state}: {error}"),
                (None, None) => error.to_string(),
            }
        },
        ApiError::Transport(_) | ApiError::Decode(_) | ApiError::InvalidUrl(_) => error.to_string(),
    };

    Verdict {
        outcome: ScanOutcome::TransportError,
        message,
        raw_status: if error.status() == Some(404) {
            None
        } else {
            raw_status
        },
        ticket_id: Some(ticket_id.to_owned()),
        embedded: body.cloned(),
    }
}

fn ticket_status(body: &Value) -> Option<String> {
    probe::first(&[body], &STATUS_PATHS, probe::text)
}

fn backend_message(body: &Value) -> Option<String> {
    let roots = probe::roots(body, &MESSAGE_WRAPPERS);
    probe::first(&roots, &MESSAGE_PATHS, probe::string)
}

/// Reason for a rejected ticket derived from its state label
fn rejection_reason(status: &str) -> Option<&'static str> {
    let status = status.to_lowercase();
    let has = |terms: &[&str]| terms.iter().any(|term| status.contains(term));

    if has(&["cancel"]) {
        Some("La entrada fue cancelada")
    } else if has(&["anulad", "void"]) {
        Some("La entrada fue anulada")
    } else if has(&["vencid", "expir"]) {
        Some("La entrada está vencida")
    } else if has(&["no existe", "inexistente", "not found", "no encontrad"]) {
        Some(NOT_FOUND_MESSAGE)
    } else {
        None
    }
}
