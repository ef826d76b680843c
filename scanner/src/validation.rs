//! One validation round trip: backend call, classification, enrichment

use crate::api::EntradaApi;
use crate::enrich::enrich;
use crate::interpret::{classify_failure, interpret_response};
use crate::price::CurrencyFormat;
use crate::types::{ScanPayload, ScanReport};

/// Validate a ticket and gather its display data
///
/// Never fails: backend errors become a transport-error verdict.
pub async fn validate_ticket(
    api: &dyn EntradaApi,
    payload: &ScanPayload,
    currency: &CurrencyFormat,
) -> ScanReport {
    let verdict = match api.validate(payload).await {
        Ok(body) => interpret_response(&payload.id_entrada, body),
        Err(error) => {
            tracing::warn!(
                id_entrada = %payload.id_entrada,
                error = %error,
                "Validation request failed"
            );
            classify_failure(&payload.id_entrada, &error)
        },
    };

    let enrichment = enrich(api, &verdict, currency).await;
    ScanReport {
        verdict,
        enrichment,
    }
}
