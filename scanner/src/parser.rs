//! QR payload parser
//!
//! Door staff scan codes printed by several generations of the ticketing
//! system, so the same ticket can arrive as a JSON array, a JSON object, a
//! URL, a bare `id,signature` pair or a `key:value` list. Each format has
//! its own strategy; [`parse_payload`] tries them in a fixed order and
//! returns the first hit.

use crate::probe;
use crate::types::ScanPayload;
use serde_json::Value;

/// A single parsing strategy
pub type Strategy = fn(&str) -> Option<ScanPayload>;

/// Strategies in priority order
pub const STRATEGIES: [(&str, Strategy); 5] = [
    ("json_array", parse_json_array),
    ("json_object", parse_json_object),
    ("query_string", parse_query_string),
    ("csv_pair", parse_csv_pair),
    ("key_value", parse_key_value),
];

/// Ticket id keys for JSON objects, in priority order
const JSON_ID_KEYS: [&str; 4] = ["idEntrada", "entrada", "Entrada", "id"];

/// Signature keys for JSON objects, in priority order
const JSON_SIGNATURE_KEYS: [&str; 5] = ["mdQr", "mdQR", "qr", "codigoQr", "cod_qr"];

/// Ticket id keys for query strings and key:value lists (compared lower-case)
const ID_KEYS: [&str; 3] = ["identrada", "entrada", "id"];

/// Signature keys for query strings and key:value lists (compared lower-case)
const SIGNATURE_KEYS: [&str; 4] = ["mdqr", "qr", "codigoqr", "cod_qr"];

/// Parse raw QR text into a payload
///
/// Returns `None` when no strategy recognizes the text. Never panics.
#[must_use]
pub fn parse_payload(raw: &str) -> Option<ScanPayload> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    STRATEGIES.iter().find_map(|(name, strategy)| {
        let payload = strategy(text)?;
        tracing::trace!(strategy = name, id = %payload.id_entrada, "Parsed QR payload");
        Some(payload)
    })
}

/// `["E123", "QR456"]`
#[must_use]
pub fn parse_json_array(text: &str) -> Option<ScanPayload> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) else {
        return None;
    };
    let [id, signature, ..] = items.as_slice() else {
        return None;
    };

    accept(probe::coerce(id), probe::coerce(signature))
}

/// `{"idEntrada": "E123", "mdQr": "QR456"}`
#[must_use]
pub fn parse_json_object(text: &str) -> Option<ScanPayload> {
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(text) else {
        return None;
    };

    let lookup = |keys: &[&str]| {
        keys.iter()
            .filter_map(|key| object.get(*key))
            .map(probe::coerce)
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    };

    accept(lookup(&JSON_ID_KEYS), lookup(&JSON_SIGNATURE_KEYS))
}

/// `https://host/validar?idEntrada=E123&mdQr=QR456` or `idEntrada=E123&mdQr=QR456`
#[must_use]
pub fn parse_query_string(text: &str) -> Option<ScanPayload> {
    let query = if text.starts_with("http://") || text.starts_with("https://") {
        let url = url::Url::parse(text).ok()?;
        url.query()?.to_owned()
    } else if text.contains('=') {
        text.to_owned()
    } else {
        return None;
    };

    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.trim().to_owned()))
        .collect();

    let lookup = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| {
                pairs
                    .iter()
                    .find(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_empty())
                    .map(|(_, v)| v.clone())
            })
            .unwrap_or_default()
    };

    accept(lookup(&ID_KEYS), lookup(&SIGNATURE_KEYS))
}

/// `E123,QR456`
#[must_use]
pub fn parse_csv_pair(text: &str) -> Option<ScanPayload> {
    let segments: Vec<&str> = text
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    match segments.as_slice() {
        [id, signature] => accept((*id).to_owned(), (*signature).to_owned()),
        _ => None,
    }
}

/// `idEntrada:E123|mdQr:QR456`, also with `;`, newlines or commas
///
/// `=` works as a separator when this strategy is called on its own.
/// Through [`parse_payload`] any text containing `=` is claimed by the
/// querystring strategy first, so `entrada=E1;qr=Q1` yields the id
/// `E1;qr=Q1` there.
#[must_use]
pub fn parse_key_value(text: &str) -> Option<ScanPayload> {
    let pairs: Vec<(String, &str)> = text
        .split(['|', ';', '\n', ','])
        .filter_map(|segment| {
            let split_at = segment.find([':', '='])?;
            let (key, value) = segment.split_at(split_at);
            Some((key.trim().to_lowercase(), value[1..].trim()))
        })
        .collect();

    let lookup = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| {
                pairs
                    .iter()
                    .find(|(k, v)| k == key && !v.is_empty())
                    .map(|(_, v)| (*v).to_owned())
            })
            .unwrap_or_default()
    };

    accept(lookup(&ID_KEYS), lookup(&SIGNATURE_KEYS))
}

fn accept(id_entrada: String, md_qr: String) -> Option<ScanPayload> {
    if id_entrada.is_empty() {
        return None;
    }
    Some(ScanPayload { id_entrada, md_qr })
}
