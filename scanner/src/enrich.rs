//! Best-effort result enrichment
//!
//! After a verdict exists, the result screen wants the event name, ticket
//! type, price and who bought the ticket. Whatever the validation response
//! already embeds is used directly; the rest comes from secondary lookups
//! that run concurrently. A failed lookup only leaves its field empty.

use crate::api::{ApiError, EntradaApi};
use crate::price::CurrencyFormat;
use crate::probe::{self, Path};
use crate::types::{Enrichment, Verdict};
use serde_json::Value;

/// Objects inside a validation response that may carry ticket data
const TICKET_WRAPPERS: [Path<'static>; 6] = [
    &["raw"],
    &["data"],
    &["entrada"],
    &["raw", "entrada"],
    &["data", "entrada"],
    &["ticket"],
];

const EVENT_NAME_PATHS: [Path<'static>; 6] = [
    &["nombreEvento"],
    &["eventName"],
    &["evento", "nombre"],
    &["evento", "titulo"],
    &["event", "name"],
    &["tituloEvento"],
];

const EVENT_ID_PATHS: [Path<'static>; 5] = [
    &["idEvento"],
    &["eventId"],
    &["evento", "idEvento"],
    &["evento", "id"],
    &["event", "id"],
];

const TICKET_TYPE_PATHS: [Path<'static>; 7] = [
    &["tipoEntrada"],
    &["tipoEntrada", "nombre"],
    &["tipoEntrada", "descripcion"],
    &["nombreTipoEntrada"],
    &["ticketType"],
    &["ticketType", "name"],
    &["tipo"],
];

const PRICE_PATHS: [Path<'static>; 5] = [
    &["precio"],
    &["price"],
    &["importe"],
    &["monto"],
    &["tipoEntrada", "precio"],
];

const BUYER_ID_PATHS: [Path<'static>; 7] = [
    &["idUsuario"],
    &["idComprador"],
    &["buyerId"],
    &["usuario", "idUsuario"],
    &["usuario", "id"],
    &["comprador", "idUsuario"],
    &["comprador", "id"],
];

/// Objects inside a lookup response that may carry the entity
const ENTITY_WRAPPERS: [Path<'static>; 5] =
    [&["data"], &["evento"], &["usuario"], &["user"], &["event"]];

const ENTITY_NAME_PATHS: [Path<'static>; 5] = [
    &["nombre"],
    &["name"],
    &["titulo"],
    &["title"],
    &["nombreEvento"],
];

const USER_NAME_PATHS: [Path<'static>; 4] =
    [&["displayName"], &["name"], &["nombreCompleto"], &["username"]];

const EMAIL_PATHS: [Path<'static>; 3] = [&["email"], &["correo"], &["mail"]];

const AVATAR_PATHS: [Path<'static>; 5] = [
    &["avatar"],
    &["avatarUrl"],
    &["foto"],
    &["fotoPerfil"],
    &["imagen"],
];

const IMAGE_URL_PATHS: [Path<'static>; 5] =
    [&["url"], &["urlImagen"], &["imagen"], &["src"], &["path"]];

/// Purchaser fields gathered from the user lookups
#[derive(Debug, Default)]
struct Customer {
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

/// Gather display data for a verdict
///
/// Malformed scans carry no ticket and get nothing.
pub async fn enrich(api: &dyn EntradaApi, verdict: &Verdict, currency: &CurrencyFormat) -> Enrichment {
    let Some(body) = verdict.embedded.as_ref() else {
        return Enrichment::default();
    };
    let roots = probe::roots(body, &TICKET_WRAPPERS);

    let embedded_event_name = probe::first(&roots, &EVENT_NAME_PATHS, probe::string);
    let event_id = probe::first(&roots, &EVENT_ID_PATHS, probe::text);
    let buyer_id = probe::first(&roots, &BUYER_ID_PATHS, probe::text);

    let event_name = async {
        match (embedded_event_name, event_id) {
            (Some(name), _) => Some(name),
            (None, Some(id)) => lookup_event_name(api, &id).await,
            (None, None) => None,
        }
    };
    let customer = async {
        match buyer_id {
            Some(id) => lookup_customer(api, &id).await,
            None => Customer::default(),
        }
    };
    let (event_name, customer) = futures::join!(event_name, customer);

    Enrichment {
        event_name,
        ticket_type: probe::first(&roots, &TICKET_TYPE_PATHS, probe::string),
        price: probe::first(&roots, &PRICE_PATHS, |value| currency.format_value(value)),
        customer_name: customer.name,
        customer_email: customer.email,
        customer_avatar_url: customer.avatar_url,
    }
}

async fn lookup_event_name(api: &dyn EntradaApi, event_id: &str) -> Option<String> {
    let event = swallow("event", api.event(event_id).await)?;
    let roots = probe::roots(&event, &ENTITY_WRAPPERS);
    probe::first(&roots, &ENTITY_NAME_PATHS, probe::string)
}

async fn lookup_customer(api: &dyn EntradaApi, user_id: &str) -> Customer {
    let Some(user) = swallow("user", api.user(user_id).await) else {
        return Customer::default();
    };
    let roots = probe::roots(&user, &ENTITY_WRAPPERS);

    let avatar_url = match probe::first(&roots, &AVATAR_PATHS, probe::string) {
        Some(url) => Some(url),
        None => lookup_first_image(api, user_id).await,
    };

    Customer {
        name: full_name(&roots).or_else(|| probe::first(&roots, &USER_NAME_PATHS, probe::string)),
        email: probe::first(&roots, &EMAIL_PATHS, probe::string),
        avatar_url,
    }
}

async fn lookup_first_image(api: &dyn EntradaApi, entity_id: &str) -> Option<String> {
    let image = swallow("avatar", api.first_image(entity_id).await)?;
    let image = match image {
        Value::Array(mut images) if !images.is_empty() => images.swap_remove(0),
        other => other,
    };

    probe::string(&image).or_else(|| {
        let roots = probe::roots(&image, &[&["data"]]);
        probe::first(&roots, &IMAGE_URL_PATHS, probe::string)
    })
}

/// `nombre` + `apellido` when at least the first name is present
fn full_name(roots: &[&Value]) -> Option<String> {
    let first_name = probe::first(roots, &[&["nombre"]], probe::string)?;
    match probe::first(roots, &[&["apellido"]], probe::string) {
        Some(last_name) => Some(format!("{first_name} {last_name}")),
        None => Some(first_name),
    }
}

fn swallow(lookup: &'static str, result: Result<Value, ApiError>) -> Option<Value> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::debug!(lookup, error = %error, "Enrichment lookup failed");
            metrics::counter!("scanner.enrichment.failures", "lookup" => lookup).increment(1);
            None
        },
    }
}
