//! Client service: the operations exposed to the HTTP and CLI surfaces.
//!
//! Each operation validates its input through the [`normalize`](crate::normalize)
//! parsers, touches the store at most once, and returns an enriched record.
//! Validation always completes before any store mutation is attempted, so a
//! rejected request never leaves a partial write behind.

use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

use padron_db::models::{ClientChange, NewClient};
use padron_db::queries::clients;

use crate::catalog::PlanCatalog;
use crate::normalize::{
    EnrichedClient, TextPatch, enrich, lenient_amount, lenient_int, optional_text,
    parse_client_id, parse_hours_delta, strict_amount, strict_int, text_or_none,
};

/// Error surface of the client service.
///
/// `InvalidArgument` maps to HTTP 400, `NotFound` to 404, `Store` to 500.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("client {0} not found")]
    NotFound(i32),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ServiceError {
    fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Validate a raw id from a path segment or CLI argument.
fn require_id(raw: &str) -> Result<i32, ServiceError> {
    parse_client_id(raw).ok_or_else(|| ServiceError::invalid("invalid id"))
}

/// All clients, ascending id, enriched with their plan info.
pub async fn list_clients(
    pool: &PgPool,
    catalog: &PlanCatalog,
) -> Result<Vec<EnrichedClient>, ServiceError> {
    let rows = clients::list_clients(pool).await?;
    Ok(rows.into_iter().map(|c| enrich(c, catalog)).collect())
}

/// Fetch one client by raw id.
pub async fn get_client(
    pool: &PgPool,
    catalog: &PlanCatalog,
    raw_id: &str,
) -> Result<EnrichedClient, ServiceError> {
    let id = require_id(raw_id)?;
    let client = clients::get_client(pool, id)
        .await?
        .ok_or(ServiceError::NotFound(id))?;
    Ok(enrich(client, catalog))
}

/// Create a client from a loosely-typed JSON body.
///
/// `name` and `plan` are required and validated; the numeric fields use the
/// tolerant parsers, so a malformed `abono` or `hours` value falls back to 0
/// instead of rejecting the whole create.
pub async fn create_client(
    pool: &PgPool,
    catalog: &PlanCatalog,
    body: &Value,
) -> Result<EnrichedClient, ServiceError> {
    let name = match body.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
        _ => return Err(ServiceError::invalid("name is required")),
    };

    let plan = match body.get("plan") {
        Some(Value::String(s)) if catalog.contains(s) => s.clone(),
        _ => return Err(ServiceError::invalid("invalid plan")),
    };

    let new = NewClient {
        name,
        dni: text_or_none(body.get("dni")),
        representative: text_or_none(body.get("representative")),
        representative_dni: text_or_none(body.get("representative_dni")),
        email: text_or_none(body.get("email")),
        address: text_or_none(body.get("address")),
        phone: text_or_none(body.get("phone")),
        plan,
        abono: lenient_amount(body.get("abono"), 0.0),
        hours: lenient_int(body.get("hours"), 0),
    };

    let created = clients::insert_client(pool, &new).await?;
    Ok(enrich(created, catalog))
}

/// Collect the partial-update change set from a JSON body.
///
/// Only fields present in the body produce changes; a present field that
/// fails its strict parse rejects the whole update.
fn collect_changes(body: &Value, catalog: &PlanCatalog) -> Result<Vec<ClientChange>, ServiceError> {
    let Some(obj) = body.as_object() else {
        return Err(ServiceError::invalid("invalid JSON body"));
    };

    let mut changes = Vec::new();

    if let Some(Value::String(s)) = obj.get("name") {
        let name = s.trim();
        if name.is_empty() {
            return Err(ServiceError::invalid("name cannot be empty"));
        }
        changes.push(ClientChange::Name(name.to_owned()));
    }

    // Optional text fields: Omit leaves the column alone, Clear writes NULL.
    let text_fields: [(&str, fn(Option<String>) -> ClientChange); 6] = [
        ("dni", ClientChange::Dni),
        ("representative", ClientChange::Representative),
        ("representative_dni", ClientChange::RepresentativeDni),
        ("email", ClientChange::Email),
        ("address", ClientChange::Address),
        ("phone", ClientChange::Phone),
    ];
    for (key, make) in text_fields {
        match optional_text(obj.get(key)) {
            TextPatch::Omit => {}
            TextPatch::Clear => changes.push(make(None)),
            TextPatch::Set(s) => changes.push(make(Some(s))),
        }
    }

    if let Some(value) = obj.get("plan") {
        match value {
            Value::String(s) if catalog.contains(s) => {
                changes.push(ClientChange::Plan(s.clone()));
            }
            _ => return Err(ServiceError::invalid("invalid plan")),
        }
    }

    if let Some(value) = obj.get("abono") {
        let abono = strict_amount(value).ok_or_else(|| ServiceError::invalid("invalid abono"))?;
        changes.push(ClientChange::Abono(abono));
    }

    if let Some(value) = obj.get("hours") {
        let hours = strict_int(value).ok_or_else(|| ServiceError::invalid("invalid hours"))?;
        changes.push(ClientChange::Hours(hours));
    }

    Ok(changes)
}

/// Partially update a client.
///
/// Absent fields stay untouched, explicit nulls clear optional text fields,
/// and a body with no recognized fields is rejected rather than performing a
/// no-op write.
pub async fn update_client(
    pool: &PgPool,
    catalog: &PlanCatalog,
    raw_id: &str,
    body: &Value,
) -> Result<EnrichedClient, ServiceError> {
    let id = require_id(raw_id)?;
    let changes = collect_changes(body, catalog)?;
    if changes.is_empty() {
        return Err(ServiceError::invalid("no fields to update"));
    }

    let updated = clients::update_client(pool, id, &changes)
        .await?
        .ok_or(ServiceError::NotFound(id))?;
    Ok(enrich(updated, catalog))
}

/// Delete a client, returning the record as it was before deletion.
pub async fn delete_client(
    pool: &PgPool,
    catalog: &PlanCatalog,
    raw_id: &str,
) -> Result<EnrichedClient, ServiceError> {
    let id = require_id(raw_id)?;
    let deleted = clients::delete_client(pool, id)
        .await?
        .ok_or(ServiceError::NotFound(id))?;
    Ok(enrich(deleted, catalog))
}

/// Register consumed hours: add `delta` (default 1, max 24) to the client's
/// counter in a single atomic statement.
///
/// A client whose plan is already exhausted is not rejected here; whether to
/// gate further registration on [`is_plan_finished`](crate::accounting::is_plan_finished)
/// is the caller's policy.
pub async fn register_hours(
    pool: &PgPool,
    catalog: &PlanCatalog,
    raw_id: &str,
    body: &Value,
) -> Result<EnrichedClient, ServiceError> {
    let id = require_id(raw_id)?;
    let delta = parse_hours_delta(body.get("delta")).ok_or_else(|| {
        ServiceError::invalid("invalid delta (expected an integer between 1 and 24)")
    })?;

    let updated = clients::increment_hours(pool, id, delta)
        .await?
        .ok_or(ServiceError::NotFound(id))?;
    Ok(enrich(updated, catalog))
}
