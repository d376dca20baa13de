//! Database query functions for the `clients` table.

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::{Client, ClientChange, NewClient};

/// Select list used by every query. `abono` is NUMERIC in the store and is
/// cast to float8 here so it decodes as `f64`.
const CLIENT_COLUMNS: &str = "id, name, dni, representative, representative_dni, \
     email, address, phone, plan, abono::float8 AS abono, hours, created_date";

/// Insert a new client row. Returns the inserted client with store-assigned
/// defaults (id, created_date).
pub async fn insert_client(pool: &PgPool, new: &NewClient) -> Result<Client> {
    let sql = format!(
        "INSERT INTO clients \
           (name, dni, representative, representative_dni, email, address, phone, plan, abono, hours) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {CLIENT_COLUMNS}"
    );
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(&new.name)
        .bind(&new.dni)
        .bind(&new.representative)
        .bind(&new.representative_dni)
        .bind(&new.email)
        .bind(&new.address)
        .bind(&new.phone)
        .bind(&new.plan)
        .bind(new.abono)
        .bind(new.hours)
        .fetch_one(pool)
        .await
        .context("failed to insert client")?;

    Ok(client)
}

/// Fetch a single client by id.
pub async fn get_client(pool: &PgPool, id: i32) -> Result<Option<Client>> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1");
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch client")?;

    Ok(client)
}

/// List all clients in ascending id order.
///
/// The ordering is part of the API contract: the list view relies on a
/// stable, deterministic order.
pub async fn list_clients(pool: &PgPool) -> Result<Vec<Client>> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY id ASC");
    let clients = sqlx::query_as::<_, Client>(&sql)
        .fetch_all(pool)
        .await
        .context("failed to list clients")?;

    Ok(clients)
}

/// Apply a partial update as a single UPDATE statement.
///
/// Only the columns named in `changes` are touched. Returns the post-update
/// row, or `None` when no row with that id exists. The caller must pass a
/// non-empty change set.
pub async fn update_client(
    pool: &PgPool,
    id: i32,
    changes: &[ClientChange],
) -> Result<Option<Client>> {
    if changes.is_empty() {
        anyhow::bail!("update_client called with no changes");
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE clients SET ");
    let mut sets = qb.separated(", ");
    for change in changes {
        // Column names come from ClientChange::column(), a closed set of
        // schema identifiers; only values are bound.
        sets.push(change.column());
        sets.push_unseparated(" = ");
        match change {
            ClientChange::Name(v) | ClientChange::Plan(v) => {
                sets.push_bind_unseparated(v.clone());
            }
            ClientChange::Dni(v)
            | ClientChange::Representative(v)
            | ClientChange::RepresentativeDni(v)
            | ClientChange::Email(v)
            | ClientChange::Address(v)
            | ClientChange::Phone(v) => {
                sets.push_bind_unseparated(v.clone());
            }
            ClientChange::Abono(v) => {
                sets.push_bind_unseparated(*v);
            }
            ClientChange::Hours(v) => {
                sets.push_bind_unseparated(*v);
            }
        }
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb.push(format!(" RETURNING {CLIENT_COLUMNS}"));

    let client = qb
        .build_query_as::<Client>()
        .fetch_optional(pool)
        .await
        .context("failed to update client")?;

    Ok(client)
}

/// Delete a client. Returns the deleted row, or `None` when no row with that
/// id exists.
pub async fn delete_client(pool: &PgPool, id: i32) -> Result<Option<Client>> {
    let sql = format!("DELETE FROM clients WHERE id = $1 RETURNING {CLIENT_COLUMNS}");
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to delete client")?;

    Ok(client)
}

/// Add `delta` to a client's consumed hours in place.
///
/// The increment happens inside the single UPDATE statement, so concurrent
/// callers serialize in the store and no increment is lost. Returns the
/// post-increment row, or `None` when no row with that id exists.
pub async fn increment_hours(pool: &PgPool, id: i32, delta: i32) -> Result<Option<Client>> {
    let sql =
        format!("UPDATE clients SET hours = hours + $1 WHERE id = $2 RETURNING {CLIENT_COLUMNS}");
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(delta)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to increment client hours")?;

    Ok(client)
}
