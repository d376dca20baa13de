//! Terminal front-end for client management.
//!
//! Builds the same loosely-typed JSON bodies the HTTP surface receives and
//! feeds them through the service layer, so validation semantics are
//! identical no matter which surface a record came in through.

use anyhow::Result;
use clap::Subcommand;
use serde_json::{Map, Value, json};
use sqlx::PgPool;

use padron_core::accounting;
use padron_core::catalog::PlanCatalog;
use padron_core::normalize::EnrichedClient;
use padron_core::service;

#[derive(Subcommand)]
pub enum ClientCommands {
    /// List all clients
    List,
    /// Show one client in full
    Show {
        /// Client id
        id: String,
    },
    /// Register a new client
    Add {
        /// Client name
        name: String,
        /// Plan id (must exist in the catalog; see `padron plans`)
        #[arg(long)]
        plan: String,
        #[arg(long)]
        dni: Option<String>,
        #[arg(long)]
        representative: Option<String>,
        #[arg(long)]
        representative_dni: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Initial payment toward the plan price
        #[arg(long)]
        abono: Option<f64>,
        /// Hours already consumed
        #[arg(long)]
        hours: Option<i32>,
    },
    /// Update fields of an existing client (pass "" to clear a text field)
    Set {
        /// Client id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        plan: Option<String>,
        #[arg(long)]
        dni: Option<String>,
        #[arg(long)]
        representative: Option<String>,
        #[arg(long)]
        representative_dni: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Cumulative payment toward the plan price
        #[arg(long)]
        abono: Option<f64>,
        /// Consumed-hours counter (0 to renew a plan)
        #[arg(long)]
        hours: Option<i32>,
    },
    /// Delete a client
    Rm {
        /// Client id
        id: String,
    },
    /// Register consumed hours
    Hours {
        /// Client id
        id: String,
        /// Hours to add, 1..=24 (default 1)
        #[arg(long)]
        delta: Option<i32>,
    },
}

pub async fn run_client_command(
    command: ClientCommands,
    pool: &PgPool,
    catalog: &PlanCatalog,
) -> Result<()> {
    match command {
        ClientCommands::List => {
            let clients = service::list_clients(pool, catalog).await?;
            if clients.is_empty() {
                println!("No clients registered.");
                return Ok(());
            }
            println!(
                "{:<5} {:<24} {:<10} {:>5} {:>5} {:>12}  {}",
                "ID", "NAME", "PLAN", "USED", "LEFT", "BALANCE", "STATUS"
            );
            for client in &clients {
                print_row(client);
            }
        }
        ClientCommands::Show { id } => {
            let client = service::get_client(pool, catalog, &id).await?;
            print_detail(&client);
        }
        ClientCommands::Add {
            name,
            plan,
            dni,
            representative,
            representative_dni,
            email,
            address,
            phone,
            abono,
            hours,
        } => {
            let mut body = Map::new();
            body.insert("name".to_owned(), json!(name));
            body.insert("plan".to_owned(), json!(plan));
            insert_text(&mut body, "dni", dni);
            insert_text(&mut body, "representative", representative);
            insert_text(&mut body, "representative_dni", representative_dni);
            insert_text(&mut body, "email", email);
            insert_text(&mut body, "address", address);
            insert_text(&mut body, "phone", phone);
            if let Some(v) = abono {
                body.insert("abono".to_owned(), json!(v));
            }
            if let Some(v) = hours {
                body.insert("hours".to_owned(), json!(v));
            }

            let created = service::create_client(pool, catalog, &Value::Object(body)).await?;
            println!("Created client {}.", created.client.id);
            print_detail(&created);
        }
        ClientCommands::Set {
            id,
            name,
            plan,
            dni,
            representative,
            representative_dni,
            email,
            address,
            phone,
            abono,
            hours,
        } => {
            let mut body = Map::new();
            insert_text(&mut body, "name", name);
            insert_text(&mut body, "plan", plan);
            insert_text(&mut body, "dni", dni);
            insert_text(&mut body, "representative", representative);
            insert_text(&mut body, "representative_dni", representative_dni);
            insert_text(&mut body, "email", email);
            insert_text(&mut body, "address", address);
            insert_text(&mut body, "phone", phone);
            if let Some(v) = abono {
                body.insert("abono".to_owned(), json!(v));
            }
            if let Some(v) = hours {
                body.insert("hours".to_owned(), json!(v));
            }

            let updated =
                service::update_client(pool, catalog, &id, &Value::Object(body)).await?;
            println!("Updated client {}.", updated.client.id);
            print_detail(&updated);
        }
        ClientCommands::Rm { id } => {
            let deleted = service::delete_client(pool, catalog, &id).await?;
            println!(
                "Deleted client {} ({}).",
                deleted.client.id, deleted.client.name
            );
        }
        ClientCommands::Hours { id, delta } => {
            let body = match delta {
                Some(d) => json!({ "delta": d }),
                None => json!({}),
            };
            let updated = service::register_hours(pool, catalog, &id, &body).await?;
            let left = accounting::remaining_hours(&updated);
            println!(
                "Client {}: {} hours used, {} left.",
                updated.client.id, updated.client.hours, left
            );
            if accounting::is_plan_finished(&updated) {
                println!("Plan is finished.");
            }
        }
    }

    Ok(())
}

fn insert_text(body: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(v) = value {
        body.insert(key.to_owned(), json!(v));
    }
}

fn print_row(client: &EnrichedClient) {
    let left = accounting::remaining_hours(client);
    let status = if accounting::is_plan_finished(client) {
        "finished"
    } else {
        "active"
    };
    println!(
        "{:<5} {:<24} {:<10} {:>5} {:>5} {:>12}  {}",
        client.client.id,
        client.client.name,
        client.client.plan,
        client.client.hours,
        left,
        balance_text(client),
        status
    );
}

fn print_detail(client: &EnrichedClient) {
    let c = &client.client;
    println!("id:             {}", c.id);
    println!("name:           {}", c.name);
    println!("dni:            {}", c.dni.as_deref().unwrap_or("-"));
    println!(
        "representative: {}",
        c.representative.as_deref().unwrap_or("-")
    );
    println!(
        "rep. dni:       {}",
        c.representative_dni.as_deref().unwrap_or("-")
    );
    println!("email:          {}", c.email.as_deref().unwrap_or("-"));
    println!("address:        {}", c.address.as_deref().unwrap_or("-"));
    println!("phone:          {}", c.phone.as_deref().unwrap_or("-"));
    match &client.plan_info {
        Some(info) => println!("plan:           {} ({})", c.plan, info.label),
        None => println!("plan:           {} (not in catalog)", c.plan),
    }
    println!("abono:          {:.2}", c.abono);
    println!(
        "hours:          {} used, {} left",
        c.hours,
        accounting::remaining_hours(client)
    );
    println!("balance:        {}", balance_text(client));
    println!("created:        {}", c.created_date);
}

fn balance_text(client: &EnrichedClient) -> String {
    let balance = accounting::remaining_balance(client);
    if balance >= 0.0 {
        format!("{balance:.2}")
    } else {
        format!("credit {:.2}", -balance)
    }
}
