use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A client row -- one customer in the registry.
///
/// `abono` is NUMERIC(10,2) in the store; every query casts it to float8 so
/// it decodes as `f64` here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i32,
    pub name: String,
    pub dni: Option<String>,
    pub representative: Option<String>,
    pub representative_dni: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub plan: String,
    pub abono: f64,
    pub hours: i32,
    pub created_date: NaiveDate,
}

// ---------------------------------------------------------------------------
// Write inputs
// ---------------------------------------------------------------------------

/// Validated field values for inserting a new client.
///
/// `id` and `created_date` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub dni: Option<String>,
    pub representative: Option<String>,
    pub representative_dni: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub plan: String,
    pub abono: f64,
    pub hours: i32,
}

/// One column assignment in a partial update.
///
/// A `Some(..)` inside a text variant writes the value, `None` clears the
/// column to NULL. The update path collects only the fields the caller
/// explicitly sent, so an omitted field never reaches this list.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientChange {
    Name(String),
    Dni(Option<String>),
    Representative(Option<String>),
    RepresentativeDni(Option<String>),
    Email(Option<String>),
    Address(Option<String>),
    Phone(Option<String>),
    Plan(String),
    Abono(f64),
    Hours(i32),
}

impl ClientChange {
    /// The column name this change targets.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Dni(_) => "dni",
            Self::Representative(_) => "representative",
            Self::RepresentativeDni(_) => "representative_dni",
            Self::Email(_) => "email",
            Self::Address(_) => "address",
            Self::Phone(_) => "phone",
            Self::Plan(_) => "plan",
            Self::Abono(_) => "abono",
            Self::Hours(_) => "hours",
        }
    }
}
