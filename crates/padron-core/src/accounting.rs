//! Derived usage and billing metrics for an enriched client.
//!
//! These are the only business rules in the system, so every surface that
//! shows a client's status (HTML index, CLI tables) calls these functions
//! instead of re-deriving the arithmetic.

use crate::normalize::EnrichedClient;

/// Hours left on the client's plan, floored at zero.
///
/// An unresolved plan (legacy id no longer in the catalog) counts as zero
/// included hours.
pub fn remaining_hours(client: &EnrichedClient) -> i32 {
    let included = client.plan_info.as_ref().map_or(0, |info| info.hours);
    (included - client.client.hours).max(0)
}

/// Whether the client has exhausted the plan's included hours.
pub fn is_plan_finished(client: &EnrichedClient) -> bool {
    remaining_hours(client) == 0
}

/// Plan price minus the amount paid.
///
/// Positive means the client still owes; negative means overpayment and must
/// be reported as a credit, never clamped to zero.
pub fn remaining_balance(client: &EnrichedClient) -> f64 {
    let price = client.plan_info.as_ref().map_or(0.0, |info| info.price);
    price - client.client.abono
}
