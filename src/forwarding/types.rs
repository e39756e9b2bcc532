//! Core data types for the forwarding pipeline
//! Pure data structures with no behavior

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One customer as exported by the dealer management system.
///
/// Every field is text straight from the export; a column missing from the
/// source resolves to an empty string, never to an absent field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_line1: String,
    pub city: String,
    pub province_state: String,
    pub postal_code: String,
    pub tel_residence: String,
    pub tel_business: String,
    pub tel_other: String,
    pub email: String,
    pub birth_date: String,
}

/// One deal as exported by the dealer management system.
///
/// `purchase_date` is MM/DD/YYYY text; parsing and the recency rule live in
/// the filter module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealRecord {
    pub deal_id: String,
    pub customer_id: String,
    pub vehicle_vin: String,
    pub purchase_date: String,
    pub selling_price: String,
    pub payment_type: String,
    pub sman1: String,
    pub term_months: String,
    pub rate: String,
    pub in_house_finance: String,
    pub payment: String,
    pub freq: String,
    pub bank: String,
    pub finance_balance: String,
    pub total_price: String,
    pub vehicle_cost: String,
    pub ro_cost: String,
}

/// An export row that passed the eligibility filter, keyed by its parsed
/// purchase date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleRow {
    pub purchase_date: NaiveDate,
    pub customer: CustomerRecord,
    pub deal: DealRecord,
}

impl EligibleRow {
    pub fn to_payload(&self) -> DispatchPayload {
        DispatchPayload {
            customer_details: self.customer.clone(),
            deals: self.deal.clone(),
        }
    }
}

/// The unit sent to the webhook: one customer paired with one deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPayload {
    pub customer_details: CustomerRecord,
    pub deals: DealRecord,
}

/// Delivery statistics for one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SendStats {
    pub sent: usize,
    pub failed: usize,
}

impl std::fmt::Display for SendStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sent: {}, failed: {}", self.sent, self.failed)
    }
}

/// What one pass over the export did, for the caller and the logs
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub rows_parsed: usize,
    pub parse_errors: usize,
    pub eligible: usize,
    pub selected: usize,
    pub stats: SendStats,
    pub checkpoint: Option<NaiveDate>,
}
