//! Normalize functions - map raw export headers onto the canonical schema

use crate::forwarding::types::{CustomerRecord, DealRecord};
use anyhow::Result;
use csv::ReaderBuilder;
use std::collections::HashMap;
use tracing::{info, warn};

/// Canonical column for a cleaned raw header, if the header is one the DMS
/// export is known to emit. Matching is exact and case-sensitive.
fn canonical_field(header: &str) -> Option<&'static str> {
    Some(match header {
        "CUSTOMER-NO." | "CUSTOMER-ID" => "customer_id",
        "FIRST NAME" => "first_name",
        "LAST NAME" => "last_name",
        "COMPANY" => "company",
        "ADDRESS LINE.1" => "address_line1",
        "CITY" => "city",
        "PROVINCE/STATE" => "province_state",
        "POSTAL CODE" => "postal_code",
        "TEL.RESIDENCE" => "tel_residence",
        "TEL.BUSINESS" => "tel_business",
        "TEL.OTHER" => "tel_other",
        "E-MAIL" => "email",
        "BIRTH DATE" => "birth_date",
        "DEAL-ID" => "deal_id",
        "V.I.N." => "vehicle_vin",
        "PURCHASE DATE" => "purchase_date",
        "SELLING PRICE" => "selling_price",
        "PAYMENT TYPE" => "payment_type",
        "SMAN1" => "sman1",
        "TERM (MONTHS)" => "term_months",
        "RATE" => "rate",
        "IN-HOUSE FINANCE" => "in_house_finance",
        "PAYMENT" => "payment",
        "FREQUENCY" => "freq",
        "BANK" => "bank",
        "FINANCE BALANCE" => "finance_balance",
        "TOTAL PRICE" => "total_price",
        "VEHICLE COST" => "vehicle_cost",
        "RO COST" => "ro_cost",
        _ => return None,
    })
}

/// Strip surrounding whitespace, then any literal double quotes. The export
/// disables quoting at the parser level, so quoted-but-unparsed values still
/// carry their quote characters here.
fn clean(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}

/// Split the tab-delimited export into one (customer, deal) pair per data
/// line. No row is dropped at this stage; unmapped headers are ignored and
/// unmapped canonical fields come back as empty strings.
///
/// Returns the pairs plus the number of rows the reader failed to produce.
pub fn normalize(text: &str) -> Result<(Vec<(CustomerRecord, DealRecord)>, usize)> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let columns: Vec<Option<&'static str>> =
        headers.iter().map(|h| canonical_field(clean(h))).collect();

    let mut pairs = Vec::new();
    let mut parse_errors = 0;

    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                parse_errors += 1;
                if parse_errors <= 10 {
                    // Only log first 10 errors
                    warn!("Failed to read row {}: {}", idx, e);
                }
                continue;
            }
        };

        let mut raw: HashMap<&'static str, String> = HashMap::new();
        for (column, value) in columns.iter().copied().zip(record.iter()) {
            if let Some(field) = column {
                raw.insert(field, clean(value).to_string());
            }
        }

        pairs.push((CustomerRecord::from_raw(&raw), DealRecord::from_raw(&raw)));
    }

    info!(
        "Normalized {} record pairs from export ({} errors)",
        pairs.len(),
        parse_errors
    );

    Ok((pairs, parse_errors))
}

fn field(raw: &HashMap<&'static str, String>, name: &str) -> String {
    raw.get(name).cloned().unwrap_or_default()
}

impl CustomerRecord {
    fn from_raw(raw: &HashMap<&'static str, String>) -> Self {
        CustomerRecord {
            customer_id: field(raw, "customer_id"),
            first_name: field(raw, "first_name"),
            last_name: field(raw, "last_name"),
            company: field(raw, "company"),
            address_line1: field(raw, "address_line1"),
            city: field(raw, "city"),
            province_state: field(raw, "province_state"),
            postal_code: field(raw, "postal_code"),
            tel_residence: field(raw, "tel_residence"),
            tel_business: field(raw, "tel_business"),
            tel_other: field(raw, "tel_other"),
            email: field(raw, "email"),
            birth_date: field(raw, "birth_date"),
        }
    }
}

impl DealRecord {
    fn from_raw(raw: &HashMap<&'static str, String>) -> Self {
        DealRecord {
            deal_id: field(raw, "deal_id"),
            customer_id: field(raw, "customer_id"),
            vehicle_vin: field(raw, "vehicle_vin"),
            purchase_date: field(raw, "purchase_date"),
            selling_price: field(raw, "selling_price"),
            payment_type: field(raw, "payment_type"),
            sman1: field(raw, "sman1"),
            term_months: field(raw, "term_months"),
            rate: field(raw, "rate"),
            in_house_finance: field(raw, "in_house_finance"),
            payment: field(raw, "payment"),
            freq: field(raw, "freq"),
            bank: field(raw, "bank"),
            finance_balance: field(raw, "finance_balance"),
            total_price: field(raw, "total_price"),
            vehicle_cost: field(raw, "vehicle_cost"),
            ro_cost: field(raw, "ro_cost"),
        }
    }
}
