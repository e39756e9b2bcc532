//! Eligibility filter - the purchase-date inclusion rule
//! Pure functions of the record and the current date, no state

use crate::forwarding::types::DealRecord;
use chrono::{Datelike, Months, NaiveDate};

/// The DMS emits this literal when a deal has no purchase date yet.
const PLACEHOLDER_DATE: &str = "  /  /";

const PURCHASE_DATE_FORMAT: &str = "%m/%d/%Y";

/// How far back a purchase may be and still get forwarded.
const WINDOW_MONTHS: u32 = 6;

/// Parse the deal's purchase date, rejecting the empty and placeholder
/// values the export uses for "no date".
pub fn purchase_date(deal: &DealRecord) -> Option<NaiveDate> {
    let raw = deal.purchase_date.as_str();
    if raw.is_empty() || raw == PLACEHOLDER_DATE {
        return None;
    }
    NaiveDate::parse_from_str(raw.trim(), PURCHASE_DATE_FORMAT).ok()
}

/// The purchase date, if the deal falls inside the forwarding window:
/// purchased this calendar year and no more than six months ago.
pub fn eligible_date(deal: &DealRecord, today: NaiveDate) -> Option<NaiveDate> {
    let date = purchase_date(deal)?;
    if date.year() != today.year() {
        return None;
    }
    let cutoff = today.checked_sub_months(Months::new(WINDOW_MONTHS))?;
    if date < cutoff {
        return None;
    }
    Some(date)
}

pub fn is_eligible(deal: &DealRecord, today: NaiveDate) -> bool {
    eligible_date(deal, today).is_some()
}
