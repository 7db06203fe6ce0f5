//! Date functions
//!
//! Dates are serial numbers in the 1900 date system, where serial 1 is
//! 1900-01-01 and the phantom 1900-02-29 is counted.

use crate::invoke::CallContext;
use crate::value::AnyValue;
use chrono::NaiveDate;
use gridcalc_core::ErrorCode;

/// Serial number of a date (valid from 1900-03-01 onwards)
pub fn serial_from_date(date: NaiveDate) -> Option<f64> {
    // Counting from 1899-12-30 absorbs the phantom leap day
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    Some((date - base).num_days() as f64)
}

/// TODAY() - the current local date as a serial number
pub fn fn_today(_ctx: &CallContext, _args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let today = chrono::Local::now().date_naive();
    serial_from_date(today)
        .map(AnyValue::number)
        .ok_or(ErrorCode::Num)
}
