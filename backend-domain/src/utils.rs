use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate, TimeZone};

pub fn current_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Local-day key used for manifest numbering, e.g. `20260826`.
pub fn today_compact() -> String {
    Local::now().format("%Y%m%d").to_string()
}

pub fn today_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Millisecond bounds `[start, end)` of a local `YYYY-MM-DD` day.
pub fn day_bounds(date: &str) -> Result<(i64, i64)> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|err| anyhow!(err))?;
    let start = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid day start"))?;
    let end = start + chrono::Duration::days(1);
    let start_local = Local
        .from_local_datetime(&start)
        .earliest()
        .ok_or_else(|| anyhow!("unresolvable local time"))?;
    let end_local = Local
        .from_local_datetime(&end)
        .earliest()
        .ok_or_else(|| anyhow!("unresolvable local time"))?;
    Ok((
        start_local.timestamp_millis(),
        end_local.timestamp_millis(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_bounds_cover_24_hours() {
        let (start, end) = day_bounds("2026-08-26").expect("parse day");
        assert_eq!(end - start, 24 * 60 * 60 * 1000);
    }

    #[test]
    fn day_bounds_reject_garbage() {
        assert!(day_bounds("not-a-date").is_err());
    }
}
