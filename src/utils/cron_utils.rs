//! Helpers for cron schedules.
//!
//! Head polling is driven by a cron expression per network; these helpers
//! turn the expression into an approximate polling interval.

use chrono::Utc;
use cron::Schedule;

/// Milliseconds between two consecutive occurrences of `cron_schedule`.
///
/// Returns `None` if the expression is invalid or does not fire twice.
pub fn get_cron_interval_ms(cron_schedule: &str) -> Option<i64> {
	let schedule = cron_schedule.parse::<Schedule>().ok()?;

	let now = Utc::now();
	let mut occurrences = schedule.after(&now).take(2);

	match (occurrences.next(), occurrences.next()) {
		(Some(first), Some(second)) => Some((second - first).num_milliseconds()),
		_ => None,
	}
}
