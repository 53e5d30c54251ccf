//! Background task scheduler for payment reminders
//!
//! Runs a reminder pass once at startup and then daily at a fixed UTC hour.
//! Configured via environment variables:
//!
//! - `SUBHUB_REMINDERS`: set to `off` to disable the scheduler
//! - `SUBHUB_REMINDER_DAYS`: how many days ahead to remind (default: 7)
//! - `SUBHUB_REMINDER_HOUR`: UTC hour of the daily run (default: 9)
//!
//! A failed run is logged and retried at the next scheduled time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use subhub_core::reminders::DEFAULT_DAYS_BEFORE;
use subhub_core::{Database, Notifier, ReminderDispatcher, SystemClock};

/// Default UTC hour for the daily run
pub const DEFAULT_REMINDER_HOUR: u32 = 9;

/// Configuration for scheduled reminders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderScheduleConfig {
    /// Remind about payments due within this many days
    pub days_before: u32,
    /// UTC hour of the daily run (0-23)
    pub hour: u32,
}

impl Default for ReminderScheduleConfig {
    fn default() -> Self {
        Self {
            days_before: DEFAULT_DAYS_BEFORE,
            hour: DEFAULT_REMINDER_HOUR,
        }
    }
}

impl ReminderScheduleConfig {
    /// Parse configuration from environment variables
    ///
    /// Returns None if scheduling is disabled (SUBHUB_REMINDERS=off).
    /// Invalid values fall back to the defaults.
    pub fn from_env() -> Option<Self> {
        if std::env::var("SUBHUB_REMINDERS")
            .map(|v| v.eq_ignore_ascii_case("off"))
            .unwrap_or(false)
        {
            return None;
        }

        let days_before = match std::env::var("SUBHUB_REMINDER_DAYS") {
            Ok(v) => match v.parse::<u32>() {
                Ok(days) if days > 0 => days,
                _ => {
                    warn!(value = %v, "Invalid SUBHUB_REMINDER_DAYS, using default");
                    DEFAULT_DAYS_BEFORE
                }
            },
            Err(_) => DEFAULT_DAYS_BEFORE,
        };

        let hour = match std::env::var("SUBHUB_REMINDER_HOUR") {
            Ok(v) => match v.parse::<u32>() {
                Ok(hour) if hour < 24 => hour,
                _ => {
                    warn!(value = %v, "Invalid SUBHUB_REMINDER_HOUR, using default");
                    DEFAULT_REMINDER_HOUR
                }
            },
            Err(_) => DEFAULT_REMINDER_HOUR,
        };

        Some(Self { days_before, hour })
    }
}

/// Time from `now` until the next `hour`:00 UTC (strictly in the future)
pub fn duration_until_next_run(now: DateTime<Utc>, hour: u32) -> Duration {
    let Some(today) = now.date_naive().and_hms_opt(hour.min(23), 0, 0) else {
        return Duration::from_secs(24 * 3600);
    };
    let mut next = today.and_utc();
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or_default()
}

/// Start the reminder scheduler as a background task
pub fn start_reminder_scheduler(db: Database, notifier: Notifier, config: ReminderScheduleConfig) {
    info!(
        "Starting reminder scheduler: daily at {:02}:00 UTC, {} days ahead",
        config.hour, config.days_before
    );

    tokio::spawn(async move {
        loop {
            run_scheduled_reminders(&db, &notifier, config.days_before).await;

            let wait = duration_until_next_run(Utc::now(), config.hour);
            info!("Next reminder run in {} minutes", wait.as_secs() / 60);
            tokio::time::sleep(wait).await;
        }
    });
}

/// Run a single scheduled reminder pass
async fn run_scheduled_reminders(db: &Database, notifier: &Notifier, days_before: u32) {
    info!("Running scheduled reminders...");

    let clock = SystemClock;
    let result = match ReminderDispatcher::new(db, notifier, &clock)
        .dispatch(days_before)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            error!("Scheduled reminder run failed: {}", e);
            return;
        }
    };

    // Log to audit (as "scheduler" user)
    if let Err(e) = db.log_audit(
        "scheduler",
        "reminders_scheduled",
        Some("reminders"),
        None,
        Some(&format!(
            "checked={}, sent={}",
            result.checked, result.sent
        )),
    ) {
        warn!("Failed to log scheduled reminders to audit: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_config_from_env() {
        // Env vars are process-wide, so the cases run in one test
        std::env::remove_var("SUBHUB_REMINDERS");
        std::env::remove_var("SUBHUB_REMINDER_DAYS");
        std::env::remove_var("SUBHUB_REMINDER_HOUR");
        assert_eq!(
            ReminderScheduleConfig::from_env(),
            Some(ReminderScheduleConfig::default())
        );

        std::env::set_var("SUBHUB_REMINDER_DAYS", "3");
        std::env::set_var("SUBHUB_REMINDER_HOUR", "22");
        assert_eq!(
            ReminderScheduleConfig::from_env(),
            Some(ReminderScheduleConfig {
                days_before: 3,
                hour: 22
            })
        );

        // Zero days and out-of-range hours fall back to defaults
        std::env::set_var("SUBHUB_REMINDER_DAYS", "0");
        std::env::set_var("SUBHUB_REMINDER_HOUR", "24");
        assert_eq!(
            ReminderScheduleConfig::from_env(),
            Some(ReminderScheduleConfig::default())
        );

        std::env::set_var("SUBHUB_REMINDERS", "OFF");
        assert!(ReminderScheduleConfig::from_env().is_none());

        std::env::remove_var("SUBHUB_REMINDERS");
        std::env::remove_var("SUBHUB_REMINDER_DAYS");
        std::env::remove_var("SUBHUB_REMINDER_HOUR");
    }

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 7, 30, 0).unwrap();
        assert_eq!(
            duration_until_next_run(now, 9),
            Duration::from_secs(90 * 60)
        );
    }

    #[test]
    fn test_next_run_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
        assert_eq!(
            duration_until_next_run(now, 9),
            Duration::from_secs(24 * 3600)
        );

        let late = Utc.with_ymd_and_hms(2024, 6, 15, 23, 0, 0).unwrap();
        assert_eq!(
            duration_until_next_run(late, 0),
            Duration::from_secs(3600)
        );
    }
}
