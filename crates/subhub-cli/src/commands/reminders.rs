//! Reminder command implementation

use anyhow::{bail, Result};
use subhub_core::db::Database;
use subhub_core::models::ReminderRunResult;
use subhub_core::{Clock, NotificationTransport, Notifier, ReminderDispatcher, SystemClock};

/// Run one reminder pass with the given transport and clock
pub async fn run_reminders<T>(
    db: &Database,
    transport: &T,
    clock: &dyn Clock,
    days: u32,
) -> Result<ReminderRunResult>
where
    T: NotificationTransport + ?Sized,
{
    if days == 0 {
        bail!("--days must be at least 1");
    }
    let result = ReminderDispatcher::new(db, transport, clock)
        .dispatch(days)
        .await?;
    Ok(result)
}

pub async fn cmd_remind(db: &Database, days: u32) -> Result<()> {
    let notifier = Notifier::from_env()?;
    println!(
        "📬 Sending reminders for payments due in the next {} day(s) via {}...",
        days,
        notifier.name()
    );

    let result = run_reminders(db, &notifier, &SystemClock, days).await?;

    println!(
        "   Checked {} subscription(s), sent {} reminder(s)",
        result.checked, result.sent
    );
    if result.sent < result.checked {
        println!("   💡 Skipped ones were already reminded today or failed to send (see logs)");
    }
    Ok(())
}
