//! The automatic-backup loop: one tick per minute for the process lifetime.
//!
//! A tick fires the backup cycle when the current local time-of-day equals
//! the configured "HH:MM" exactly and no automatic run has happened today.
//! `last_run_date` advances only after a cycle whose local snapshot
//! succeeded, so a failed cycle gets no retry until the same minute next
//! day, and a process that sleeps through the minute skips the day. Tick
//! errors are logged; the loop itself never terminates.

use crate::models::schedule::{self, Frequency, Schedule};
use crate::services::orchestrator;
use crate::state::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub fn start_scheduler(state: Arc<AppState>, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = tick(&state).await {
                        tracing::error!("Scheduler tick failed: {e:#}");
                    }
                }
            }
        }
        tracing::info!("Scheduler stopped");
    });
}

async fn tick(state: &Arc<AppState>) -> anyhow::Result<()> {
    let db = state.db.clone();
    let sched = tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        schedule::load(&conn)
    })
    .await??;

    let now = chrono::Local::now();
    let current_minute = now.format("%H:%M").to_string();
    let today = now.format("%Y-%m-%d").to_string();

    if !is_due(&sched, &current_minute, &today) {
        return Ok(());
    }

    tracing::info!(date = %today, time = %current_minute, "Starting scheduled backup cycle");
    let result = orchestrator::run_backup_cycle(state).await;

    if result.local_success && result.sources > 0 {
        let db = state.db.clone();
        let date = today.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            schedule::mark_ran(&conn, &date)
        })
        .await??;
        tracing::info!(date = %today, "Scheduled cycle succeeded, next automatic run tomorrow");
    } else if result.sources == 0 {
        tracing::info!("Scheduled cycle had nothing to protect");
    } else {
        tracing::warn!(
            error = %result.error.as_deref().unwrap_or("unknown"),
            "Scheduled cycle failed, no retry until the same time tomorrow"
        );
    }
    Ok(())
}

/// Minute-granularity string equality, not a range: a tick that lands on
/// any other minute does nothing, and there is no catch-up.
fn is_due(sched: &Schedule, current_minute: &str, today: &str) -> bool {
    sched.frequency == Frequency::Daily
        && sched.time == current_minute
        && sched.last_run_date != today
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily(time: &str, last_run_date: &str) -> Schedule {
        Schedule {
            frequency: Frequency::Daily,
            time: time.into(),
            last_run_date: last_run_date.into(),
        }
    }

    #[test]
    fn test_due_on_matching_minute() {
        assert!(is_due(&daily("03:00", ""), "03:00", "2024-06-01"));
    }

    #[test]
    fn test_not_due_when_manual() {
        let s = Schedule {
            frequency: Frequency::Manual,
            time: "03:00".into(),
            last_run_date: String::new(),
        };
        assert!(!is_due(&s, "03:00", "2024-06-01"));
    }

    #[test]
    fn test_not_due_on_other_minutes() {
        assert!(!is_due(&daily("03:00", ""), "02:59", "2024-06-01"));
        assert!(!is_due(&daily("03:00", ""), "03:01", "2024-06-01"));
    }

    #[test]
    fn test_at_most_once_per_day() {
        // First tick in the matching minute runs...
        assert!(is_due(&daily("03:00", ""), "03:00", "2024-06-01"));
        // ...and once last_run_date is stamped, later ticks in the same
        // minute (and the rest of the day) do not.
        assert!(!is_due(&daily("03:00", "2024-06-01"), "03:00", "2024-06-01"));
        // The next day it is due again.
        assert!(is_due(&daily("03:00", "2024-06-01"), "03:00", "2024-06-02"));
    }

    #[test]
    fn test_failed_run_leaves_guard_unset() {
        // A failed cycle never calls mark_ran, so the schedule still
        // matches within the same minute and again the next day.
        let s = daily("03:00", "");
        assert!(is_due(&s, "03:00", "2024-06-01"));
        assert!(is_due(&s, "03:00", "2024-06-02"));
    }
}
