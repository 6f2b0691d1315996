use crate::models::settings;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const KEY_FREQUENCY: &str = "schedule_frequency";
pub const KEY_TIME: &str = "schedule_time";
pub const KEY_LAST_RUN_DATE: &str = "last_run_date";

pub const DEFAULT_TIME: &str = "03:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Manual,
    Daily,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Manual => "manual",
            Frequency::Daily => "daily",
        }
    }

    /// Unknown values fall back to manual so a corrupt setting never
    /// triggers automatic runs.
    pub fn parse(s: &str) -> Self {
        match s {
            "daily" => Frequency::Daily,
            _ => Frequency::Manual,
        }
    }
}

/// Scheduler state, persisted as individual settings keys.
/// `last_run_date` is the once-per-day idempotency guard: the scheduler
/// only advances it after a cycle whose local snapshot succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub frequency: Frequency,
    /// Local time of day, minute granularity ("HH:MM").
    pub time: String,
    /// "YYYY-MM-DD" of the last automatic run, empty if never.
    pub last_run_date: String,
}

pub fn load(conn: &Connection) -> anyhow::Result<Schedule> {
    Ok(Schedule {
        frequency: Frequency::parse(&settings::get_or(conn, KEY_FREQUENCY, "manual")?),
        time: settings::get_or(conn, KEY_TIME, DEFAULT_TIME)?,
        last_run_date: settings::get_or(conn, KEY_LAST_RUN_DATE, "")?,
    })
}

pub fn update(conn: &Connection, frequency: Frequency, time: &str) -> anyhow::Result<()> {
    settings::set(conn, KEY_FREQUENCY, frequency.as_str())?;
    settings::set(conn, KEY_TIME, time)?;
    Ok(())
}

pub fn mark_ran(conn: &Connection, date: &str) -> anyhow::Result<()> {
    settings::set(conn, KEY_LAST_RUN_DATE, date)
}

/// Validates an "HH:MM" time-of-day string. The scheduler compares the
/// current minute against this value with plain string equality, so
/// anything else would simply never fire.
pub fn valid_time_of_day(s: &str) -> bool {
    let Some((h, m)) = s.split_once(':') else {
        return false;
    };
    if h.len() != 2 || m.len() != 2 {
        return false;
    }
    let (Ok(h), Ok(m)) = (h.parse::<u8>(), m.parse::<u8>()) else {
        return false;
    };
    h < 24 && m < 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::create_pool;
    use crate::db::migrate::migrate;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_unset() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let pool = create_pool(&dir.path().join("test.db"));
        migrate(&pool, dir.path())?;
        let conn = pool.get()?;

        let s = load(&conn)?;
        assert_eq!(s.frequency, Frequency::Manual);
        assert_eq!(s.time, "03:00");
        assert_eq!(s.last_run_date, "");
        Ok(())
    }

    #[test]
    fn test_update_and_mark_ran() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let pool = create_pool(&dir.path().join("test.db"));
        migrate(&pool, dir.path())?;
        let conn = pool.get()?;

        update(&conn, Frequency::Daily, "04:30")?;
        mark_ran(&conn, "2024-06-01")?;

        let s = load(&conn)?;
        assert_eq!(s.frequency, Frequency::Daily);
        assert_eq!(s.time, "04:30");
        assert_eq!(s.last_run_date, "2024-06-01");
        Ok(())
    }

    #[test]
    fn test_unknown_frequency_is_manual() {
        assert_eq!(Frequency::parse("hourly"), Frequency::Manual);
        assert_eq!(Frequency::parse(""), Frequency::Manual);
        assert_eq!(Frequency::parse("daily"), Frequency::Daily);
    }

    #[test]
    fn test_valid_time_of_day() {
        assert!(valid_time_of_day("00:00"));
        assert!(valid_time_of_day("23:59"));
        assert!(valid_time_of_day("03:00"));
        assert!(!valid_time_of_day("24:00"));
        assert!(!valid_time_of_day("12:60"));
        assert!(!valid_time_of_day("3:00"));
        assert!(!valid_time_of_day("0300"));
        assert!(!valid_time_of_day(""));
    }
}
