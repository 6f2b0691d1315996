use rusqlite::{params, Connection};

pub fn get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?")?;
    let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
    Ok(rows.next().and_then(|r| r.ok()))
}

pub fn get_or(conn: &Connection, key: &str, default: &str) -> anyhow::Result<String> {
    Ok(get(conn, key)?.unwrap_or_else(|| default.to_string()))
}

pub fn set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::create_pool;
    use crate::db::migrate::migrate;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_roundtrip() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let pool = create_pool(&dir.path().join("test.db"));
        migrate(&pool, dir.path())?;
        let conn = pool.get()?;

        assert_eq!(get(&conn, "retention_keep_latest")?, None);
        assert_eq!(get_or(&conn, "retention_keep_latest", "5")?, "5");

        set(&conn, "retention_keep_latest", "10")?;
        assert_eq!(get(&conn, "retention_keep_latest")?.as_deref(), Some("10"));

        // Upsert overwrites
        set(&conn, "retention_keep_latest", "3")?;
        assert_eq!(get(&conn, "retention_keep_latest")?.as_deref(), Some("3"));
        Ok(())
    }
}
