use rusqlite::{params, Connection};

/// Dependent-service association: which container gets stopped and started
/// around a restore of the given source path.
pub fn get(conn: &Connection, path: &str) -> anyhow::Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT service_name FROM service_links WHERE path = ?")?;
    let mut rows = stmt.query_map(params![path], |row| row.get::<_, String>(0))?;
    Ok(rows.next().and_then(|r| r.ok()))
}

/// Passing `None` (or an empty name) clears the association.
pub fn set(conn: &Connection, path: &str, service_name: Option<&str>) -> anyhow::Result<()> {
    match service_name.filter(|s| !s.is_empty()) {
        Some(name) => {
            conn.execute(
                "INSERT INTO service_links (path, service_name) VALUES (?1, ?2)
                 ON CONFLICT(path) DO UPDATE SET service_name = excluded.service_name",
                params![path, name],
            )?;
        }
        None => {
            conn.execute("DELETE FROM service_links WHERE path = ?", params![path])?;
        }
    }
    Ok(())
}

pub fn get_all(conn: &Connection) -> anyhow::Result<std::collections::HashMap<String, String>> {
    let mut stmt = conn.prepare("SELECT path, service_name FROM service_links")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut map = std::collections::HashMap::new();
    for r in rows {
        let (path, name) = r?;
        map.insert(path, name);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::create_pool;
    use crate::db::migrate::migrate;
    use tempfile::TempDir;

    #[test]
    fn test_link_set_get_clear() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let pool = create_pool(&dir.path().join("test.db"));
        migrate(&pool, dir.path())?;
        let conn = pool.get()?;

        assert_eq!(get(&conn, "/host/data/db")?, None);

        set(&conn, "/host/data/db", Some("db1"))?;
        assert_eq!(get(&conn, "/host/data/db")?.as_deref(), Some("db1"));

        set(&conn, "/host/data/db", Some("db2"))?;
        assert_eq!(get(&conn, "/host/data/db")?.as_deref(), Some("db2"));

        set(&conn, "/host/data/db", None)?;
        assert_eq!(get(&conn, "/host/data/db")?, None);

        // Empty name clears too
        set(&conn, "/host/data/db", Some("db1"))?;
        set(&conn, "/host/data/db", Some(""))?;
        assert_eq!(get(&conn, "/host/data/db")?, None);
        Ok(())
    }
}
