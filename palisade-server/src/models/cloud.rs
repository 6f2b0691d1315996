use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

/// Replication target. At most one row exists (id = 1); saving overwrites.
/// Presence of the row is the signal that cloud replication is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub provider: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

fn row_to_cloud(row: &Row) -> rusqlite::Result<CloudConfig> {
    Ok(CloudConfig {
        provider: row.get("provider")?,
        bucket: row.get("bucket")?,
        access_key: row.get("access_key")?,
        secret_key: row.get("secret_key")?,
        endpoint: row.get("endpoint")?,
        region: row.get("region")?,
    })
}

pub fn get(conn: &Connection) -> anyhow::Result<Option<CloudConfig>> {
    let mut stmt = conn.prepare("SELECT * FROM cloud_config WHERE id = 1")?;
    let mut rows = stmt.query_map([], |row| row_to_cloud(row))?;
    Ok(rows.next().and_then(|r| r.ok()))
}

pub fn set(conn: &Connection, cfg: &CloudConfig) -> anyhow::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO cloud_config (id, provider, bucket, access_key, secret_key, endpoint, region)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            cfg.provider,
            cfg.bucket,
            cfg.access_key,
            cfg.secret_key,
            cfg.endpoint,
            cfg.region,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::create_pool;
    use crate::db::migrate::migrate;
    use tempfile::TempDir;

    fn sample(bucket: &str) -> CloudConfig {
        CloudConfig {
            provider: "s3".into(),
            bucket: bucket.into(),
            access_key: "AK".into(),
            secret_key: "SK".into(),
            endpoint: Some("minio.local:9000".into()),
            region: None,
        }
    }

    #[test]
    fn test_single_row_overwrite() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let pool = create_pool(&dir.path().join("test.db"));
        migrate(&pool, dir.path())?;
        let conn = pool.get()?;

        assert!(get(&conn)?.is_none());

        set(&conn, &sample("bucket-a"))?;
        set(&conn, &sample("bucket-b"))?;

        let count: i64 = conn.query_row("SELECT count(*) FROM cloud_config", [], |r| r.get(0))?;
        assert_eq!(count, 1);

        let cfg = get(&conn)?.expect("row present");
        assert_eq!(cfg.bucket, "bucket-b");
        assert_eq!(cfg.endpoint.as_deref(), Some("minio.local:9000"));
        assert_eq!(cfg.region, None);
        Ok(())
    }
}
