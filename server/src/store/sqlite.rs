use crate::config::DatabaseConfig;
use crate::models::{AuthId, Device, DeviceStatus};
use crate::store::{DeviceStore, StoreError};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Arguments, SqlitePool};
use std::str::FromStr;

pub(super) static MIGRATOR: Migrator = sqlx::migrate!();

const SELECT_DEVICES: &str = r#"SELECT
        id, device_id, pubkey, device_identity, status, request_time
    FROM devices"#;

pub struct SqliteDeviceStore {
    pool: SqlitePool,
}

impl SqliteDeviceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("Failed to parse SQLite url: '{}'", config.url))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", config.url))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .with_context(|| "Failed to run database migrations")
    }
}

/// SQLite has no unsigned 64-bit integers, LIMIT/OFFSET beyond `i64::MAX` saturate
fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl DeviceStore for SqliteDeviceStore {
    async fn get_devices(
        &self,
        skip: u64,
        limit: u64,
        status: Option<DeviceStatus>,
    ) -> Result<Vec<Device>, StoreError> {
        let mut sql = String::from(SELECT_DEVICES);
        let mut args = SqliteArguments::default();
        if let Some(status) = status {
            args.add(status).map_err(sqlx::Error::Encode)?;
            sql.push_str(&format!(" WHERE status = ?{}", args.len()));
        }
        args.add(to_sql_int(limit)).map_err(sqlx::Error::Encode)?;
        args.add(to_sql_int(skip)).map_err(sqlx::Error::Encode)?;
        sql.push_str(&format!(
            " ORDER BY request_time, id LIMIT ?{} OFFSET ?{}",
            args.len() - 1,
            args.len()
        ));
        let devices = sqlx::query_as_with::<_, Device, _>(&sql, args)
            .fetch_all(&self.pool)
            .await?;
        Ok(devices)
    }

    async fn get_device(&self, id: &AuthId) -> Result<Device, StoreError> {
        let sql = format!("{SELECT_DEVICES} WHERE id = ?1");
        sqlx::query_as::<_, Device>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn put_device(&self, device: &Device) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO devices (id, device_id, pubkey, device_identity, status, request_time)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                device_id = excluded.device_id,
                pubkey = excluded.pubkey,
                device_identity = excluded.device_identity,
                status = excluded.status,
                request_time = excluded.request_time"#,
        )
        .bind(&device.id)
        .bind(&device.device_id)
        .bind(&device.key)
        .bind(&device.device_identity)
        .bind(device.status)
        .bind(device.request_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_device(&self, id: &AuthId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
