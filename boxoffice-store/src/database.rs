use boxoffice_core::StoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

pub(crate) const SERIALIZATION_FAILURE: &str = "40001";
pub(crate) const DEADLOCK_DETECTED: &str = "40P01";
pub(crate) const UNIQUE_VIOLATION: &str = "23505";
pub(crate) const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Unique index that backs "at most one booking per seat"
pub(crate) const BOOKING_SEAT_KEY: &str = "bookings_seat_id_key";

/// SQLSTATE and constraint name of a database-side error, if it is one
pub(crate) fn db_error_parts(err: &sqlx::Error) -> Option<(String, Option<String>)> {
    match err {
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| (code.into_owned(), db.constraint().map(str::to_owned))),
        _ => None,
    }
}

pub(crate) fn classify(code: &str, constraint: Option<&str>, message: String) -> StoreError {
    match code {
        SERIALIZATION_FAILURE | DEADLOCK_DETECTED => StoreError::SerializationFailure,
        UNIQUE_VIOLATION if constraint == Some(BOOKING_SEAT_KEY) => StoreError::SerializationFailure,
        UNIQUE_VIOLATION | FOREIGN_KEY_VIOLATION => StoreError::Conflict(message),
        _ => StoreError::Backend(message),
    }
}

pub(crate) fn map_sqlx(err: sqlx::Error) -> StoreError {
    match db_error_parts(&err) {
        Some((code, constraint)) => classify(&code, constraint.as_deref(), err.to_string()),
        None => StoreError::Backend(err.to_string()),
    }
}
