use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Connection, PgConnection};
use tracing::debug;

use super::{BirthdayStore, Database, StoreError};
use crate::models::BirthdayRecord;

type BirthdayRow = (i32, String, NaiveDate, Option<String>, Option<String>);

impl Database {
    /// Get all records with a birthday on a specific month and day
    async fn fetch_birthdays_on(
        &self,
        month: i32,
        day: i32,
    ) -> Result<Vec<BirthdayRecord>, StoreError> {
        let mut conn = self.connect().await?;

        let rows: Result<Vec<BirthdayRow>, sqlx::Error> = sqlx::query_as(
            "SELECT id, name, date, email, status FROM birthdays \
             WHERE EXTRACT(MONTH FROM date)::int = $1 AND EXTRACT(DAY FROM date)::int = $2",
        )
        .bind(month)
        .bind(day)
        .fetch_all(&mut conn)
        .await;

        close(conn).await;

        let rows = rows.map_err(StoreError::Query)?;
        debug!("Fetched {} record(s) for {}/{}", rows.len(), day, month);

        Ok(rows
            .into_iter()
            .map(|(id, name, date, email, status)| BirthdayRecord {
                id,
                name,
                date,
                email: email.filter(|e| !e.trim().is_empty()),
                status,
            })
            .collect())
    }

    /// Get every registered email address
    async fn fetch_registered_emails(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connect().await?;

        let rows: Result<Vec<(String,)>, sqlx::Error> =
            sqlx::query_as("SELECT email FROM birthdays WHERE email IS NOT NULL AND email <> ''")
                .fetch_all(&mut conn)
                .await;

        close(conn).await;

        Ok(rows
            .map_err(StoreError::Query)?
            .into_iter()
            .map(|(email,)| email)
            .collect())
    }
}

/// Close a connection gracefully; a failed goodbye only drops the socket
async fn close(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        debug!("Database connection closed uncleanly: {}", e);
    }
}

#[async_trait]
impl BirthdayStore for Database {
    async fn birthdays_on(
        &self,
        month: i32,
        day: i32,
    ) -> Result<Vec<BirthdayRecord>, StoreError> {
        self.fetch_birthdays_on(month, day).await
    }

    async fn registered_emails(&self) -> Result<Vec<String>, StoreError> {
        self.fetch_registered_emails().await
    }
}
