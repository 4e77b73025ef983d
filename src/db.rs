use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::LoadError;
use crate::models::Record;

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Reads every call record from `table`, ordered by `call_id`. Read-only.
pub async fn fetch_records(pool: &PgPool, table: &str) -> Result<Vec<Record>, LoadError> {
    if !is_valid_table_name(table) {
        return Err(LoadError::InvalidTable(table.to_string()));
    }

    let query = format!(
        "SELECT call_id, agent, department, answered, resolved, \
         satisfaction_rating, speed_of_answer, avg_talk_duration, call_date, call_hour \
         FROM {table} ORDER BY call_id"
    );
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let hour: i32 = row.try_get("call_hour")?;
        let hour = u8::try_from(hour)
            .ok()
            .filter(|hour| *hour <= 23)
            .ok_or_else(|| LoadError::InvalidHour {
                row: index + 1,
                value: hour.to_string(),
            })?;
        let date: NaiveDate = row.try_get("call_date")?;

        records.push(Record {
            call_id: row.try_get("call_id")?,
            agent: row.try_get("agent")?,
            department: row.try_get("department")?,
            answered: row.try_get("answered")?,
            resolved: row.try_get("resolved")?,
            satisfaction_rating: row.try_get("satisfaction_rating")?,
            speed_of_answer: row.try_get("speed_of_answer")?,
            avg_talk_duration: row.try_get("avg_talk_duration")?,
            date,
            hour,
        });
    }

    info!(table, rows = records.len(), "fetched call records from Postgres");
    Ok(records)
}

/// Accepts `name` or `schema.name` built from ASCII identifiers.
fn is_valid_table_name(table: &str) -> bool {
    let parts: Vec<&str> = table.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_plain_identifiers() {
        assert!(is_valid_table_name("calls"));
        assert!(is_valid_table_name("call_center.calls_2021"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("calls; DROP TABLE calls"));
        assert!(!is_valid_table_name("a.b.c"));
        assert!(!is_valid_table_name("1calls"));
    }
}
