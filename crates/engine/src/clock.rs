//! The store's clock.
//!
//! Rows written by one batch are stamped with a single timestamp read from
//! the database inside the batch's transaction, so the application host's
//! clock never leaks into validity windows.

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, Statement};

use crate::{EngineError, ResultEngine};

const CONTEXT: &str = "selecting now";

fn now_statement(backend: DbBackend) -> Statement {
    let sql = match backend {
        DbBackend::Postgres => {
            r#"SELECT to_char(now() AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS.US"Z"') AS now"#
        }
        DbBackend::MySql => "SELECT DATE_FORMAT(UTC_TIMESTAMP(6), '%Y-%m-%dT%H:%i:%s.%fZ') AS now",
        _ => "SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now') AS now",
    };
    Statement::from_string(backend, sql)
}

fn parse_now(raw: &str) -> ResultEngine<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| EngineError::InvalidDate(format!("store returned {raw:?}: {err}")))
}

/// Current time as seen by the store behind `conn`.
pub(crate) async fn now<C: ConnectionTrait>(conn: &C) -> ResultEngine<DateTime<Utc>> {
    tracing::debug!("selecting now");
    let row = conn
        .query_one(now_statement(conn.get_database_backend()))
        .await
        .map_err(EngineError::store(CONTEXT))?
        .ok_or_else(|| EngineError::Store {
            context: CONTEXT,
            source: DbErr::RecordNotFound("now".to_string()),
        })?;
    let raw: String = row.try_get("", "now").map_err(EngineError::store(CONTEXT))?;
    let now = parse_now(&raw)?;
    tracing::debug!(%now, "selected now");
    Ok(now)
}
