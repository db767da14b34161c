//! Data access for the `users` table.
//!
//! Every call opens its own connection, runs one fixed query and closes the
//! connection again, whatever the outcome. There is no pool.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::{PgColumn, PgConnectOptions, PgConnection, PgRow, PgTypeKind};
use sqlx::{Column, Connection, Postgres, Row, TypeInfo, ValueRef};
use uuid::Uuid;

use common::config::DatabaseConfig;
use common::errors::{AppError, AppResult};
use common::models::UserRecord;

/// The one statement this service runs.
pub const FETCH_ALL_USERS_SQL: &str = "SELECT id, username, email FROM users";

/// Source of user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns every row of `users`, in the order the database produced them.
    ///
    /// An empty table is `Ok(vec![])`; deciding what that means is up to the
    /// caller.
    async fn fetch_all_users(&self) -> AppResult<Vec<UserRecord>>;
}

/// PostgreSQL-backed repository opening one connection per call.
pub struct PgUserRepository {
    options: PgConnectOptions,
}

impl PgUserRepository {
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.dbname);
        Self { options }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn fetch_all_users(&self) -> AppResult<Vec<UserRecord>> {
        let mut conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

        let result = query_users(&mut conn).await;

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "failed to close database connection");
        }

        if let Ok(users) = &result {
            tracing::debug!(count = users.len(), "users fetched");
        }
        result
    }
}

async fn query_users(conn: &mut PgConnection) -> AppResult<Vec<UserRecord>> {
    let rows = sqlx::query(FETCH_ALL_USERS_SQL)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

    rows.iter().map(row_to_record).collect()
}

/// Maps a row to a record keyed by the column names the result reported.
fn row_to_record(row: &PgRow) -> AppResult<UserRecord> {
    let mut record = UserRecord::new();
    for column in row.columns() {
        record.insert(column.name(), column_value(row, column)?);
    }
    Ok(record)
}

/// How a column's values are turned into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    /// Text on the wire but not a type sqlx knows as text (`citext`, enums).
    TextLike,
    Uuid,
    TimestampTz,
    Timestamp,
    Date,
    Time,
    Json,
}

fn column_kind(type_name: &str) -> Option<ColumnKind> {
    let kind = match type_name {
        "BOOL" => ColumnKind::Bool,
        "INT2" => ColumnKind::Int2,
        "INT4" => ColumnKind::Int4,
        "INT8" => ColumnKind::Int8,
        "FLOAT4" => ColumnKind::Float4,
        "FLOAT8" => ColumnKind::Float8,
        "NUMERIC" => ColumnKind::Numeric,
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => ColumnKind::Text,
        "citext" | "CITEXT" => ColumnKind::TextLike,
        "UUID" => ColumnKind::Uuid,
        "TIMESTAMPTZ" => ColumnKind::TimestampTz,
        "TIMESTAMP" => ColumnKind::Timestamp,
        "DATE" => ColumnKind::Date,
        "TIME" => ColumnKind::Time,
        "JSON" | "JSONB" => ColumnKind::Json,
        _ => return None,
    };
    Some(kind)
}

fn column_value(row: &PgRow, column: &PgColumn) -> AppResult<Value> {
    let raw = row
        .try_get_raw(column.ordinal())
        .map_err(|e| decode_error(column, e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_info = column.type_info();
    let kind = column_kind(type_info.name())
        .or_else(|| {
            matches!(type_info.kind(), PgTypeKind::Enum(_)).then_some(ColumnKind::TextLike)
        })
        .ok_or_else(|| AppError::UnsupportedColumnType {
            column: column.name().to_string(),
            type_name: type_info.name().to_string(),
        })?;

    let value = match kind {
        ColumnKind::Bool => Value::Bool(decode::<bool>(row, column)?),
        ColumnKind::Int2 => Value::from(decode::<i16>(row, column)?),
        ColumnKind::Int4 => Value::from(decode::<i32>(row, column)?),
        ColumnKind::Int8 => Value::from(decode::<i64>(row, column)?),
        // non-finite floats become null
        ColumnKind::Float4 => Value::from(f64::from(decode::<f32>(row, column)?)),
        ColumnKind::Float8 => Value::from(decode::<f64>(row, column)?),
        // kept as a string so no precision is lost
        ColumnKind::Numeric => Value::String(decode::<Decimal>(row, column)?.to_string()),
        ColumnKind::Text => Value::String(decode::<String>(row, column)?),
        ColumnKind::TextLike => Value::String(
            row.try_get_unchecked::<String, _>(column.ordinal())
                .map_err(|e| decode_error(column, e))?,
        ),
        ColumnKind::Uuid => Value::String(decode::<Uuid>(row, column)?.to_string()),
        ColumnKind::TimestampTz => {
            Value::String(decode::<DateTime<Utc>>(row, column)?.to_rfc3339())
        }
        ColumnKind::Timestamp => Value::String(
            decode::<NaiveDateTime>(row, column)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        ColumnKind::Date => Value::String(decode::<NaiveDate>(row, column)?.to_string()),
        ColumnKind::Time => Value::String(decode::<NaiveTime>(row, column)?.to_string()),
        ColumnKind::Json => decode::<Value>(row, column)?,
    };
    Ok(value)
}

fn decode<'r, T>(row: &'r PgRow, column: &PgColumn) -> AppResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<T, _>(column.ordinal())
        .map_err(|e| decode_error(column, e))
}

fn decode_error(column: &PgColumn, e: sqlx::Error) -> AppError {
    AppError::RowDecode {
        column: column.name().to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::AppConfig;
    use serde_json::json;

    fn unreachable_config() -> DatabaseConfig {
        DatabaseConfig {
            host: "127.0.0.1".into(),
            port: 1,
            user: "postgres".into(),
            password: String::new(),
            dbname: "disaster_platform".into(),
        }
    }

    #[tokio::test]
    async fn unreachable_database_is_a_connection_error() {
        let repository = PgUserRepository::new(&unreachable_config());

        let result = repository.fetch_all_users().await;

        assert!(
            matches!(result, Err(AppError::DatabaseConnection(_))),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn column_kinds_cover_common_user_columns() {
        let cases = [
            ("INT4", ColumnKind::Int4),
            ("INT8", ColumnKind::Int8),
            ("VARCHAR", ColumnKind::Text),
            ("CHAR", ColumnKind::Text),
            ("citext", ColumnKind::TextLike),
            ("NUMERIC", ColumnKind::Numeric),
            ("TIME", ColumnKind::Time),
            ("TIMESTAMPTZ", ColumnKind::TimestampTz),
            ("JSONB", ColumnKind::Json),
            ("UUID", ColumnKind::Uuid),
        ];
        for (type_name, kind) in cases {
            assert_eq!(column_kind(type_name), Some(kind), "{type_name}");
        }
    }

    #[test]
    fn unknown_column_types_have_no_kind() {
        assert_eq!(column_kind("INTERVAL"), None);
        assert_eq!(column_kind("BYTEA"), None);
    }

    // Tests below need a live server: they run when PG_HOST is set and
    // report themselves as skipped otherwise.
    async fn live_connection() -> Option<PgConnection> {
        if std::env::var("PG_HOST").is_err() {
            eprintln!("PG_HOST not set, skipping live PostgreSQL test");
            return None;
        }
        let config = AppConfig::load_with_service("users-service");
        let repository = PgUserRepository::new(&config.database);
        let conn = PgConnection::connect_with(&repository.options)
            .await
            .expect("PG_* variables must point at a reachable server");
        Some(conn)
    }

    #[tokio::test]
    async fn reads_rows_in_database_order() {
        let Some(mut conn) = live_connection().await else {
            return;
        };
        sqlx::query(
            "CREATE TEMP TABLE users (id INT4 PRIMARY KEY, username TEXT NOT NULL, email VARCHAR(255))",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        sqlx::query("INSERT INTO users VALUES (1, 'alice', 'a@x.com'), (2, 'bob', NULL)")
            .execute(&mut conn)
            .await
            .unwrap();

        let users = query_users(&mut conn).await.unwrap();

        assert_eq!(
            serde_json::to_value(&users).unwrap(),
            json!([
                {"id": 1, "username": "alice", "email": "a@x.com"},
                {"id": 2, "username": "bob", "email": null},
            ])
        );
        assert_eq!(
            users[0].columns().collect::<Vec<_>>(),
            vec!["id", "username", "email"]
        );
    }

    #[tokio::test]
    async fn empty_table_is_ok_and_empty() {
        let Some(mut conn) = live_connection().await else {
            return;
        };
        sqlx::query("CREATE TEMP TABLE users (id INT4, username TEXT, email TEXT)")
            .execute(&mut conn)
            .await
            .unwrap();

        let users = query_users(&mut conn).await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn missing_column_is_a_query_error() {
        let Some(mut conn) = live_connection().await else {
            return;
        };
        sqlx::query("CREATE TEMP TABLE users (id INT4, username TEXT)")
            .execute(&mut conn)
            .await
            .unwrap();

        let result = query_users(&mut conn).await;
        assert!(matches!(result, Err(AppError::DatabaseQuery(_))));
    }

    #[tokio::test]
    async fn maps_supported_column_types() {
        let Some(mut conn) = live_connection().await else {
            return;
        };
        let row = sqlx::query(
            "SELECT true AS flag, 2::int2 AS small, 3::int8 AS big, 1.5::float8 AS ratio, \
             'x'::char(2) AS code, '6f1c3e4a-0000-4000-8000-000000000001'::uuid AS uid, \
             '2024-05-01T08:30:00Z'::timestamptz AS created_at, \
             '2024-05-01 08:30:00'::timestamp AS local_at, '2024-05-01'::date AS day, \
             '08:30:15'::time AS opens_at, 1234.50::numeric(8, 2) AS balance, \
             '{\"a\": [1, 2]}'::jsonb AS extra, NULL::text AS nothing",
        )
        .fetch_one(&mut conn)
        .await
        .unwrap();

        let record = row_to_record(&row).unwrap();

        assert_eq!(record.get("flag"), Some(&json!(true)));
        assert_eq!(record.get("small"), Some(&json!(2)));
        assert_eq!(record.get("big"), Some(&json!(3)));
        assert_eq!(record.get("ratio"), Some(&json!(1.5)));
        assert_eq!(record.get("code"), Some(&json!("x ")));
        assert_eq!(
            record.get("uid"),
            Some(&json!("6f1c3e4a-0000-4000-8000-000000000001"))
        );
        assert_eq!(
            record.get("created_at"),
            Some(&json!("2024-05-01T08:30:00+00:00"))
        );
        assert_eq!(record.get("local_at"), Some(&json!("2024-05-01T08:30:00")));
        assert_eq!(record.get("day"), Some(&json!("2024-05-01")));
        assert_eq!(record.get("opens_at"), Some(&json!("08:30:15")));
        assert_eq!(record.get("balance"), Some(&json!("1234.50")));
        assert_eq!(record.get("extra"), Some(&json!({"a": [1, 2]})));
        assert_eq!(record.get("nothing"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn maps_citext_and_enum_columns_as_strings() {
        let Some(mut conn) = live_connection().await else {
            return;
        };
        sqlx::query("CREATE EXTENSION IF NOT EXISTS citext")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("CREATE TYPE pg_temp.user_role AS ENUM ('admin', 'member')")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TEMP TABLE users (id INT4, username TEXT, email CITEXT, role pg_temp.user_role)",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        sqlx::query("INSERT INTO users VALUES (1, 'alice', 'A@x.com', 'admin')")
            .execute(&mut conn)
            .await
            .unwrap();

        let users = query_users(&mut conn).await.unwrap();
        assert_eq!(users[0].get("email"), Some(&json!("A@x.com")));

        let row = sqlx::query("SELECT role FROM users")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        let record = row_to_record(&row).unwrap();
        assert_eq!(record.get("role"), Some(&json!("admin")));
    }

    #[tokio::test]
    async fn unsupported_column_type_is_reported() {
        let Some(mut conn) = live_connection().await else {
            return;
        };
        sqlx::query("CREATE TEMP TABLE users (id INT4, username TEXT, email INTERVAL)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO users VALUES (1, 'alice', '1 day')")
            .execute(&mut conn)
            .await
            .unwrap();

        let result = query_users(&mut conn).await;
        assert!(matches!(
            result,
            Err(AppError::UnsupportedColumnType { ref column, ref type_name })
                if column == "email" && type_name == "INTERVAL"
        ));
    }
}
