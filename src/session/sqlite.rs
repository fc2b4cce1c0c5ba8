// Sqlite-backed session store (feature "database").
//
// Answers, tasks, and warnings are kept as JSON text columns; the codec
// lives entirely inside this module and never leaks past the store boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Row, SqlitePool};
use tracing::info;

use super::store::{SessionStore, StoreError};
use super::types::{Session, Task};

pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (creating if necessary) the database and run migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        auto_migrate: bool,
    ) -> Result<Self, StoreError> {
        if !sqlx::Sqlite::database_exists(database_url)
            .await
            .map_err(backend)?
        {
            info!("Creating session database at {}", database_url);
            sqlx::Sqlite::create_database(database_url)
                .await
                .map_err(backend)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(backend)?;

        if auto_migrate {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            info!("Session store migrations completed");
        }

        Ok(Self { pool })
    }

    pub async fn shutdown(&self) {
        self.pool.close().await;
    }

    fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<Session, StoreError> {
        let answers_json: String = row.get("answers");
        let tasks_json: String = row.get("tasks");
        let warnings_json: String = row.get("warnings");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let version: i64 = row.get("version");

        Ok(Session {
            id: row.get("id"),
            workflow_id: row.get("workflow_id"),
            current_step_id: row.get("current_step_id"),
            answers: serde_json::from_str(&answers_json)?,
            is_complete: row.get::<i64, _>("is_complete") != 0,
            tasks: serde_json::from_str::<Vec<Task>>(&tasks_json)?,
            warnings: serde_json::from_str(&warnings_json)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            version: version as u64,
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, session: Session) -> Result<Session, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions
                (id, workflow_id, current_step_id, answers, is_complete,
                 tasks, warnings, created_at, updated_at, version)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&session.id)
        .bind(&session.workflow_id)
        .bind(&session.current_step_id)
        .bind(serde_json::to_string(&session.answers)?)
        .bind(session.is_complete as i64)
        .bind(serde_json::to_string(&session.tasks)?)
        .bind(serde_json::to_string(&session.warnings)?)
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .bind(session.version as i64)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(Self::decode_row).transpose()
    }

    async fn update(&self, mut session: Session) -> Result<Session, StoreError> {
        let updated_at = Utc::now();

        // Version-guarded write: a stale writer matches zero rows.
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET current_step_id = ?2, answers = ?3, is_complete = ?4,
                tasks = ?5, warnings = ?6, updated_at = ?7, version = version + 1
            WHERE id = ?1 AND version = ?8
            "#,
        )
        .bind(&session.id)
        .bind(&session.current_step_id)
        .bind(serde_json::to_string(&session.answers)?)
        .bind(session.is_complete as i64)
        .bind(serde_json::to_string(&session.tasks)?)
        .bind(serde_json::to_string(&session.warnings)?)
        .bind(updated_at.to_rfc3339())
        .bind(session.version as i64)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                session_id: session.id,
            });
        }

        session.version += 1;
        session.updated_at = updated_at;
        Ok(session)
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query("SELECT * FROM sessions ORDER BY created_at DESC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.iter().map(Self::decode_row).collect()
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("bad timestamp '{raw}': {e}")))
}
