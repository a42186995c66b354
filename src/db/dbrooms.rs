use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Error as SqlxError, Row};
use std::time::Duration;
use tracing::{error, info};

use super::store::{RoomField, RoomStore, StoreError, UserField, UserStore};
use crate::models::{Membership, Room, RoomFile, User};

const SCHEMA_SQL: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        token TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rooms (
        room_id TEXT PRIMARY KEY,
        password_hash TEXT NOT NULL,
        owner_id TEXT NOT NULL,
        metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
        members JSONB NOT NULL DEFAULT '[]'::jsonb,
        files JSONB NOT NULL DEFAULT '[]'::jsonb,
        version BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS rooms_owner_idx ON rooms (owner_id)",
];

const ROOM_COLUMNS: &str = "room_id, password_hash, owner_id, metadata, members, files, version, created_at";

/// Row from the users table
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    password_hash: String,
    token: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            token: row.token,
            created_at: row.created_at,
        }
    }
}

fn room_from_row(row: &PgRow) -> Result<Room, SqlxError> {
    let members: Json<Vec<Membership>> = row.try_get("members")?;
    let files: Json<Vec<RoomFile>> = row.try_get("files")?;
    let metadata: Json<serde_json::Value> = row.try_get("metadata")?;
    Ok(Room {
        room_id: row.try_get("room_id")?,
        password_hash: row.try_get("password_hash")?,
        owner_id: row.try_get("owner_id")?,
        metadata: metadata.0,
        members: members.0,
        files: files.0,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_unique_violation(e: SqlxError, what: String) -> StoreError {
    match &e {
        SqlxError::Database(db_err) if db_err.is_unique_violation() => StoreError::Duplicate(what),
        _ => StoreError::Database(e),
    }
}

/// Postgres-backed store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Create the tables if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), SqlxError> {
        for statement in SCHEMA_SQL {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema verified");
        Ok(())
    }

    fn log_pool_state(&self, action: &str, subject: &str) {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        info!(
            "{} {}. Pool connections: {} idle, {} in use",
            action,
            subject,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by(&self, field: UserField<'_>) -> Result<Option<User>, StoreError> {
        let (sql, value) = match field {
            UserField::Id(id) => ("SELECT * FROM users WHERE id = $1", id),
            UserField::Username(name) => ("SELECT * FROM users WHERE username = $1", name),
        };
        let row = sqlx::query_as::<_, UserRow>(sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn find_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ANY($1::text[])")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        self.log_pool_state("Creating user", &user.username);
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, token, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.token)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("User '{}'", user.username)))?;
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET username = $1, password_hash = $2, token = $3 WHERE id = $4")
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.token)
            .bind(&user.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("User '{}'", user.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl RoomStore for PgStore {
    async fn find_room_by(&self, field: RoomField<'_>) -> Result<Option<Room>, StoreError> {
        let (filter, value) = match field {
            RoomField::RoomId(id) => ("room_id = $1", id),
        };
        let sql = format!("SELECT {} FROM rooms WHERE {}", ROOM_COLUMNS, filter);
        let row = sqlx::query(&sql).bind(value).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(room_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_rooms_for_user(&self, user_id: &str) -> Result<Vec<Room>, StoreError> {
        let containment = serde_json::json!([{ "userId": user_id }]);
        let sql = format!(
            "SELECT {} FROM rooms WHERE owner_id = $1 OR members @> $2::jsonb ORDER BY created_at",
            ROOM_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(Json(containment))
            .fetch_all(&self.pool)
            .await?;
        let rooms = rows.iter().map(room_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(rooms)
    }

    async fn create_room(&self, room: Room) -> Result<Room, StoreError> {
        self.log_pool_state("Creating room", &room.room_id);
        sqlx::query(
            r#"
            INSERT INTO rooms (room_id, password_hash, owner_id, metadata, members, files, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&room.room_id)
        .bind(&room.password_hash)
        .bind(&room.owner_id)
        .bind(Json(&room.metadata))
        .bind(Json(&room.members))
        .bind(Json(&room.files))
        .bind(room.version)
        .bind(room.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("Room '{}'", room.room_id)))?;
        Ok(room)
    }

    async fn save_room(&self, room: &Room) -> Result<Room, StoreError> {
        self.log_pool_state("Saving room", &room.room_id);

        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                error!(
                    "Failed to acquire connection from pool for room {}: {}. Pool state: {} idle, {} total",
                    room.room_id,
                    e,
                    self.pool.num_idle(),
                    self.pool.size()
                );
                return Err(e.into());
            }
        };

        let updated = sqlx::query(
            r#"
            UPDATE rooms
            SET owner_id = $1,
                metadata = $2,
                members = $3,
                files = $4,
                version = version + 1
            WHERE room_id = $5
                AND version = $6
            RETURNING version;
            "#,
        )
        .bind(&room.owner_id)
        .bind(Json(&room.metadata))
        .bind(Json(&room.members))
        .bind(Json(&room.files))
        .bind(&room.room_id)
        .bind(room.version)
        .fetch_optional(&mut *tx)
        .await?;

        let new_version: i64 = match updated {
            Some(row) => row.try_get("version")?,
            None => {
                let exists = sqlx::query("SELECT 1 FROM rooms WHERE room_id = $1")
                    .bind(&room.room_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .is_some();
                tx.rollback().await?;
                return Err(if exists {
                    StoreError::VersionConflict(room.room_id.clone())
                } else {
                    StoreError::NotFound(format!("Room '{}'", room.room_id))
                });
            }
        };

        tx.commit().await?;

        let mut saved = room.clone();
        saved.version = new_version;
        Ok(saved)
    }

    async fn delete_room(&self, room: &Room) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM rooms WHERE room_id = $1 AND version = $2")
            .bind(&room.room_id)
            .bind(room.version)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists = sqlx::query("SELECT 1 FROM rooms WHERE room_id = $1")
            .bind(&room.room_id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if exists {
            return Err(StoreError::VersionConflict(room.room_id.clone()));
        }
        Ok(false)
    }
}
