//! User operations.

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};

use super::repository::{parse_timestamp, timestamp, Repository};
use crate::errors::AppError;
use crate::models::{normalize_email, Role, UpdateUserRequest, User, UserQuery};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, station_id, active, created_at, updated_at";

/// Fields of a user to insert. The password is already hashed.
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: String,
    pub role: Role,
    pub station_id: Option<&'a str>,
    pub active: bool,
}

impl Repository {
    /// List users matching the filter, ordered by name.
    pub async fn list_users(&self, filter: &UserQuery) -> Result<Vec<User>, AppError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM users WHERE 1 = 1", USER_COLUMNS));
        if let Some(role) = filter.role {
            query.push(" AND role = ").push_bind(role.as_str());
        }
        if let Some(station_id) = &filter.station_id {
            query.push(" AND station_id = ").push_bind(station_id.clone());
        }
        query.push(" ORDER BY name");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Look up a user by email, case-insensitively.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Create a new user.
    pub async fn create_user(&self, new_user: NewUser<'_>) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let email = normalize_email(new_user.email);

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, station_id, active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(new_user.name.trim())
        .bind(&email)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .bind(new_user.station_id)
        .bind(new_user.active as i32)
        .bind(timestamp(&now))
        .bind(timestamp(&now))
        .execute(&self.pool)
        .await?;

        tracing::info!("Created {} user {}", new_user.role.as_str(), email);

        Ok(User {
            id,
            name: new_user.name.trim().to_string(),
            email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            station_id: new_user.station_id.map(str::to_string),
            active: new_user.active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Update a user. A new password must already be hashed by the caller.
    pub async fn update_user(
        &self,
        id: &str,
        request: &UpdateUserRequest,
        password_hash: Option<String>,
    ) -> Result<User, AppError> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let now = Utc::now();
        let role = request.role.unwrap_or(existing.role);
        // Only station-bound roles keep a station
        let station_id = if role.is_station_bound() {
            request.station_id.clone().or(existing.station_id)
        } else {
            None
        };
        let user = User {
            id: existing.id,
            name: request
                .name
                .as_deref()
                .map(|n| n.trim().to_string())
                .unwrap_or(existing.name),
            email: request
                .email
                .as_deref()
                .map(normalize_email)
                .unwrap_or(existing.email),
            password_hash: password_hash.unwrap_or(existing.password_hash),
            role,
            station_id,
            active: request.active.unwrap_or(existing.active),
            created_at: existing.created_at,
            updated_at: now,
        };

        sqlx::query(
            "UPDATE users SET name = ?, email = ?, password_hash = ?, role = ?, station_id = ?, active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.station_id)
        .bind(user.active as i32)
        .bind(timestamp(&now))
        .bind(id)
        .execute(&self.pool)
        .await?;

        // Deactivated users lose their sessions immediately
        if !user.active {
            self.delete_user_sessions(id).await?;
        }

        Ok(user)
    }

    /// Delete a user. Their sessions go with them; issue references are cleared.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    /// Create the bootstrap SuperAdmin unless a user with that email exists.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        if self.find_user_by_email(email).await?.is_some() {
            return Ok(());
        }

        let password_hash = User::hash_password(password)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        self.create_user(NewUser {
            name: "Administrator",
            email,
            password_hash,
            role: Role::SuperAdmin,
            station_id: None,
            active: true,
        })
        .await?;

        tracing::info!("Bootstrap administrator {} created", email);
        Ok(())
    }
}

pub(super) fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let role: String = row.get("role");
    let active: i32 = row.get("active");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        // Unknown roles get the least privilege
        role: Role::from_str(&role).unwrap_or(Role::Public),
        station_id: row.get("station_id"),
        active: active != 0,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    }
}
