/// User directory
///
/// Owns identity and hierarchy data: who a Telegram account is, which role it
/// holds and who supervises it. Authorization is left to callers; the only
/// rule enforced here is the bootstrap rule (the first registration while no
/// admin exists becomes the admin).
use anyhow::{Context, Result};
use sdk::Role;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

/// User record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Local surrogate id
    pub id: i64,
    /// Numeric Telegram id, absent for handle-only placeholders
    pub telegram_id: Option<i64>,
    /// Telegram username without the leading `@`
    pub username: Option<String>,
    pub name: String,
    pub role: Role,
    pub supervisor_id: Option<i64>,
}

impl User {
    /// Whether this record is a handle-only placeholder nobody has claimed yet
    pub fn is_placeholder(&self) -> bool {
        self.telegram_id.is_none()
    }
}

/// How a supervisor refers to a person being added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Handle {
    /// Numeric Telegram id
    Numeric(i64),
    /// Telegram username, stored without `@`
    Display(String),
}

/// Input to [`UserRepository::register`]
#[derive(Debug, Clone)]
pub struct Registration {
    pub telegram_id: Option<i64>,
    pub username: Option<String>,
    pub name: String,
    pub role: Role,
    pub supervisor_id: Option<i64>,
}

impl Registration {
    /// Registration of someone contacting the bot directly
    pub fn first_contact(telegram_id: i64, username: Option<&str>, name: &str) -> Self {
        Self {
            telegram_id: Some(telegram_id),
            username: username.map(str::to_string),
            name: name.to_string(),
            role: Role::Member,
            supervisor_id: None,
        }
    }

    /// Registration of someone added by a supervisor through a handle
    pub fn provisioned(handle: &Handle, name: &str, role: Role, supervisor_id: i64) -> Self {
        let (telegram_id, username) = match handle {
            Handle::Numeric(id) => (Some(*id), None),
            Handle::Display(username) => (None, Some(username.clone())),
        };
        Self {
            telegram_id,
            username,
            name: name.to_string(),
            role,
            supervisor_id: Some(supervisor_id),
        }
    }

    pub fn with_role(mut self, role: Role, supervisor_id: Option<i64>) -> Self {
        self.role = role;
        self.supervisor_id = supervisor_id;
        self
    }
}

/// Strip the leading `@` and surrounding blanks; empty handles count as absent
pub fn normalize_username(username: Option<&str>) -> Option<String> {
    username
        .map(|u| u.trim().trim_start_matches('@').trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

const USER_COLUMNS: &str = "id, telegram_id, username, name, role, supervisor_id";

fn user_from_row(row: &SqliteRow) -> std::result::Result<User, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let role = role
        .parse::<Role>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(User {
        id: row.try_get("id")?,
        telegram_id: row.try_get("telegram_id")?,
        username: row.try_get("username")?,
        name: row.try_get("name")?,
        role,
        supervisor_id: row.try_get("supervisor_id")?,
    })
}

/// User directory repository
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look a user up by numeric Telegram id
    pub async fn identify(&self, telegram_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE telegram_id = ?",
            USER_COLUMNS
        ))
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up user by telegram id")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("Failed to decode user")
    }

    /// Look a user up by username, preferring unclaimed placeholders
    pub async fn identify_by_name(&self, username: &str) -> Result<Option<User>> {
        let Some(username) = normalize_username(Some(username)) else {
            return Ok(None);
        };

        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = ? \
             ORDER BY telegram_id IS NOT NULL, id LIMIT 1",
            USER_COLUMNS
        ))
        .bind(&username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up user by username")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("Failed to decode user")
    }

    /// Look a user up by local id
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("Failed to decode user")
    }

    /// Whether an admin has been bootstrapped
    pub async fn has_admin(&self) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
                .fetch_one(&self.pool)
                .await
                .context("Failed to check for admin")?;
        Ok(exists)
    }

    /// Insert or update a user
    ///
    /// Resolution order:
    /// 1. a record with the same numeric id is updated in place;
    /// 2. otherwise a record with the same username is updated (only an
    ///    unclaimed placeholder when a numeric id is supplied), which is how a
    ///    placeholder gets reconciled on first contact;
    /// 3. otherwise a new row is inserted.
    ///
    /// While no admin exists the registration is forced to role admin with no
    /// supervisor. A unique index on the admin role settles concurrent first
    /// contacts: the loser is retried and registers with its requested role.
    pub async fn register(&self, registration: Registration) -> Result<User> {
        match self.try_register(&registration).await {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                warn!(
                    "Registration raced with another write ({}), retrying",
                    e.message()
                );
                self.try_register(&registration)
                    .await
                    .context("Failed to register user")
            }
            Err(e) => Err(e).context("Failed to register user"),
        }
    }

    async fn try_register(
        &self,
        registration: &Registration,
    ) -> std::result::Result<User, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let admin_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
                .fetch_one(&mut *tx)
                .await?;

        let (role, supervisor_id) = if admin_exists {
            (registration.role, registration.supervisor_id)
        } else {
            info!("No admin registered yet, bootstrapping admin");
            (Role::Admin, None)
        };

        let username = normalize_username(registration.username.as_deref());
        let existing = find_target(&mut tx, registration.telegram_id, username.as_deref()).await?;

        let id = match existing {
            Some(id) => {
                debug!("Updating existing user {}", id);
                sqlx::query(
                    "UPDATE users SET telegram_id = COALESCE(?, telegram_id), \
                     username = COALESCE(?, username), name = ?, role = ?, supervisor_id = ? \
                     WHERE id = ?",
                )
                .bind(registration.telegram_id)
                .bind(&username)
                .bind(&registration.name)
                .bind(role.as_str())
                .bind(supervisor_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                id
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO users (telegram_id, username, name, role, supervisor_id) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(registration.telegram_id)
                .bind(&username)
                .bind(&registration.name)
                .bind(role.as_str())
                .bind(supervisor_id)
                .execute(&mut *tx)
                .await?;
                result.last_insert_rowid()
            }
        };

        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let user = user_from_row(&row)?;

        tx.commit().await?;
        Ok(user)
    }

    /// Every user holding a role, in insertion order
    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE role = ? ORDER BY id",
            USER_COLUMNS
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users by role")?;

        rows.iter()
            .map(user_from_row)
            .collect::<std::result::Result<_, _>>()
            .context("Failed to decode users")
    }

    /// Members whose supervisor is exactly this manager
    pub async fn team_of(&self, manager_id: i64) -> Result<Vec<User>> {
        self.reports_of(manager_id, Role::Member).await
    }

    /// Managers whose supervisor is exactly this admin
    pub async fn managers_of(&self, admin_id: i64) -> Result<Vec<User>> {
        self.reports_of(admin_id, Role::Manager).await
    }

    async fn reports_of(&self, supervisor_id: i64, role: Role) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE supervisor_id = ? AND role = ? ORDER BY id",
            USER_COLUMNS
        ))
        .bind(supervisor_id)
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list direct reports")?;

        rows.iter()
            .map(user_from_row)
            .collect::<std::result::Result<_, _>>()
            .context("Failed to decode users")
    }

    /// Remove a user by numeric Telegram id
    ///
    /// Not reachable from any chat flow. Fails while tasks or reports still
    /// reference the user.
    pub async fn delete_by_telegram_id(&self, telegram_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users WHERE telegram_id = ?")
            .bind(telegram_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected())
    }
}

async fn find_target(
    conn: &mut SqliteConnection,
    telegram_id: Option<i64>,
    username: Option<&str>,
) -> std::result::Result<Option<i64>, sqlx::Error> {
    if let Some(telegram_id) = telegram_id {
        let by_id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE telegram_id = ?")
            .bind(telegram_id)
            .fetch_optional(&mut *conn)
            .await?;
        if by_id.is_some() {
            return Ok(by_id);
        }
    }

    let Some(username) = username else {
        return Ok(None);
    };

    let query = if telegram_id.is_some() {
        "SELECT id FROM users WHERE username = ? AND telegram_id IS NULL ORDER BY id LIMIT 1"
    } else {
        "SELECT id FROM users WHERE username = ? ORDER BY telegram_id IS NOT NULL, id LIMIT 1"
    };

    sqlx::query_scalar(query)
        .bind(username)
        .fetch_optional(&mut *conn)
        .await
}
