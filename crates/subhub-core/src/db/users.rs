//! User operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::User;

const USER_COLUMNS: &str = "id, email, name, created_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Insert a user by email, or return the existing one
    ///
    /// A supplied name fills in a missing display name but never overwrites one.
    pub fn upsert_user(&self, email: &str, name: Option<&str>) -> Result<User> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::InvalidData("User email cannot be empty".to_string()));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO users (email, name) VALUES (?1, ?2)
            ON CONFLICT(email) DO UPDATE SET name = COALESCE(users.name, excluded.name)
            "#,
            params![email, name],
        )?;

        let user = conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"),
            params![email],
            row_to_user,
        )?;
        Ok(user)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by email (case-insensitive)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"),
                params![email.trim()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY email"))?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Delete a user and every subscription they own
    ///
    /// Returns false if the user did not exist.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM subscriptions WHERE user_id = ?", params![id])?;
        let deleted = tx.execute("DELETE FROM users WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }
}
