use super::util::{is_dup_key_on, store_err};
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::{MySqlPool, Row};

const USERNAME_KEY: &str = "uq_user_username";

/// Emails are stored and looked up trimmed; the column collation handles case.
fn normalize_email(email: &str) -> &str {
    email.trim()
}

/// Users live in `user`; every other named field lives in `user_field`.
/// See `sql/schema.sql`.
pub struct MySqlUserStore {
    pool: MySqlPool,
}

impl MySqlUserStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserStore { pool }
    }

    /// Fields stored as columns of `user`. Column names never come from input.
    fn core_column(name: &str) -> Option<&'static str> {
        match name {
            field::USERNAME => Some("username"),
            field::EMAIL => Some("email"),
            _ => None,
        }
    }

    async fn ensure_exists(&self, user_id: UserId) -> Result<(), StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM user WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_err("query user", e))?;

        if count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserStore for MySqlUserStore {
    async fn get_field(&self, user_id: UserId, name: &str) -> Result<Option<String>, StoreError> {
        let row = match Self::core_column(name) {
            Some(column) => {
                let sql = format!("SELECT {column} AS value FROM user WHERE user_id = ?");
                sqlx::query(&sql)
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await
            }
            None => {
                sqlx::query(
                    r#"
SELECT f.value AS value
FROM user u
LEFT JOIN user_field f ON f.user_id = u.user_id AND f.name = ?
WHERE u.user_id = ?
"#,
                )
                .bind(name)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(|e| store_err("query field", e))?;

        let row = row.ok_or(StoreError::NotFound)?;
        row.try_get::<Option<String>, _>("value")
            .map_err(|e| store_err("decode field", e))
    }

    async fn set_field(&self, user_id: UserId, name: &str, value: &str) -> Result<(), StoreError> {
        self.ensure_exists(user_id).await?;

        match Self::core_column(name) {
            Some(column) => {
                let value = if column == "email" {
                    normalize_email(value)
                } else {
                    value
                };
                let sql = format!("UPDATE user SET {column} = ? WHERE user_id = ?");
                sqlx::query(&sql)
                    .bind(value)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await
            }
            None => {
                sqlx::query(
                    r#"
INSERT INTO user_field (user_id, name, value)
VALUES (?, ?, ?)
ON DUPLICATE KEY UPDATE value = VALUES(value)
"#,
                )
                .bind(user_id)
                .bind(name)
                .bind(value)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(|e| store_err("set field", e))?;

        Ok(())
    }

    async fn delete_field(&self, user_id: UserId, name: &str) -> Result<(), StoreError> {
        self.ensure_exists(user_id).await?;

        let result = match Self::core_column(name) {
            Some("username") => {
                return Err(StoreError::Validation(
                    "username cannot be removed".to_string(),
                ));
            }
            Some(column) => {
                let sql = format!("UPDATE user SET {column} = NULL WHERE user_id = ?");
                sqlx::query(&sql).bind(user_id).execute(&self.pool).await
            }
            None => {
                sqlx::query("DELETE FROM user_field WHERE user_id = ? AND name = ?")
                    .bind(user_id)
                    .bind(name)
                    .execute(&self.pool)
                    .await
            }
        };
        result.map_err(|e| store_err("delete field", e))?;

        Ok(())
    }

    async fn get_uid_by_email(&self, email: &str) -> Result<Option<UserId>, StoreError> {
        let row = sqlx::query("SELECT user_id FROM user WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_err("query user by email", e))?;

        match row {
            Some(row) => Ok(Some(
                row.try_get::<UserId, _>("user_id")
                    .map_err(|e| store_err("decode user_id", e))?,
            )),
            None => Ok(None),
        }
    }

    async fn create(&self, record: NewUserRecord) -> Result<UserId, StoreError> {
        let username = record.username.trim();
        if username.is_empty() {
            return Err(StoreError::Validation("username is empty".to_string()));
        }

        let user_id = UserId::new_v4();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_err("begin", e))?;

        let email = record
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|email| !email.is_empty());

        let mut inserted = false;
        for candidate in username_candidates(username) {
            let result = sqlx::query(
                r#"
INSERT INTO user (user_id, username, email)
VALUES (?, ?, ?)
"#,
            )
            .bind(user_id)
            .bind(&candidate)
            .bind(email)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {
                    inserted = true;
                    break;
                }
                Err(e) if is_dup_key_on(&e, USERNAME_KEY) => continue,
                Err(e) => return Err(store_err("insert user", e)),
            }
        }
        if !inserted {
            return Err(StoreError::Validation(format!(
                "no free username left for {username:?}"
            )));
        }

        for (name, value) in &record.fields {
            if Self::core_column(name).is_some() {
                continue;
            }
            sqlx::query("INSERT INTO user_field (user_id, name, value) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(name)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(|e| store_err("insert user field", e))?;
        }

        tx.commit().await.map_err(|e| store_err("commit", e))?;

        Ok(user_id)
    }
}
