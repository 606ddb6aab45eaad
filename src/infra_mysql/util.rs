use crate::domain_port::StoreError;
use sqlx::mysql::MySqlDatabaseError;

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

/// MySQL names the violated key in the message, as `'uq_user_username'` or
/// `'user.uq_user_username'` depending on the server version.
pub fn is_dup_key_on(err: &sqlx::Error, key: &str) -> bool {
    match err {
        sqlx::Error::Database(db) if is_dup_key(err) => names_key(db.message(), key),
        _ => false,
    }
}

fn names_key(message: &str, key: &str) -> bool {
    message.contains(&format!("'{key}'")) || message.contains(&format!(".{key}'"))
}

pub fn store_err(context: &str, err: sqlx::Error) -> StoreError {
    if is_dup_key(&err) {
        StoreError::Validation(format!("{context}: duplicate value"))
    } else {
        StoreError::Io(format!("{context}: {err}"))
    }
}
