use crate::domain_model::*;
use crate::domain_port::StoreError;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct NewUserRecord {
    pub username: String,
    pub email: Option<String>,
    /// Additional named fields written alongside the core columns.
    pub fields: BTreeMap<String, String>,
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// `Ok(None)` when the user exists but the field is unset,
    /// `Err(StoreError::NotFound)` when the user does not exist.
    async fn get_field(&self, user_id: UserId, name: &str) -> Result<Option<String>, StoreError>;

    async fn set_field(&self, user_id: UserId, name: &str, value: &str) -> Result<(), StoreError>;

    async fn delete_field(&self, user_id: UserId, name: &str) -> Result<(), StoreError>;

    async fn get_uid_by_email(&self, email: &str) -> Result<Option<UserId>, StoreError>;

    /// A taken username is replaced by the first free variant from
    /// [`username_candidates`]. Fails with `StoreError::Validation` for an
    /// empty username, a taken email, or when every variant is taken.
    async fn create(&self, record: NewUserRecord) -> Result<UserId, StoreError>;
}

const MAX_USERNAME_SUFFIX: usize = 100;

/// `alice`, `alice 1`, `alice 2`, ...
pub fn username_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_owned())
        .chain((1..=MAX_USERNAME_SUFFIX).map(move |n| format!("{base} {n}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_start_with_the_base_name() {
        let names: Vec<String> = username_candidates("alice").take(3).collect();
        assert_eq!(names, vec!["alice", "alice 1", "alice 2"]);
        assert_eq!(
            username_candidates("alice").last().as_deref(),
            Some("alice 100")
        );
    }
}
