use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<UserId, BTreeMap<String, String>>,
    usernames: DashMap<String, UserId>,
    emails: DashMap<String, UserId>,
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn unique_index(&self, name: &str) -> Option<&DashMap<String, UserId>> {
        match name {
            field::USERNAME => Some(&self.usernames),
            field::EMAIL => Some(&self.emails),
            _ => None,
        }
    }

    fn claim(
        index: &DashMap<String, UserId>,
        value: &str,
        user_id: UserId,
    ) -> Result<(), StoreError> {
        match index.entry(normalize(value)) {
            Entry::Occupied(e) if *e.get() != user_id => {
                Err(StoreError::Validation(format!("{value:?} is already taken")))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(e) => {
                e.insert(user_id);
                Ok(())
            }
        }
    }

    fn release(index: &DashMap<String, UserId>, value: &str, user_id: UserId) {
        index.remove_if(&normalize(value), |_, owner| *owner == user_id);
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn get_field(&self, user_id: UserId, name: &str) -> Result<Option<String>, StoreError> {
        let record = self.users.get(&user_id).ok_or(StoreError::NotFound)?;
        Ok(record.get(name).cloned())
    }

    async fn set_field(&self, user_id: UserId, name: &str, value: &str) -> Result<(), StoreError> {
        let mut record = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;

        if let Some(index) = self.unique_index(name) {
            Self::claim(index, value, user_id)?;
            if let Some(old) = record.get(name) {
                if normalize(old) != normalize(value) {
                    Self::release(index, old, user_id);
                }
            }
        }

        record.insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete_field(&self, user_id: UserId, name: &str) -> Result<(), StoreError> {
        let mut record = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        if let Some(old) = record.remove(name) {
            if let Some(index) = self.unique_index(name) {
                Self::release(index, &old, user_id);
            }
        }
        Ok(())
    }

    async fn get_uid_by_email(&self, email: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self.emails.get(&normalize(email)).map(|uid| *uid))
    }

    async fn create(&self, record: NewUserRecord) -> Result<UserId, StoreError> {
        let username = record.username.trim();
        if username.is_empty() {
            return Err(StoreError::Validation("username is empty".to_string()));
        }

        let user_id = UserId::new_v4();

        let username = username_candidates(username)
            .find(|candidate| Self::claim(&self.usernames, candidate, user_id).is_ok())
            .ok_or_else(|| {
                StoreError::Validation(format!("no free username left for {username:?}"))
            })?;

        let mut fields = record.fields;
        fields.insert(field::USERNAME.to_owned(), username.clone());
        if let Some(email) = record.email.as_deref() {
            fields.insert(field::EMAIL.to_owned(), email.to_owned());
        }
        // The record is visible before the email index points at it.
        self.users.insert(user_id, fields);

        if let Some(email) = record.email.as_deref() {
            if let Err(e) = Self::claim(&self.emails, email, user_id) {
                self.users.remove(&user_id);
                Self::release(&self.usernames, &username, user_id);
                return Err(e);
            }
        }

        Ok(user_id)
    }
}
