use crate::application_impl::KeyedLock;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RealIdentityService {
    user_store: Arc<dyn UserStore>,
    kv_store: Arc<dyn KvStore>,
    event_sink: Arc<dyn IdentityEventSink>,
    locks: KeyedLock,
    provider: String,
    index_map: String,
    id_field: String,
    email_merge: EmailMergePolicy,
}

impl RealIdentityService {
    pub fn try_new(
        config: ResolverConfig,
        user_store: Arc<dyn UserStore>,
        kv_store: Arc<dyn KvStore>,
        event_sink: Arc<dyn IdentityEventSink>,
    ) -> Result<Self, ConfigError> {
        let provider = config.provider.trim().to_owned();
        if provider.is_empty() {
            return Err(ConfigError::MissingConfiguration("provider name"));
        }

        Ok(Self {
            user_store,
            kv_store,
            event_sink,
            locks: KeyedLock::new(),
            index_map: format!("{provider}Id:uid"),
            id_field: format!("{provider}Id"),
            provider,
            email_merge: config.email_merge,
        })
    }

    /// Name of the map holding `externalId -> uid`.
    pub fn index_map(&self) -> &str {
        &self.index_map
    }

    /// Name of the back-reference field on the user record.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    fn lock_key(&self, external_id: &str) -> String {
        format!("{}:{}", self.provider, external_id)
    }

    async fn lookup_index(&self, external_id: &str) -> Result<Option<UserId>, IdentityError> {
        match self.kv_store.get_field(&self.index_map, external_id).await? {
            None => Ok(None),
            Some(value) => match value.parse::<UserId>() {
                Ok(user_id) => Ok(Some(user_id)),
                Err(_) => Err(IdentityError::CorruptIndex {
                    external_id: external_id.to_owned(),
                    value,
                }),
            },
        }
    }

    fn profile_fields(profile: &ExternalProfile) -> Vec<(&'static str, &str)> {
        let mut fields = vec![(field::FULLNAME, profile.display_name.as_str())];
        if let Some(avatar) = profile.avatar_url.as_deref() {
            fields.push((field::PICTURE, avatar));
            fields.push((field::UPLOADED_PICTURE, avatar));
        }
        fields
    }

    async fn refresh_profile_fields(
        &self,
        user_id: UserId,
        profile: &ExternalProfile,
    ) -> Result<(), IdentityError> {
        for (name, value) in Self::profile_fields(profile) {
            self.user_store.set_field(user_id, name, value).await?;
        }
        Ok(())
    }

    async fn refresh_linked(
        &self,
        user_id: UserId,
        profile: &ExternalProfile,
    ) -> Result<(), IdentityError> {
        debug!(%user_id, external_id = %profile.id, "identity already linked");
        self.refresh_profile_fields(user_id, profile).await?;
        // Keeps the back-reference converging on the index.
        self.user_store
            .set_field(user_id, &self.id_field, &profile.id)
            .await?;
        Ok(())
    }

    async fn check_email_merge(
        &self,
        user_id: UserId,
        profile: &ExternalProfile,
    ) -> Result<(), IdentityError> {
        if !self.email_merge.permits(profile) {
            return Err(IdentityError::EmailMergeRefused {
                email: profile.email.clone(),
            });
        }

        match self.user_store.get_field(user_id, &self.id_field).await? {
            Some(linked) if linked != profile.id => {
                Err(IdentityError::AccountAlreadyLinked { user_id })
            }
            _ => Ok(()),
        }
    }

    async fn create_user(&self, profile: &ExternalProfile) -> Result<UserId, IdentityError> {
        let fields: BTreeMap<String, String> = Self::profile_fields(profile)
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect();

        let record = NewUserRecord {
            username: profile.display_name.clone(),
            email: profile.has_email().then(|| profile.email.clone()),
            fields,
        };

        let user_id = self.user_store.create(record).await?;

        self.event_sink
            .publish(IdentityEvent::Created {
                user_id,
                provider: self.provider.clone(),
            })
            .await;

        Ok(user_id)
    }

    async fn link(
        &self,
        user_id: UserId,
        profile: &ExternalProfile,
        source: LinkSource,
    ) -> Result<(), IdentityError> {
        if let Err(e) = self
            .kv_store
            .set_field(&self.index_map, &profile.id, &user_id.to_string())
            .await
        {
            if source == LinkSource::Created {
                self.event_sink
                    .publish(IdentityEvent::LinkIncomplete {
                        user_id,
                        provider: self.provider.clone(),
                        external_id: profile.id.clone(),
                        reason: e.to_string(),
                    })
                    .await;
            }
            return Err(e.into());
        }

        self.user_store
            .set_field(user_id, &self.id_field, &profile.id)
            .await?;

        self.event_sink
            .publish(IdentityEvent::Linked {
                user_id,
                provider: self.provider.clone(),
                external_id: profile.id.clone(),
                source,
            })
            .await;

        Ok(())
    }
}

#[async_trait::async_trait]
impl IdentityService for RealIdentityService {
    async fn resolve(&self, profile: &ExternalProfile) -> Result<UserId, IdentityError> {
        if profile.provider != self.provider {
            return Err(IdentityError::ProviderMismatch {
                expected: self.provider.clone(),
                found: profile.provider.clone(),
            });
        }

        let _guard = self.locks.acquire(&self.lock_key(&profile.id)).await;

        if let Some(user_id) = self.lookup_index(&profile.id).await? {
            match self.refresh_linked(user_id, profile).await {
                Ok(()) => {
                    self.event_sink
                        .publish(IdentityEvent::Resolved {
                            user_id,
                            provider: self.provider.clone(),
                            external_id: profile.id.clone(),
                        })
                        .await;
                    return Ok(user_id);
                }
                Err(IdentityError::Store(StoreError::NotFound)) => {
                    warn!(
                        %user_id,
                        external_id = %profile.id,
                        "index points at a missing user, dropping the entry"
                    );
                    self.kv_store
                        .delete_field(&self.index_map, &profile.id)
                        .await?;
                }
                Err(e) => return Err(e),
            }
        }

        let existing = if profile.has_email() {
            self.user_store.get_uid_by_email(&profile.email).await?
        } else {
            None
        };

        match existing {
            Some(user_id) => {
                self.check_email_merge(user_id, profile).await?;
                self.link(user_id, profile, LinkSource::Email).await?;
                self.refresh_profile_fields(user_id, profile).await?;
                Ok(user_id)
            }
            None => {
                let user_id = self.create_user(profile).await?;
                self.link(user_id, profile, LinkSource::Created).await?;
                Ok(user_id)
            }
        }
    }

    async fn unlink(&self, user_id: UserId) -> Result<(), IdentityError> {
        let external_id = match self.user_store.get_field(user_id, &self.id_field).await {
            Ok(Some(external_id)) => external_id,
            Ok(None) | Err(StoreError::NotFound) => {
                debug!(%user_id, "unlink requested for an unlinked user");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let _guard = self.locks.acquire(&self.lock_key(&external_id)).await;

        // A stale back-reference must not remove somebody else's link.
        if self.lookup_index(&external_id).await? == Some(user_id) {
            self.kv_store
                .delete_field(&self.index_map, &external_id)
                .await?;
        }

        self.user_store
            .delete_field(user_id, &self.id_field)
            .await?;

        self.event_sink
            .publish(IdentityEvent::Unlinked {
                user_id,
                provider: self.provider.clone(),
                external_id,
            })
            .await;

        Ok(())
    }

    async fn linked_external_id(&self, user_id: UserId) -> Result<Option<String>, IdentityError> {
        Ok(self.user_store.get_field(user_id, &self.id_field).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::*;

    struct Fixture {
        users: Arc<MemoryUserStore>,
        kv: Arc<MemoryKvStore>,
        events: Arc<MemoryEventSink>,
        service: RealIdentityService,
    }

    fn fixture(email_merge: EmailMergePolicy) -> Fixture {
        let users = Arc::new(MemoryUserStore::new());
        let kv = Arc::new(MemoryKvStore::new());
        let events = Arc::new(MemoryEventSink::new());
        let service = RealIdentityService::try_new(
            ResolverConfig {
                provider: "discord".to_string(),
                email_merge,
            },
            users.clone(),
            kv.clone(),
            events.clone(),
        )
        .unwrap();
        Fixture {
            users,
            kv,
            events,
            service,
        }
    }

    fn profile(id: &str, name: &str, email: &str) -> ExternalProfile {
        ExternalProfile {
            id: id.to_string(),
            display_name: name.to_string(),
            email: email.to_string(),
            email_verified: None,
            avatar_url: None,
            provider: "discord".to_string(),
        }
    }

    async fn existing_user(users: &MemoryUserStore, name: &str, email: &str) -> UserId {
        users
            .create(NewUserRecord {
                username: name.to_string(),
                email: Some(email.to_string()),
                fields: BTreeMap::new(),
            })
            .await
            .unwrap()
    }

    #[test]
    fn empty_provider_is_missing_configuration() {
        let result = RealIdentityService::try_new(
            ResolverConfig {
                provider: "  ".to_string(),
                email_merge: EmailMergePolicy::Always,
            },
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryKvStore::new()),
            Arc::new(MemoryEventSink::new()),
        );
        assert!(matches!(
            result,
            Err(ConfigError::MissingConfiguration("provider name"))
        ));
    }

    #[test]
    fn names_are_derived_from_provider() {
        let f = fixture(EmailMergePolicy::Always);
        assert_eq!(f.service.index_map(), "discordId:uid");
        assert_eq!(f.service.id_field(), "discordId");
    }

    #[tokio::test]
    async fn rejects_profile_from_another_provider() {
        let f = fixture(EmailMergePolicy::Always);
        let mut p = profile("42", "alice", "a@x.com");
        p.provider = "github".to_string();

        let err = f.service.resolve(&p).await.unwrap_err();
        assert!(matches!(err, IdentityError::ProviderMismatch { .. }));
        assert_eq!(f.users.len(), 0);
    }

    #[tokio::test]
    async fn linked_user_gets_profile_fields_refreshed() {
        let f = fixture(EmailMergePolicy::Always);
        let uid = f.service.resolve(&profile("42", "alice", "a@x.com")).await.unwrap();

        let mut renamed = profile("42", "Alice Liddell", "a@x.com");
        renamed.avatar_url = Some("https://cdn.example/a.png".to_string());
        assert_eq!(f.service.resolve(&renamed).await.unwrap(), uid);

        let users = &f.users;
        assert_eq!(
            users.get_field(uid, field::FULLNAME).await.unwrap().as_deref(),
            Some("Alice Liddell")
        );
        assert_eq!(
            users.get_field(uid, field::PICTURE).await.unwrap().as_deref(),
            Some("https://cdn.example/a.png")
        );
        // username is only set at creation
        assert_eq!(
            users.get_field(uid, field::USERNAME).await.unwrap().as_deref(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn created_user_carries_avatar_fields() {
        let f = fixture(EmailMergePolicy::Always);
        let mut p = profile("42", "alice", "a@x.com");
        p.avatar_url = Some("https://cdn.example/a.png".to_string());
        let uid = f.service.resolve(&p).await.unwrap();

        for name in [field::PICTURE, field::UPLOADED_PICTURE] {
            assert_eq!(
                f.users.get_field(uid, name).await.unwrap().as_deref(),
                Some("https://cdn.example/a.png")
            );
        }
        assert_eq!(
            f.users.get_field(uid, field::FULLNAME).await.unwrap().as_deref(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn taken_username_does_not_block_first_login() {
        let f = fixture(EmailMergePolicy::Always);
        let local = existing_user(&f.users, "alice", "other@x.com").await;

        let p = profile("42", "alice", "a@x.com");
        let uid = f.service.resolve(&p).await.unwrap();
        assert_ne!(uid, local);
        assert_eq!(
            f.users.get_field(uid, field::USERNAME).await.unwrap().as_deref(),
            Some("alice 1")
        );
        assert_eq!(
            f.users.get_field(uid, field::FULLNAME).await.unwrap().as_deref(),
            Some("alice")
        );
        assert_eq!(f.service.resolve(&p).await.unwrap(), uid);
        assert_eq!(f.users.len(), 2);
        assert_eq!(f.kv.map_len("discordId:uid"), 1);
    }

    #[tokio::test]
    async fn index_entry_for_missing_user_is_replaced() {
        let f = fixture(EmailMergePolicy::Always);
        let gone = UserId::new_v4();
        f.kv.set_field("discordId:uid", "42", &gone.to_string())
            .await
            .unwrap();

        let uid = f
            .service
            .resolve(&profile("42", "alice", "a@x.com"))
            .await
            .unwrap();
        assert_ne!(uid, gone);
        assert_eq!(
            f.kv.get_field("discordId:uid", "42").await.unwrap(),
            Some(uid.to_string())
        );
        assert_eq!(f.users.len(), 1);
    }

    #[tokio::test]
    async fn verified_only_policy_refuses_unverified_email() {
        let f = fixture(EmailMergePolicy::VerifiedOnly);
        let existing = existing_user(&f.users, "bob", "a@x.com").await;

        let err = f
            .service
            .resolve(&profile("99", "bobby", "a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailMergeRefused { .. }));
        assert_eq!(f.kv.map_len("discordId:uid"), 0);

        let mut verified = profile("99", "bobby", "a@x.com");
        verified.email_verified = Some(true);
        assert_eq!(f.service.resolve(&verified).await.unwrap(), existing);
    }

    #[tokio::test]
    async fn never_policy_refuses_any_email_match() {
        let f = fixture(EmailMergePolicy::Never);
        existing_user(&f.users, "bob", "a@x.com").await;

        let mut verified = profile("99", "bobby", "a@x.com");
        verified.email_verified = Some(true);
        let err = f.service.resolve(&verified).await.unwrap_err();
        assert!(matches!(err, IdentityError::EmailMergeRefused { .. }));
        assert_eq!(f.users.len(), 1);
    }

    #[tokio::test]
    async fn email_match_already_linked_elsewhere_is_refused() {
        let f = fixture(EmailMergePolicy::Always);
        let uid = f.service.resolve(&profile("1", "carol", "c@x.com")).await.unwrap();

        let err = f
            .service
            .resolve(&profile("2", "carol-alt", "c@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AccountAlreadyLinked { user_id } if user_id == uid));
        assert_eq!(f.kv.get_field("discordId:uid", "2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn profile_without_email_never_merges() {
        let f = fixture(EmailMergePolicy::Always);
        let uid = f.service.resolve(&profile("5", "dave", "")).await.unwrap();
        assert_eq!(f.users.get_field(uid, field::EMAIL).await.unwrap(), None);
        assert_eq!(f.users.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_index_entry_is_reported() {
        let f = fixture(EmailMergePolicy::Always);
        f.kv.set_field("discordId:uid", "42", "garbage").await.unwrap();

        let err = f
            .service
            .resolve(&profile("42", "alice", "a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::CorruptIndex { value, .. } if value == "garbage"));
    }

    #[tokio::test]
    async fn unlink_keeps_index_entry_owned_by_someone_else() {
        let f = fixture(EmailMergePolicy::Always);
        let owner = f.service.resolve(&profile("42", "alice", "a@x.com")).await.unwrap();
        let stale = existing_user(&f.users, "mallory", "m@x.com").await;
        f.users.set_field(stale, "discordId", "42").await.unwrap();

        f.service.unlink(stale).await.unwrap();

        assert_eq!(
            f.kv.get_field("discordId:uid", "42").await.unwrap(),
            Some(owner.to_string())
        );
        assert_eq!(f.users.get_field(stale, "discordId").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unlink_of_unknown_user_is_a_noop() {
        let f = fixture(EmailMergePolicy::Always);
        f.service.unlink(UserId::new_v4()).await.unwrap();
        assert!(f.events.events().is_empty());
    }

    #[tokio::test]
    async fn events_describe_each_transition() {
        let f = fixture(EmailMergePolicy::Always);
        let uid = f.service.resolve(&profile("42", "alice", "a@x.com")).await.unwrap();
        f.service.resolve(&profile("42", "alice", "a@x.com")).await.unwrap();
        f.service.unlink(uid).await.unwrap();

        let names: Vec<&str> = f.events.events().iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "identity_created",
                "identity_linked",
                "identity_resolved",
                "identity_unlinked"
            ]
        );
        assert!(f.events.events().iter().all(|e| e.user_id() == uid));
    }

    #[tokio::test]
    async fn linked_external_id_follows_link_state() {
        let f = fixture(EmailMergePolicy::Always);
        let uid = f.service.resolve(&profile("42", "alice", "a@x.com")).await.unwrap();
        assert_eq!(
            f.service.linked_external_id(uid).await.unwrap().as_deref(),
            Some("42")
        );
        f.service.unlink(uid).await.unwrap();
        assert_eq!(f.service.linked_external_id(uid).await.unwrap(), None);
    }
}
