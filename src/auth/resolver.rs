//! Maps a verified token subject back to the persisted user record.

use crate::auth::models::{TokenSubject, User};
use crate::auth::user_store::UserRepository;
use crate::errors::AuthError;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserRepository>,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Load the user named by `subject`. No caching: every call hits the store.
    pub async fn resolve(&self, subject: &TokenSubject) -> Result<User, AuthError> {
        let id = Uuid::parse_str(&subject.user_id).map_err(|_| {
            debug!("Token subject carries a malformed user id");
            AuthError::UserNotFound
        })?;

        self.users
            .find_user_by_id(&id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{NewUser, UserRole};
    use crate::auth::user_store::UserStore;
    use tempfile::NamedTempFile;

    fn resolver() -> (IdentityResolver, Arc<UserStore>, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = Arc::new(UserStore::new(temp_file.path().to_str().unwrap()).unwrap());
        (IdentityResolver::new(store.clone()), store, temp_file)
    }

    #[tokio::test]
    async fn test_resolves_existing_user() {
        let (resolver, store, _temp) = resolver();
        let user = store
            .create_user(NewUser {
                username: "reader".to_string(),
                email: "a@x.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::User,
            })
            .unwrap();

        let resolved = resolver
            .resolve(&TokenSubject::from_user(&user))
            .await
            .unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_unknown_or_malformed_subject() {
        let (resolver, _store, _temp) = resolver();

        let unknown = TokenSubject {
            user_id: Uuid::new_v4().to_string(),
            email: "ghost@x.com".to_string(),
            role: None,
        };
        assert!(matches!(
            resolver.resolve(&unknown).await,
            Err(AuthError::UserNotFound)
        ));

        let malformed = TokenSubject {
            user_id: "not-a-uuid".to_string(),
            ..unknown
        };
        assert!(matches!(
            resolver.resolve(&malformed).await,
            Err(AuthError::UserNotFound)
        ));
    }
}
