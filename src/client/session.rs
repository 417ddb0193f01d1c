use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::auth::dto::{AuthResponse, PublicUser};

#[derive(Debug, Clone)]
struct Credentials {
    access_token: String,
    refresh_token: String,
    user: PublicUser,
}

/// Who the client is talking to the API as. Starts signed out; `init` on a
/// successful login/register/refresh, `reset` on logout or a 401.
#[derive(Debug, Default)]
pub struct Session {
    inner: RwLock<Option<Credentials>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Credentials>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Credentials>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn init(&self, auth: AuthResponse) {
        debug!(user_id = %auth.user.id, "session started");
        *self.write() = Some(Credentials {
            access_token: auth.access_token,
            refresh_token: auth.refresh_token,
            user: auth.user,
        });
    }

    pub fn reset(&self) {
        if self.write().take().is_some() {
            debug!("session cleared");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|c| c.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().as_ref().map(|c| c.refresh_token.clone())
    }

    pub fn user(&self) -> Option<PublicUser> {
        self.read().as_ref().map(|c| c.user.clone())
    }
}

#[cfg(test)]
pub(crate) fn signed_in(email: &str) -> Session {
    use time::OffsetDateTime;
    use uuid::Uuid;

    let session = Session::new();
    session.init(AuthResponse {
        access_token: "access".into(),
        refresh_token: "refresh".into(),
        user: PublicUser {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: "Tester".into(),
            created_at: OffsetDateTime::now_utc(),
        },
    });
    session
}
