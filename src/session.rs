use crate::api::models::User;
use crate::error::Result;
use crate::storage::LocalStorage;

/// Where the app should land given what is in local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    SetAvatar,
    Chat,
}

/// The logged-in user, serialized as JSON under one configured key.
///
/// Presence of the record is the only client-side gate; the backend does its
/// own checks on every call.
#[derive(Debug, Clone)]
pub struct SessionStore {
    storage: LocalStorage,
    key: String,
}

impl SessionStore {
    pub fn new(storage: LocalStorage, key: impl Into<String>) -> Self {
        Self { storage, key: key.into() }
    }

    pub fn open_default(key: &str) -> Result<Self> {
        Ok(Self::new(LocalStorage::open_default()?, key))
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// A record that no longer parses counts as logged out and is removed.
    pub fn load(&self) -> Result<Option<User>> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                log::warn!("discarding unreadable session record: {e}");
                self.storage.remove_item(&self.key)?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.storage.set_item(&self.key, &raw)?;
        log::debug!("session stored for {}", user.username);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.clear()
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.load(), Ok(Some(_)))
    }
}

/// Gate for the chat page: no session goes to login, a session without an
/// avatar goes to avatar setup.
pub fn route(session: &SessionStore) -> Route {
    match session.load() {
        Ok(Some(user)) if user.is_avatar_image_set => Route::Chat,
        Ok(Some(_)) => Route::SetAvatar,
        Ok(None) => Route::Login,
        Err(e) => {
            log::error!("cannot read session: {e}");
            Route::Login
        }
    }
}

/// Login and register forms bounce to the chat page when a session already exists.
pub fn guard_auth_page(session: &SessionStore, page: Route) -> Route {
    if session.is_logged_in() { route(session) } else { page }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::new(LocalStorage::open(dir.path().join("local.sqlite")).unwrap(), "chat-app-user")
    }

    fn user(avatar: bool) -> User {
        User {
            id: "u1".into(),
            username: "ana".into(),
            email: Some("ana@example.org".into()),
            avatar_image: if avatar { "PHN2Zy8+".into() } else { String::new() },
            is_avatar_image_set: avatar,
        }
    }

    #[test]
    fn routes_follow_session_state() {
        let dir = tempfile::tempdir().unwrap();
        let session = store(&dir);
        assert_eq!(route(&session), Route::Login);
        assert_eq!(guard_auth_page(&session, Route::Register), Route::Register);

        session.save(&user(false)).unwrap();
        assert_eq!(route(&session), Route::SetAvatar);

        session.save(&user(true)).unwrap();
        assert_eq!(route(&session), Route::Chat);
        assert_eq!(guard_auth_page(&session, Route::Login), Route::Chat);

        session.clear().unwrap();
        assert_eq!(route(&session), Route::Login);
    }

    #[test]
    fn stored_record_uses_backend_shape() {
        let dir = tempfile::tempdir().unwrap();
        let session = store(&dir);
        session.save(&user(true)).unwrap();
        let raw = session.storage().get_item("chat-app-user").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["_id"], "u1");
        assert_eq!(json["isAvatarImageSet"], true);
        assert_eq!(session.load().unwrap(), Some(user(true)));
    }

    #[test]
    fn corrupt_record_reads_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let session = store(&dir);
        session.storage().set_item("chat-app-user", "{not json").unwrap();
        session.storage().set_item("theme", "dark").unwrap();
        assert_eq!(session.load().unwrap(), None);
        assert_eq!(session.storage().get_item("chat-app-user").unwrap(), None);
        assert_eq!(session.storage().get_item("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(route(&session), Route::Login);
    }
}
