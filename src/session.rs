use crate::store::{cookie_value, Store, StoreError};

pub const TOKEN_COOKIE: &str = "token";

/// Authentication state for one page load.
///
/// Holding any non-empty token counts as being logged in. The token is never
/// decoded or checked for expiry here; the API is the only judge of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Session { token: None }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Session {
            token: Some(token).filter(|t| !t.is_empty()),
        }
    }

    pub fn load(store: &Store) -> Result<Self, StoreError> {
        Ok(match store.get_cookie(TOKEN_COOKIE)? {
            Some(token) => Session::with_token(token),
            None => Session::anonymous(),
        })
    }

    /// Build a session from a raw `Cookie:` header
    pub fn from_cookie_header(header: &str) -> Self {
        match cookie_value(header, TOKEN_COOKIE) {
            Some(token) => Session::with_token(token),
            None => Session::anonymous(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }
}

/// Persist a freshly issued token as a session cookie
pub fn login(store: &Store, token: &str) -> Result<(), StoreError> {
    store.assign(&format!("{TOKEN_COOKIE}={token}; path=/"))
}

pub fn logout(store: &Store) -> Result<(), StoreError> {
    store.assign(&format!(
        "{TOKEN_COOKIE}=; path=/; expires=Thu, 01 Jan 1970 00:00:01 GMT"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_then_logout() {
        let store = Store::new(":memory:").unwrap();
        assert!(!Session::load(&store).unwrap().is_authenticated());

        login(&store, "X").unwrap();
        let session = Session::load(&store).unwrap();
        assert_eq!(session.bearer().as_deref(), Some("Bearer X"));

        logout(&store).unwrap();
        let session = Session::load(&store).unwrap();
        assert_eq!(session.bearer(), None);
    }

    #[test]
    fn empty_token_is_anonymous() {
        assert!(!Session::with_token("").is_authenticated());
        assert!(!Session::from_cookie_header("token=").is_authenticated());
        assert!(Session::from_cookie_header("lang=fr; token=abc").is_authenticated());
    }
}
