use chrono::{Duration, Local};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    error::{Error, TypeError},
    schema::{Id, User, UserRole},
};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(user: &User, ttl: Duration) -> Self {
        let now = Local::now();

        Self {
            user_id: user.id,
            username: user.username.to_owned(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Forbidden);
        }
        Ok(())
    }

    /// Whether the session may manage a resource owned by `owner_id`.
    pub fn can_manage(&self, owner_id: Id, own: ActionType, all: ActionType) -> bool {
        (self.user_id == owner_id && own.authenticate(self)) || all.authenticate(self)
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            role: value.role,
        }
    }
}

/// Signing key and lifetime of session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Result<Self, Error> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|_| TypeError::new("Session secret cannot be used as an HMAC key"))?;

        Ok(Self {
            key,
            ttl: Duration::hours(ttl_hours),
        })
    }

    pub fn generate_session(&self, user: &User) -> Result<String, Error> {
        JwtSessionData::new(user, self.ttl)
            .sign_with_key(&self.key)
            .map_err(|e| Error::Internal(format!("Could not sign session: {e}")))
    }

    pub fn verify_session(&self, token: &str) -> Result<JwtSessionData, Error> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| Error::Unauthenticated)?;

        if session.exp < Local::now().timestamp() {
            log::trace!("> Rejected expired session of user {}", session.user_id);
            return Err(Error::Unauthenticated);
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 7,
            email: "cook@example.com".to_owned(),
            username: "cook".to_owned(),
            first_name: "Ann".to_owned(),
            last_name: "Cook".to_owned(),
            password: String::new(),
            role,
            avatar: None,
        }
    }

    #[test]
    fn signed_session_round_trips() {
        let keys = SessionKeys::new(b"test-secret", 1).unwrap();
        let token = keys.generate_session(&user(UserRole::Admin)).unwrap();

        let session: SessionData = keys.verify_session(&token).unwrap().into();
        assert_eq!(session.user_id, 7);
        assert_eq!(session.role, UserRole::Admin);
    }

    #[test]
    fn foreign_key_is_rejected() {
        let keys = SessionKeys::new(b"test-secret", 1).unwrap();
        let other = SessionKeys::new(b"other-secret", 1).unwrap();
        let token = other.generate_session(&user(UserRole::User)).unwrap();

        assert!(matches!(
            keys.verify_session(&token),
            Err(Error::Unauthenticated)
        ));
    }

    #[test]
    fn expired_session_is_rejected() {
        let keys = SessionKeys::new(b"test-secret", -1).unwrap();
        let token = keys.generate_session(&user(UserRole::User)).unwrap();

        assert!(matches!(
            keys.verify_session(&token),
            Err(Error::Unauthenticated)
        ));
    }
}
