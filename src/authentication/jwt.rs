use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_LIFETIME_HOURS;
use crate::database::schema::User;
use crate::error::StatusError;
use crate::schema::UserRole;

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub username: String,
    pub user_role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: i32, username: String, role: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            user_role: role,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub user_role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), potion::Error> {
        if !action.authenticate(&self) {
            return Err(StatusError::forbidden(
                "You don't have permission to perform this action",
            )
            .into());
        }
        Ok(())
    }

    /// Authors may change their own rows; roles with `any` may change every row.
    pub fn authorize_owner(
        &self,
        owner_id: i32,
        own: ActionType,
        any: ActionType,
    ) -> Result<(), potion::Error> {
        if any.authenticate(&self) {
            return Ok(());
        }
        self.authenticate(own)?;
        if owner_id != self.user_id {
            return Err(StatusError::forbidden("Only the author may modify this recipe").into());
        }
        Ok(())
    }
}

impl Into<SessionData> for JwtSessionData {
    fn into(self) -> SessionData {
        SessionData {
            username: self.username,
            user_id: self.user_id,
            is_admin: self.user_role == UserRole::Admin,
            user_role: self.user_role,
        }
    }
}

/// HS256 key shared with the service that issues session tokens.
#[derive(Clone)]
pub struct SessionKey {
    key: Hmac<Sha256>,
}

impl SessionKey {
    pub fn new(secret: &[u8]) -> Result<Self, potion::Error> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|_| HtmlError::InternalServerError.new("Invalid session secret"))?;

        Ok(Self { key })
    }

    pub fn sign(&self, user: &User) -> Result<String, potion::Error> {
        let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role.to_owned());
        self.sign_claims(&claims)
    }

    pub fn sign_claims(&self, claims: &JwtSessionData) -> Result<String, potion::Error> {
        claims
            .sign_with_key(&self.key)
            .map_err(|_| HtmlError::InternalServerError.new("Failed to sign session"))
    }

    pub fn verify(&self, token: &str) -> Result<JwtSessionData, potion::Error> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| StatusError::new(401, "Invalid session; Invalid token"))?;

        if session.is_expired() {
            return Err(StatusError::new(401, "Invalid session; Token expired").into());
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 3,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ann"),
            last_name: String::from("Cook"),
            password: String::new(),
            avatar: None,
            role,
        }
    }

    #[test]
    fn signed_session_verifies() {
        let key = SessionKey::new(b"test-secret").ok().unwrap();
        let token = key.sign(&user(UserRole::User)).ok().unwrap();

        let session = key.verify(&token).ok().unwrap();
        assert_eq!(session.user_id, 3);
        assert_eq!(session.username, "cook");
    }

    #[test]
    fn foreign_key_is_rejected() {
        let key = SessionKey::new(b"test-secret").ok().unwrap();
        let other = SessionKey::new(b"other-secret").ok().unwrap();
        let token = other.sign(&user(UserRole::User)).ok().unwrap();

        assert!(key.verify(&token).is_err());
        assert!(key.verify("garbage").is_err());
    }

    #[test]
    fn expired_session_is_rejected() {
        let key = SessionKey::new(b"test-secret").ok().unwrap();
        let mut claims = JwtSessionData::new(3, String::from("cook"), UserRole::User);
        claims.exp = Local::now().timestamp() - 60;
        let token = key.sign_claims(&claims).ok().unwrap();

        assert!(key.verify(&token).is_err());
    }

    #[test]
    fn only_author_or_admin_may_modify() {
        let author: SessionData = JwtSessionData::new(3, String::from("cook"), UserRole::User).into();
        let admin: SessionData = JwtSessionData::new(9, String::from("boss"), UserRole::Admin).into();

        let check = |session: &SessionData, owner| {
            session
                .authorize_owner(owner, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes)
                .is_ok()
        };

        assert!(check(&author, 3));
        assert!(!check(&author, 4));
        assert!(check(&admin, 4));
    }
}
