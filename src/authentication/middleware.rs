use warp::{reject::Rejection, Filter};

use crate::{
    constants::{SESSION_COOKIE, SESSION_HEADER_SCHEME},
    error::StatusError,
};

use super::jwt::{SessionData, SessionKey};

/// Extracts the token from `Authorization: Token <jwt>` (or `Bearer <jwt>`).
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case(SESSION_HEADER_SCHEME) || scheme.eq_ignore_ascii_case("Bearer")
    {
        Some(token)
    } else {
        None
    }
}

/// Resolves the caller's session from the header or the `session` cookie.
/// Invalid or expired tokens behave like an anonymous request.
pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .map(move |header: Option<String>, cookie: Option<String>| {
            let token = header
                .as_deref()
                .and_then(parse_authorization)
                .map(str::to_string)
                .or(cookie)?;

            match key.verify(&token) {
                Ok(data) => Some(data.into()),
                Err(e) => {
                    log::trace!("> Rejected session: {:?}", e.info);
                    None
                }
            }
        })
}

pub fn require_session(session: Option<SessionData>) -> Result<SessionData, potion::Error> {
    session.ok_or_else(|| StatusError::unauthenticated().into())
}
