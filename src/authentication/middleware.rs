use warp::{reject::Rejection, Filter};

use crate::error::Error;

use super::jwt::{SessionData, SessionKeys};

const TOKEN_SCHEMES: &[&str] = &["Token ", "Bearer "];

fn parse_token(header: &str) -> Result<&str, Error> {
    TOKEN_SCHEMES
        .iter()
        .find_map(|scheme| header.strip_prefix(scheme))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(Error::Unauthenticated)
}

async fn resolve_session(
    header: Option<String>,
    keys: SessionKeys,
) -> Result<Option<SessionData>, Rejection> {
    let Some(header) = header else {
        return Ok(None);
    };

    parse_token(&header)
        .and_then(|token| keys.verify_session(token))
        .map(|session| Some(session.into()))
        .map_err(warp::reject::custom)
}

/// Session of the caller; anonymous callers are rejected.
pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_possible_session(keys).and_then(|session: Option<SessionData>| async move {
        session.ok_or_else(|| warp::reject::custom(Error::Unauthenticated))
    })
}

/// Session of the caller if an `Authorization` header is present. A header
/// carrying an invalid token is still rejected.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and_then(move |header: Option<String>| resolve_session(header, keys.clone()))
}
