//! Registration, token login and profiles.

use serde::{Deserialize, Serialize};

use crate::{
    cryptography::{hash_password, verify_password},
    error::Error,
    form::{
        check_email, check_password, check_text, check_username, AvatarPayload, LoginPayload,
        RegisterPayload, SetPasswordPayload,
    },
    jwt::{SessionData, SessionKeys},
    pagination::{clamp_page, PageContext},
    schema::{Id, NewUser, UserRole},
    services::views::UserProfile,
    store::Store,
    USERNAME_MAX_LENGTH, USER_COUNT_PER_PAGE,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub auth_token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub avatar: Option<String>,
}

pub async fn register<S: Store + ?Sized>(
    store: &S,
    payload: RegisterPayload,
) -> Result<UserProfile, Error> {
    let user = NewUser {
        email: check_email(&payload.email)?,
        username: check_username(&payload.username)?,
        first_name: check_text(&payload.first_name, "first_name", USERNAME_MAX_LENGTH)?,
        last_name: check_text(&payload.last_name, "last_name", USERNAME_MAX_LENGTH)?,
        password: hash_password(check_password(&payload.password)?)?,
        role: UserRole::User,
    };

    let Some(created) = store.create_user(&user).await? else {
        return Err(Error::DuplicateUser);
    };

    log::info!("Registered user {} ({})", created.id, created.username);
    Ok(UserProfile::project(&created, false))
}

pub async fn login<S: Store + ?Sized>(
    store: &S,
    keys: &SessionKeys,
    payload: LoginPayload,
) -> Result<AuthToken, Error> {
    let Some(user) = store.find_user_by_email(payload.email.trim()).await? else {
        return Err(Error::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password)? {
        log::warn!("Rejected login for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    Ok(AuthToken {
        auth_token: keys.generate_session(&user)?,
    })
}

pub async fn get_profile<S: Store + ?Sized>(
    store: &S,
    viewer: Option<Id>,
    user_id: Id,
) -> Result<UserProfile, Error> {
    let user = store
        .get_user(user_id)
        .await?
        .ok_or(Error::UserNotFound(user_id))?;

    UserProfile::load(store, &user, viewer).await
}

pub async fn me<S: Store + ?Sized>(store: &S, session: &SessionData) -> Result<UserProfile, Error> {
    get_profile(store, Some(session.user_id), session.user_id)
        .await
        .map_err(|e| match e {
            Error::UserNotFound(_) => Error::Unauthenticated,
            e => e,
        })
}

/// Changes the caller's password after checking the current one.
pub async fn set_password<S: Store + ?Sized>(
    store: &S,
    session: &SessionData,
    payload: SetPasswordPayload,
) -> Result<(), Error> {
    let user = store
        .get_user(session.user_id)
        .await?
        .ok_or(Error::Unauthenticated)?;

    if !verify_password(&payload.current_password, &user.password)? {
        log::warn!("Rejected password change for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let password = hash_password(check_password(&payload.new_password)?)?;
    store.set_password(user.id, &password).await?;

    log::info!("User {} changed their password", user.id);
    Ok(())
}

pub async fn list_users<S: Store + ?Sized>(
    store: &S,
    viewer: Option<Id>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<PageContext<UserProfile>, Error> {
    let (limit, offset) = clamp_page(limit, offset, USER_COUNT_PER_PAGE);
    let (users, total) = store.list_users(limit, offset).await?;

    let mut results = Vec::with_capacity(users.len());
    for user in users.iter() {
        results.push(UserProfile::load(store, user, viewer).await?);
    }

    Ok(PageContext::from_rows(results, total, limit, offset))
}

pub async fn set_avatar<S: Store + ?Sized>(
    store: &S,
    session: &SessionData,
    payload: AvatarPayload,
) -> Result<Avatar, Error> {
    let avatar = check_text(
        &payload.avatar.ok_or(Error::MissingField("avatar"))?,
        "avatar",
        usize::MAX,
    )?;
    store.set_avatar(session.user_id, Some(&avatar)).await?;

    Ok(Avatar {
        avatar: Some(avatar),
    })
}

pub async fn delete_avatar<S: Store + ?Sized>(
    store: &S,
    session: &SessionData,
) -> Result<(), Error> {
    store.set_avatar(session.user_id, None).await
}
