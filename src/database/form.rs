//! Request payloads and their field checks.

use serde::Deserialize;

use crate::{
    error::Error,
    schema::{Id, IngredientLine},
    EMAIL_MAX_LENGTH, MAX_COOKING_TIME, MIN_COOKING_TIME, MIN_PASSWORD_LENGTH, SLUG_EXTRA_CHARS,
    USERNAME_EXTRA_CHARS, USERNAME_MAX_LENGTH,
};

/// Body of recipe create and update. Every field is optional here so that a
/// missing one is reported as [`Error::MissingField`] rather than a parse
/// failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Option<Vec<IngredientLine>>,
    pub tags: Option<Vec<Id>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPayload {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPasswordPayload {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvatarPayload {
    pub avatar: Option<String>,
}

pub fn require<T>(value: Option<T>, field: &'static str) -> Result<T, Error> {
    value.ok_or(Error::MissingField(field))
}

/// Trims `value` and checks it is non-empty and at most `max` characters.
pub fn check_text(value: &str, field: &'static str, max: usize) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::invalid(field, "must not be blank"));
    }
    if value.chars().count() > max {
        return Err(Error::invalid(field, format!("must be at most {max} characters")));
    }

    Ok(value.to_owned())
}

pub fn check_cooking_time(value: i32) -> Result<i32, Error> {
    if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&value) {
        return Err(Error::invalid(
            "cooking_time",
            format!("must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME}"),
        ));
    }

    Ok(value)
}

pub fn check_slug(value: &str) -> Result<&str, Error> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || SLUG_EXTRA_CHARS.contains(&c));
    if !valid {
        return Err(Error::invalid("slug", format!("'{value}' is not a valid slug")));
    }

    Ok(value)
}

pub fn check_username(value: &str) -> Result<String, Error> {
    let value = check_text(value, "username", USERNAME_MAX_LENGTH)?;
    let valid = value
        .chars()
        .all(|c| c.is_alphanumeric() || USERNAME_EXTRA_CHARS.contains(&c));
    if !valid || value.eq_ignore_ascii_case("me") {
        return Err(Error::invalid("username", format!("'{value}' is not allowed")));
    }

    Ok(value)
}

pub fn check_email(value: &str) -> Result<String, Error> {
    let value = check_text(value, "email", EMAIL_MAX_LENGTH)?;
    let valid = match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(Error::invalid("email", "is not a valid address"));
    }

    Ok(value)
}

pub fn check_password(value: &str) -> Result<&str, Error> {
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::invalid(
            "password",
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }

    Ok(value)
}
