use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Id, NewUser, User},
};

pub async fn get_user_by_email(email: &str, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(user_id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user whose `password` is already hashed. `None` means the email
/// or username is taken.
pub async fn register_user(user: &NewUser, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password)
    .bind(user.role)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

#[derive(sqlx::FromRow)]
struct UserRow {
    #[sqlx(flatten)]
    user: User,
    count: i64,
}

pub async fn list_users(
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<UserRow> =
        sqlx::query_as("SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if offset > 0 => count_users(pool).await?,
        None => 0,
    };
    Ok((rows.into_iter().map(|row| row.user).collect(), total_count))
}

async fn count_users(pool: &Pool<Postgres>) -> Result<i64, Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count)
}

pub async fn set_avatar(
    user_id: Id,
    avatar: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
        .bind(avatar)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn set_password(
    user_id: Id,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
