use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Id, User},
};

pub async fn add_follow(
    subscriber_id: Id,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result = sqlx::query(
        "INSERT INTO follows (author_id, subscriber_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(author_id)
    .bind(subscriber_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn remove_follow(
    subscriber_id: Id,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM follows WHERE author_id = $1 AND subscriber_id = $2")
        .bind(author_id)
        .bind(subscriber_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn is_following(
    subscriber_id: Id,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM follows WHERE author_id = $1 AND subscriber_id = $2)",
    )
    .bind(author_id)
    .bind(subscriber_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(exists)
}

#[derive(sqlx::FromRow)]
struct FollowedRow {
    #[sqlx(flatten)]
    user: User,
    count: i64,
}

/// Authors followed by `subscriber_id`, oldest subscription first.
pub async fn list_followed(
    subscriber_id: Id,
    limit: i64,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<FollowedRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.subscriber_id = $1
        ORDER BY f.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(subscriber_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if offset > 0 => count_followed(subscriber_id, pool).await?,
        None => 0,
    };
    Ok((rows.into_iter().map(|row| row.user).collect(), total_count))
}

async fn count_followed(subscriber_id: Id, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE subscriber_id = $1")
        .bind(subscriber_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count)
}
