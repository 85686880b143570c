use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{Error, QueryError},
    schema::{Id, NewTag, Tag},
};

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY slug")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn tags_by_ids(ids: &[Id], pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = ANY($1) ORDER BY slug")
        .bind(ids.to_vec())
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(recipe_id: Id, pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.id, t.name, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.slug
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn import_tags(items: &[NewTag], pool: &Pool<Postgres>) -> Result<u64, Error> {
    if items.is_empty() {
        return Ok(0);
    }

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO tags (name, slug) ");
    query_builder.push_values(items, |mut b, tag| {
        b.push_bind(tag.name.to_owned()).push_bind(tag.slug.to_owned());
    });
    query_builder.push(" ON CONFLICT DO NOTHING");

    let result = query_builder
        .build()
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected())
}
