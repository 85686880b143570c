use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Id, RecipePart, SetKind},
};

/// Returns `false` when the recipe was already in the set.
pub async fn add_to_set(
    kind: SetKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

/// Returns `false` when the recipe was not in the set.
pub async fn remove_from_set(
    kind: SetKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn is_in_set(
    kind: SetKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let (exists,): (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2)",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(exists)
}

pub async fn list_cart_parts(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<Vec<RecipePart>>, Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_carts sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
        ORDER BY sc.id, ri.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut grouped: Vec<Vec<RecipePart>> = vec![];
    for part in rows {
        match grouped.last_mut() {
            Some(group) if group[0].recipe_id == part.recipe_id => group.push(part),
            _ => grouped.push(vec![part]),
        }
    }

    Ok(grouped)
}
