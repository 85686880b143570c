use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{Error, QueryError},
    schema::{Id, Ingredient, NewIngredient},
};

pub async fn list_ingredients(
    name_prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match name_prefix.filter(|prefix| !prefix.is_empty()) {
        Some(prefix) => sqlx::query_as(
            "SELECT * FROM ingredients WHERE starts_with(LOWER(name), LOWER($1)) ORDER BY name",
        )
        .bind(prefix)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn ingredients_by_ids(
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = ANY($1)")
        .bind(ids.to_vec())
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn import_ingredients(
    items: &[NewIngredient],
    pool: &Pool<Postgres>,
) -> Result<u64, Error> {
    let mut imported = 0;

    // Keeps each statement below the bind parameter limit.
    for chunk in items.chunks(65535 / 2) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk, |mut b, item| {
            b.push_bind(item.name.to_owned())
                .push_bind(item.measurement_unit.to_owned());
        });
        query_builder.push(" ON CONFLICT (name) DO NOTHING");

        imported += query_builder
            .build()
            .execute(pool)
            .await
            .map_err(QueryError::from)?
            .rows_affected();
    }

    Ok(imported)
}
