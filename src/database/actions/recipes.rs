use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::{Error, QueryError},
    schema::{Id, Recipe, RecipeDraft, RecipeFilter, RecipePart, RecipeRow, RecipeSummary, SetKind},
    services::composition::RecipeComposition,
};

fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(e) => e.is_unique_violation(),
        _ => false,
    }
}

async fn begin(pool: &Pool<Postgres>) -> Result<Transaction<'static, Postgres>, Error> {
    let tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    Ok(tr)
}

async fn commit(tr: Transaction<'static, Postgres>) -> Result<(), Error> {
    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

/// Drops the current lines and tags of a recipe and writes `composition`.
async fn write_composition(
    recipe_id: Id,
    composition: &RecipeComposition,
    tr: &mut Transaction<'static, Postgres>,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(composition.lines(), |mut b, line| {
        b.push_bind(recipe_id)
            .push_bind(line.ingredient_id)
            .push_bind(line.amount);
    });
    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query_builder.push_values(composition.tags(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });
    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn create_recipe(
    author_id: Id,
    draft: &RecipeDraft,
    composition: &RecipeComposition,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let mut tr = begin(pool).await?;

    let id: Option<(Id,)> = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (name) DO NOTHING
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(&draft.image)
    .bind(draft.cooking_time)
    .fetch_optional(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    let Some((id,)) = id else {
        return Err(Error::DuplicateRecipeName(draft.name.to_owned()));
    };

    write_composition(id, composition, &mut tr).await?;
    commit(tr).await?;

    Ok(id)
}

pub async fn update_recipe(
    id: Id,
    draft: &RecipeDraft,
    composition: &RecipeComposition,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut tr = begin(pool).await?;

    let result = sqlx::query(
        "UPDATE recipes SET name = $1, text = $2, image = $3, cooking_time = $4 WHERE id = $5",
    )
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(&draft.image)
    .bind(draft.cooking_time)
    .bind(id)
    .execute(&mut *tr)
    .await;

    match result {
        Ok(result) if result.rows_affected() == 0 => return Err(Error::RecipeNotFound(id)),
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(Error::DuplicateRecipeName(draft.name.to_owned()))
        }
        Err(e) => return Err(QueryError::from(e).into()),
    }

    write_composition(id, composition, &mut tr).await?;
    commit(tr).await
}

pub async fn replace_composition(
    recipe_id: Id,
    composition: &RecipeComposition,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut tr = begin(pool).await?;

    // Row lock keeps a concurrent delete from racing the rewrite.
    let exists: Option<(Id,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = $1 FOR UPDATE")
        .bind(recipe_id)
        .fetch_optional(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    if exists.is_none() {
        return Err(Error::RecipeNotFound(recipe_id));
    }

    write_composition(recipe_id, composition, &mut tr).await?;
    commit(tr).await
}

pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_recipe_parts(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

fn push_recipe_filter(
    query_builder: &mut QueryBuilder<'_, Postgres>,
    filter: &RecipeFilter,
    viewer: Option<Id>,
) {
    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(viewer) = viewer {
        let flags = [
            (SetKind::Favorites, filter.is_favorited),
            (SetKind::ShoppingCart, filter.is_in_shopping_cart),
        ];
        for (kind, flag) in flags {
            let Some(flag) = flag else { continue };
            query_builder
                .push(if flag { " AND EXISTS" } else { " AND NOT EXISTS" })
                .push(format!(
                    " (SELECT 1 FROM {} m WHERE m.recipe_id = r.id AND m.user_id = ",
                    kind.table()
                ))
                .push_bind(viewer)
                .push(")");
        }
    }
}

async fn count_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<i64, Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_recipe_filter(&mut query_builder, filter, viewer);

    let (count,): (i64,) = query_builder
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count)
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<(Vec<Recipe>, i64), Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
    push_recipe_filter(&mut query_builder, filter, viewer);

    query_builder
        .push(" ORDER BY r.name LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset);

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    // A page past the end carries no window count.
    let total_count = match rows.first() {
        Some(row) => row.count,
        None if filter.offset > 0 => count_recipes(filter, viewer, pool).await?,
        None => 0,
    };
    Ok((rows.into_iter().map(Recipe::from).collect(), total_count))
}

pub async fn recipes_by_author(
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeSummary>, Error> {
    let rows: Vec<RecipeSummary> = sqlx::query_as(
        "SELECT id, name, image, cooking_time FROM recipes WHERE author_id = $1 ORDER BY name",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
