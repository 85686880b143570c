//! Recipe lifecycle: create, read, update, delete and listing.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    error::Error,
    form::{check_cooking_time, check_text, require, RecipePayload},
    jwt::SessionData,
    pagination::{clamp_page, PageContext},
    permissions::ActionType,
    schema::{Id, IngredientLine, Recipe, RecipeDraft, RecipeFilter},
    services::{
        composition::{RecipeComposition, TagPolicy},
        views::RecipeDetail,
    },
    store::Store,
    RECIPE_COUNT_PER_PAGE, RECIPE_NAME_MAX_LENGTH,
};

/// Validates `lines` and `tags` against the catalog entries they reference.
pub async fn compose<S: Store + ?Sized>(
    store: &S,
    lines: Vec<IngredientLine>,
    tags: Vec<Id>,
    policy: TagPolicy,
) -> Result<RecipeComposition, Error> {
    let ingredient_ids: Vec<Id> = lines.iter().map(|line| line.ingredient_id).collect();
    let known_ingredients: HashSet<Id> = store
        .ingredients_by_ids(&ingredient_ids)
        .await?
        .into_iter()
        .map(|ingredient| ingredient.id)
        .collect();
    let known_tags: HashSet<Id> = store
        .tags_by_ids(&tags)
        .await?
        .into_iter()
        .map(|tag| tag.id)
        .collect();

    RecipeComposition::new(lines, tags, &known_ingredients, &known_tags, policy)
}

/// Replaces the ingredient lines and tags of a recipe. Nothing is written
/// unless both lists validate.
pub async fn replace_composition<S: Store + ?Sized>(
    store: &S,
    recipe_id: Id,
    lines: Vec<IngredientLine>,
    tags: Vec<Id>,
    policy: TagPolicy,
) -> Result<RecipeComposition, Error> {
    if store.get_recipe(recipe_id).await?.is_none() {
        return Err(Error::RecipeNotFound(recipe_id));
    }

    let composition = compose(store, lines, tags, policy).await?;
    store.store_composition(recipe_id, &composition).await?;

    log::info!("Replaced composition of recipe {recipe_id}");
    Ok(composition)
}

fn check_image(image: &str) -> Result<String, Error> {
    check_text(image, "image", usize::MAX)
}

fn new_draft(payload: &RecipePayload) -> Result<RecipeDraft, Error> {
    Ok(RecipeDraft {
        name: check_text(
            require(payload.name.as_deref(), "name")?,
            "name",
            RECIPE_NAME_MAX_LENGTH,
        )?,
        text: check_text(require(payload.text.as_deref(), "text")?, "text", usize::MAX)?,
        image: Some(check_image(require(payload.image.as_deref(), "image")?)?),
        cooking_time: check_cooking_time(require(payload.cooking_time, "cooking_time")?)?,
    })
}

/// Fields absent from `payload` keep their stored values.
fn merged_draft(payload: &RecipePayload, stored: &Recipe) -> Result<RecipeDraft, Error> {
    Ok(RecipeDraft {
        name: match payload.name.as_deref() {
            Some(name) => check_text(name, "name", RECIPE_NAME_MAX_LENGTH)?,
            None => stored.name.to_owned(),
        },
        text: match payload.text.as_deref() {
            Some(text) => check_text(text, "text", usize::MAX)?,
            None => stored.text.to_owned(),
        },
        image: match payload.image.as_deref() {
            Some(image) => Some(check_image(image)?),
            None => stored.image.to_owned(),
        },
        cooking_time: match payload.cooking_time {
            Some(cooking_time) => check_cooking_time(cooking_time)?,
            None => stored.cooking_time,
        },
    })
}

async fn load_recipe<S: Store + ?Sized>(store: &S, id: Id) -> Result<Recipe, Error> {
    store.get_recipe(id).await?.ok_or(Error::RecipeNotFound(id))
}

pub async fn create_recipe<S: Store + ?Sized>(
    store: &S,
    session: &SessionData,
    payload: RecipePayload,
    policy: TagPolicy,
) -> Result<RecipeDetail, Error> {
    session.authenticate(ActionType::CreateRecipes)?;

    let draft = new_draft(&payload)?;
    let lines = require(payload.ingredients, "ingredients")?;
    let tags = require(payload.tags, "tags")?;
    let composition = compose(store, lines, tags, policy).await?;

    let id = store
        .insert_recipe(session.user_id, &draft, &composition)
        .await?;
    log::info!("User {} created recipe {id}", session.user_id);

    let recipe = load_recipe(store, id).await?;
    RecipeDetail::load(store, recipe, Some(session.user_id)).await
}

/// Rewrites a recipe. The ingredient and tag lists are always replaced in
/// full, so both must be present.
pub async fn update_recipe<S: Store + ?Sized>(
    store: &S,
    session: &SessionData,
    id: Id,
    payload: RecipePayload,
    policy: TagPolicy,
) -> Result<RecipeDetail, Error> {
    let stored = load_recipe(store, id).await?;
    if !session.can_manage(
        stored.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    ) {
        log::warn!("User {} may not edit recipe {id}", session.user_id);
        return Err(Error::Forbidden);
    }

    let draft = merged_draft(&payload, &stored)?;
    let lines = require(payload.ingredients, "ingredients")?;
    let tags = require(payload.tags, "tags")?;
    let composition = compose(store, lines, tags, policy).await?;

    store.update_recipe(id, &draft, &composition).await?;
    log::info!("User {} updated recipe {id}", session.user_id);

    let recipe = load_recipe(store, id).await?;
    RecipeDetail::load(store, recipe, Some(session.user_id)).await
}

pub async fn delete_recipe<S: Store + ?Sized>(
    store: &S,
    session: &SessionData,
    id: Id,
) -> Result<(), Error> {
    let stored = load_recipe(store, id).await?;
    if !session.can_manage(
        stored.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    ) {
        log::warn!("User {} may not delete recipe {id}", session.user_id);
        return Err(Error::Forbidden);
    }

    if !store.delete_recipe(id).await? {
        return Err(Error::RecipeNotFound(id));
    }

    log::info!("User {} deleted recipe {id}", session.user_id);
    Ok(())
}

pub async fn get_recipe<S: Store + ?Sized>(
    store: &S,
    viewer: Option<Id>,
    id: Id,
) -> Result<RecipeDetail, Error> {
    let recipe = load_recipe(store, id).await?;
    RecipeDetail::load(store, recipe, viewer).await
}

fn parse_flag(field: &'static str, value: &str) -> Result<bool, Error> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(Error::invalid(field, "expected 0 or 1")),
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, Error> {
    value
        .parse()
        .map_err(|_| Error::invalid(field, "expected a number"))
}

/// Builds a listing filter from raw query pairs. `tags` may repeat.
pub fn recipe_filter(pairs: &[(String, String)]) -> Result<RecipeFilter, Error> {
    let mut filter = RecipeFilter::default();
    let mut limit = None;
    let mut offset = None;

    for (key, value) in pairs {
        match key.as_str() {
            "author" => filter.author = Some(parse_number("author", value)?),
            "tags" => filter.tags.push(value.to_owned()),
            "is_favorited" => filter.is_favorited = Some(parse_flag("is_favorited", value)?),
            "is_in_shopping_cart" => {
                filter.is_in_shopping_cart = Some(parse_flag("is_in_shopping_cart", value)?)
            }
            "limit" => limit = Some(parse_number("limit", value)?),
            "offset" => offset = Some(parse_number("offset", value)?),
            _ => {}
        }
    }

    (filter.limit, filter.offset) = clamp_page(limit, offset, RECIPE_COUNT_PER_PAGE);
    Ok(filter)
}

pub async fn list_recipes<S: Store + ?Sized>(
    store: &S,
    viewer: Option<Id>,
    mut filter: RecipeFilter,
) -> Result<PageContext<RecipeDetail>, Error> {
    if viewer.is_none() {
        filter.is_favorited = None;
        filter.is_in_shopping_cart = None;
    }

    let (recipes, total) = store.fetch_recipes(&filter, viewer).await?;

    let mut results = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        results.push(RecipeDetail::load(store, recipe, viewer).await?);
    }

    Ok(PageContext::from_rows(
        results,
        total,
        filter.limit,
        filter.offset,
    ))
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShortLink {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

pub async fn short_link<S: Store + ?Sized>(
    store: &S,
    base_url: &str,
    id: Id,
) -> Result<ShortLink, Error> {
    load_recipe(store, id).await?;

    Ok(ShortLink {
        short_link: format!("{base_url}/r/{id}"),
    })
}
