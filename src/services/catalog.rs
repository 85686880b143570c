//! Ingredient and tag reference data.

use std::path::Path;

use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};

use crate::{
    cache::cache::{cached_or, invalidate_catalog_cache, CacheKeyType},
    error::{Error, TypeError},
    form::{check_slug, check_text},
    schema::{Id, Ingredient, NewIngredient, NewTag, Tag},
    store::Store,
    INGREDIENT_NAME_MAX_LENGTH, MEASUREMENT_UNIT_MAX_LENGTH, TAG_NAME_MAX_LENGTH,
};

pub async fn list_ingredients<S: Store + ?Sized>(
    store: &S,
    cache: Option<&MultiplexedConnection>,
    name_prefix: Option<&str>,
) -> Result<Vec<Ingredient>, Error> {
    let prefix = name_prefix.map(str::trim).filter(|prefix| !prefix.is_empty());
    let key = CacheKeyType::Ingredients.new(prefix.map(str::to_lowercase).unwrap_or("*".to_owned()));

    cached_or(key, cache, || store.list_ingredients(prefix)).await
}

pub async fn get_ingredient<S: Store + ?Sized>(store: &S, id: Id) -> Result<Ingredient, Error> {
    store
        .get_ingredient(id)
        .await?
        .ok_or(Error::IngredientNotFound(id))
}

pub async fn list_tags<S: Store + ?Sized>(
    store: &S,
    cache: Option<&MultiplexedConnection>,
) -> Result<Vec<Tag>, Error> {
    cached_or(CacheKeyType::Tags.new("*"), cache, || store.list_tags()).await
}

pub async fn get_tag<S: Store + ?Sized>(store: &S, id: Id) -> Result<Tag, Error> {
    store.get_tag(id).await?.ok_or(Error::TagNotFound(id))
}

/// Reference data as shipped in a catalog file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFile {
    #[serde(default)]
    pub ingredients: Vec<NewIngredient>,
    #[serde(default)]
    pub tags: Vec<NewTag>,
}

impl CatalogFile {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TypeError::new(&format!("Could not read catalog {}: {e}", path.display()))
        })?;

        serde_json::from_str(&raw)
            .map_err(|e| TypeError::new(&format!("Malformed catalog {}: {e}", path.display())).into())
    }
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub ingredients: u64,
    pub tags: u64,
}

/// Imports every entry of `catalog`, skipping names that already exist.
/// Nothing is written when an entry is malformed.
pub async fn import_catalog<S: Store + ?Sized>(
    store: &S,
    cache: Option<&MultiplexedConnection>,
    catalog: &CatalogFile,
) -> Result<ImportSummary, Error> {
    let ingredients = catalog
        .ingredients
        .iter()
        .map(|item| {
            Ok(NewIngredient {
                name: check_text(&item.name, "name", INGREDIENT_NAME_MAX_LENGTH)?,
                measurement_unit: check_text(
                    &item.measurement_unit,
                    "measurement_unit",
                    MEASUREMENT_UNIT_MAX_LENGTH,
                )?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let tags = catalog
        .tags
        .iter()
        .map(|item| {
            Ok(NewTag {
                name: check_text(&item.name, "name", TAG_NAME_MAX_LENGTH)?,
                slug: check_slug(item.slug.trim())?.to_owned(),
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let summary = ImportSummary {
        ingredients: store.import_ingredients(&ingredients).await?,
        tags: store.import_tags(&tags).await?,
    };
    log::info!(
        "Imported {} ingredients and {} tags",
        summary.ingredients,
        summary.tags
    );

    if let Some(cache) = cache {
        if let Err(e) = invalidate_catalog_cache(&mut cache.clone()).await {
            log::error!("> Failed to invalidate catalog cache: {e}");
        }
    }

    Ok(summary)
}
