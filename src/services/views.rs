//! Read models returned to clients.

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    schema::{Id, Recipe, RecipePart, RecipeSummary, SetKind, Tag, User},
    store::Store,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserProfile {
    pub fn project(user: &User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email.to_owned(),
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
            avatar: user.avatar.to_owned(),
        }
    }

    /// Projects `user` as seen by `viewer`; anonymous viewers are never
    /// subscribed.
    pub async fn load<S: Store + ?Sized>(
        store: &S,
        user: &User,
        viewer: Option<Id>,
    ) -> Result<Self, Error> {
        let is_subscribed = match viewer {
            Some(viewer) if viewer != user.id => store.is_following(viewer, user.id).await?,
            _ => false,
        };

        Ok(Self::project(user, is_subscribed))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeDetail {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipePart>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeDetail {
    pub fn project(
        recipe: Recipe,
        tags: Vec<Tag>,
        author: UserProfile,
        ingredients: Vec<RecipePart>,
        is_favorited: bool,
        is_in_shopping_cart: bool,
    ) -> Self {
        Self {
            id: recipe.id,
            tags,
            author,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }

    pub async fn load<S: Store + ?Sized>(
        store: &S,
        recipe: Recipe,
        viewer: Option<Id>,
    ) -> Result<Self, Error> {
        let author = store
            .get_user(recipe.author_id)
            .await?
            .ok_or(Error::UserNotFound(recipe.author_id))?;
        let author = UserProfile::load(store, &author, viewer).await?;
        let tags = store.recipe_tags(recipe.id).await?;
        let ingredients = store.recipe_parts(recipe.id).await?;

        let (is_favorited, is_in_shopping_cart) = match viewer {
            Some(viewer) => (
                store.is_member(SetKind::Favorites, viewer, recipe.id).await?,
                store.is_member(SetKind::ShoppingCart, viewer, recipe.id).await?,
            ),
            None => (false, false),
        };

        Ok(Self::project(
            recipe,
            tags,
            author,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        ))
    }
}

/// A followed author with a preview of their recipes.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: usize,
}

impl Subscription {
    /// `recipes_limit` truncates the preview; `recipes_count` always counts
    /// every recipe of the author.
    pub async fn load<S: Store + ?Sized>(
        store: &S,
        author: &User,
        viewer: Id,
        recipes_limit: Option<usize>,
    ) -> Result<Self, Error> {
        let mut recipes = store.recipes_by_author(author.id).await?;
        let recipes_count = recipes.len();
        if let Some(limit) = recipes_limit {
            recipes.truncate(limit);
        }

        Ok(Self {
            author: UserProfile::load(store, author, Some(viewer)).await?,
            recipes,
            recipes_count,
        })
    }
}
