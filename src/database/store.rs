//! Persistence seam used by the services and the HTTP layer.
//!
//! Every write that enforces a uniqueness rule reports the outcome instead of
//! probing first: `insert_*` returns `false` when the row already existed and
//! `delete_*` returns `false` when there was nothing to delete.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    actions::{follows, ingredients, memberships, recipes, tags, users},
    error::{Error, QueryError},
    schema::{
        Id, Ingredient, NewIngredient, NewTag, NewUser, Recipe, RecipeDraft, RecipeFilter,
        RecipePart, RecipeSummary, SetKind, Tag, User,
    },
    services::composition::RecipeComposition,
};

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error>;
    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error>;
    async fn ingredients_by_ids(&self, ids: &[Id]) -> Result<Vec<Ingredient>, Error>;
    /// Inserts catalog entries, skipping names that already exist.
    async fn import_ingredients(&self, ingredients: &[NewIngredient]) -> Result<u64, Error>;

    async fn list_tags(&self) -> Result<Vec<Tag>, Error>;
    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error>;
    async fn tags_by_ids(&self, ids: &[Id]) -> Result<Vec<Tag>, Error>;
    async fn import_tags(&self, tags: &[NewTag]) -> Result<u64, Error>;

    /// Returns `None` when the email or username is taken.
    async fn create_user(&self, user: &NewUser) -> Result<Option<User>, Error>;
    async fn get_user(&self, id: Id) -> Result<Option<User>, Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error>;
    async fn set_avatar(&self, user_id: Id, avatar: Option<&str>) -> Result<(), Error>;
    /// Stores an already hashed password.
    async fn set_password(&self, user_id: Id, password: &str) -> Result<(), Error>;

    async fn insert_recipe(
        &self,
        author_id: Id,
        draft: &RecipeDraft,
        composition: &RecipeComposition,
    ) -> Result<Id, Error>;
    async fn update_recipe(
        &self,
        id: Id,
        draft: &RecipeDraft,
        composition: &RecipeComposition,
    ) -> Result<(), Error>;
    /// Replaces the lines and tags of a recipe in one step.
    async fn store_composition(
        &self,
        recipe_id: Id,
        composition: &RecipeComposition,
    ) -> Result<(), Error>;
    async fn delete_recipe(&self, id: Id) -> Result<bool, Error>;
    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error>;
    async fn recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, Error>;
    async fn recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error>;
    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<Id>,
    ) -> Result<(Vec<Recipe>, i64), Error>;
    /// All recipes of an author in name order.
    async fn recipes_by_author(&self, author_id: Id) -> Result<Vec<RecipeSummary>, Error>;

    async fn insert_membership(&self, kind: SetKind, user_id: Id, recipe_id: Id)
        -> Result<bool, Error>;
    async fn delete_membership(&self, kind: SetKind, user_id: Id, recipe_id: Id)
        -> Result<bool, Error>;
    async fn is_member(&self, kind: SetKind, user_id: Id, recipe_id: Id) -> Result<bool, Error>;
    /// Resolved ingredient lines of every recipe in the cart, in cart order.
    async fn cart_recipe_parts(&self, user_id: Id) -> Result<Vec<Vec<RecipePart>>, Error>;

    async fn insert_follow(&self, subscriber_id: Id, author_id: Id) -> Result<bool, Error>;
    async fn delete_follow(&self, subscriber_id: Id, author_id: Id) -> Result<bool, Error>;
    async fn is_following(&self, subscriber_id: Id, author_id: Id) -> Result<bool, Error>;
    async fn list_followed(
        &self,
        subscriber_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error>;
}

/// [`Store`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(QueryError::from)?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| QueryError::new(format!("Migration failed: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        ingredients::list_ingredients(name_prefix, &self.pool).await
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error> {
        ingredients::get_ingredient(id, &self.pool).await
    }

    async fn ingredients_by_ids(&self, ids: &[Id]) -> Result<Vec<Ingredient>, Error> {
        ingredients::ingredients_by_ids(ids, &self.pool).await
    }

    async fn import_ingredients(&self, items: &[NewIngredient]) -> Result<u64, Error> {
        ingredients::import_ingredients(items, &self.pool).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        tags::list_tags(&self.pool).await
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error> {
        tags::get_tag(id, &self.pool).await
    }

    async fn tags_by_ids(&self, ids: &[Id]) -> Result<Vec<Tag>, Error> {
        tags::tags_by_ids(ids, &self.pool).await
    }

    async fn import_tags(&self, items: &[NewTag]) -> Result<u64, Error> {
        tags::import_tags(items, &self.pool).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<Option<User>, Error> {
        users::register_user(user, &self.pool).await
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error> {
        users::get_user_by_id(id, &self.pool).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        users::get_user_by_email(email, &self.pool).await
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error> {
        users::list_users(limit, offset, &self.pool).await
    }

    async fn set_avatar(&self, user_id: Id, avatar: Option<&str>) -> Result<(), Error> {
        users::set_avatar(user_id, avatar, &self.pool).await
    }

    async fn set_password(&self, user_id: Id, password: &str) -> Result<(), Error> {
        users::set_password(user_id, password, &self.pool).await
    }

    async fn insert_recipe(
        &self,
        author_id: Id,
        draft: &RecipeDraft,
        composition: &RecipeComposition,
    ) -> Result<Id, Error> {
        recipes::create_recipe(author_id, draft, composition, &self.pool).await
    }

    async fn update_recipe(
        &self,
        id: Id,
        draft: &RecipeDraft,
        composition: &RecipeComposition,
    ) -> Result<(), Error> {
        recipes::update_recipe(id, draft, composition, &self.pool).await
    }

    async fn store_composition(
        &self,
        recipe_id: Id,
        composition: &RecipeComposition,
    ) -> Result<(), Error> {
        recipes::replace_composition(recipe_id, composition, &self.pool).await
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, Error> {
        recipes::delete_recipe(id, &self.pool).await
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error> {
        recipes::get_recipe(id, &self.pool).await
    }

    async fn recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, Error> {
        recipes::list_recipe_parts(recipe_id, &self.pool).await
    }

    async fn recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error> {
        tags::list_recipe_tags(recipe_id, &self.pool).await
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<Id>,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        recipes::fetch_recipes(filter, viewer, &self.pool).await
    }

    async fn recipes_by_author(&self, author_id: Id) -> Result<Vec<RecipeSummary>, Error> {
        recipes::recipes_by_author(author_id, &self.pool).await
    }

    async fn insert_membership(
        &self,
        kind: SetKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        memberships::add_to_set(kind, user_id, recipe_id, &self.pool).await
    }

    async fn delete_membership(
        &self,
        kind: SetKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        memberships::remove_from_set(kind, user_id, recipe_id, &self.pool).await
    }

    async fn is_member(&self, kind: SetKind, user_id: Id, recipe_id: Id) -> Result<bool, Error> {
        memberships::is_in_set(kind, user_id, recipe_id, &self.pool).await
    }

    async fn cart_recipe_parts(&self, user_id: Id) -> Result<Vec<Vec<RecipePart>>, Error> {
        memberships::list_cart_parts(user_id, &self.pool).await
    }

    async fn insert_follow(&self, subscriber_id: Id, author_id: Id) -> Result<bool, Error> {
        follows::add_follow(subscriber_id, author_id, &self.pool).await
    }

    async fn delete_follow(&self, subscriber_id: Id, author_id: Id) -> Result<bool, Error> {
        follows::remove_follow(subscriber_id, author_id, &self.pool).await
    }

    async fn is_following(&self, subscriber_id: Id, author_id: Id) -> Result<bool, Error> {
        follows::is_following(subscriber_id, author_id, &self.pool).await
    }

    async fn list_followed(
        &self,
        subscriber_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        follows::list_followed(subscriber_id, limit, offset, &self.pool).await
    }
}
