//! In-process [`Store`] used when no database is configured and by the tests.
//!
//! All state sits behind one `RwLock`; every conditional write (membership,
//! follow, unique names) checks and mutates under a single write guard.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use indexmap::IndexSet;
use tokio::sync::RwLock;

use crate::{
    error::Error,
    schema::{
        Id, Ingredient, NewIngredient, NewTag, NewUser, Recipe, RecipeDraft, RecipeFilter,
        RecipePart, RecipeSummary, SetKind, Tag, User,
    },
    services::composition::RecipeComposition,
    store::Store,
};

#[derive(Default)]
struct State {
    last_id: Id,
    ingredients: BTreeMap<Id, Ingredient>,
    tags: BTreeMap<Id, Tag>,
    users: BTreeMap<Id, User>,
    recipes: BTreeMap<Id, Recipe>,
    compositions: HashMap<Id, RecipeComposition>,
    // (user_id, recipe_id)
    favorites: IndexSet<(Id, Id)>,
    carts: IndexSet<(Id, Id)>,
    // (subscriber_id, author_id)
    follows: IndexSet<(Id, Id)>,
}

impl State {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    fn set(&self, kind: SetKind) -> &IndexSet<(Id, Id)> {
        match kind {
            SetKind::Favorites => &self.favorites,
            SetKind::ShoppingCart => &self.carts,
        }
    }

    fn set_mut(&mut self, kind: SetKind) -> &mut IndexSet<(Id, Id)> {
        match kind {
            SetKind::Favorites => &mut self.favorites,
            SetKind::ShoppingCart => &mut self.carts,
        }
    }

    fn name_taken(&self, name: &str, except: Option<Id>) -> bool {
        self.recipes
            .values()
            .any(|recipe| recipe.name == name && Some(recipe.id) != except)
    }

    fn parts(&self, recipe_id: Id) -> Vec<RecipePart> {
        let Some(composition) = self.compositions.get(&recipe_id) else {
            return vec![];
        };

        composition
            .lines()
            .iter()
            .filter_map(|line| {
                self.ingredients
                    .get(&line.ingredient_id)
                    .map(|ingredient| RecipePart {
                        recipe_id,
                        ingredient_id: ingredient.id,
                        name: ingredient.name.to_owned(),
                        measurement_unit: ingredient.measurement_unit.to_owned(),
                        amount: line.amount,
                    })
            })
            .collect()
    }

    fn has_tag_slug(&self, recipe_id: Id, slugs: &[String]) -> bool {
        self.compositions
            .get(&recipe_id)
            .map(|composition| {
                composition.tags().iter().any(|id| {
                    self.tags
                        .get(id)
                        .is_some_and(|tag| slugs.contains(&tag.slug))
                })
            })
            .unwrap_or(false)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let rows = items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();

    (rows, total)
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        let state = self.state.read().await;
        let prefix = name_prefix.map(str::to_lowercase).unwrap_or_default();

        let mut list: Vec<Ingredient> = state
            .ingredients
            .values()
            .filter(|ingredient| ingredient.name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(list)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error> {
        Ok(self.state.read().await.ingredients.get(&id).cloned())
    }

    async fn ingredients_by_ids(&self, ids: &[Id]) -> Result<Vec<Ingredient>, Error> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.ingredients.get(id).cloned())
            .collect())
    }

    async fn import_ingredients(&self, items: &[NewIngredient]) -> Result<u64, Error> {
        let mut state = self.state.write().await;
        let mut imported = 0;

        for item in items {
            if state.ingredients.values().any(|i| i.name == item.name) {
                continue;
            }
            let id = state.next_id();
            state.ingredients.insert(
                id,
                Ingredient {
                    id,
                    name: item.name.to_owned(),
                    measurement_unit: item.measurement_unit.to_owned(),
                },
            );
            imported += 1;
        }

        Ok(imported)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        let mut list: Vec<Tag> = self.state.read().await.tags.values().cloned().collect();
        list.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(list)
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error> {
        Ok(self.state.read().await.tags.get(&id).cloned())
    }

    async fn tags_by_ids(&self, ids: &[Id]) -> Result<Vec<Tag>, Error> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.tags.get(id).cloned()).collect())
    }

    async fn import_tags(&self, items: &[NewTag]) -> Result<u64, Error> {
        let mut state = self.state.write().await;
        let mut imported = 0;

        for item in items {
            if state
                .tags
                .values()
                .any(|t| t.name == item.name || t.slug == item.slug)
            {
                continue;
            }
            let id = state.next_id();
            state.tags.insert(
                id,
                Tag {
                    id,
                    name: item.name.to_owned(),
                    slug: item.slug.to_owned(),
                },
            );
            imported += 1;
        }

        Ok(imported)
    }

    async fn create_user(&self, user: &NewUser) -> Result<Option<User>, Error> {
        let mut state = self.state.write().await;

        let taken = state.users.values().any(|existing| {
            existing.email.eq_ignore_ascii_case(&user.email) || existing.username == user.username
        });
        if taken {
            return Ok(None);
        }

        let id = state.next_id();
        let created = User {
            id,
            email: user.email.to_owned(),
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            password: user.password.to_owned(),
            role: user.role,
            avatar: None,
        };
        state.users.insert(id, created.clone());

        Ok(Some(created))
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64), Error> {
        let users: Vec<User> = self.state.read().await.users.values().cloned().collect();
        Ok(page(users, limit, offset))
    }

    async fn set_avatar(&self, user_id: Id, avatar: Option<&str>) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or(Error::UserNotFound(user_id))?;
        user.avatar = avatar.map(str::to_owned);

        Ok(())
    }

    async fn set_password(&self, user_id: Id, password: &str) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or(Error::UserNotFound(user_id))?;
        user.password = password.to_owned();

        Ok(())
    }

    async fn insert_recipe(
        &self,
        author_id: Id,
        draft: &RecipeDraft,
        composition: &RecipeComposition,
    ) -> Result<Id, Error> {
        let mut state = self.state.write().await;
        if state.name_taken(&draft.name, None) {
            return Err(Error::DuplicateRecipeName(draft.name.to_owned()));
        }

        let id = state.next_id();
        state.recipes.insert(
            id,
            Recipe {
                id,
                author_id,
                name: draft.name.to_owned(),
                text: draft.text.to_owned(),
                image: draft.image.to_owned(),
                cooking_time: draft.cooking_time,
            },
        );
        state.compositions.insert(id, composition.clone());

        Ok(id)
    }

    async fn update_recipe(
        &self,
        id: Id,
        draft: &RecipeDraft,
        composition: &RecipeComposition,
    ) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !state.recipes.contains_key(&id) {
            return Err(Error::RecipeNotFound(id));
        }
        if state.name_taken(&draft.name, Some(id)) {
            return Err(Error::DuplicateRecipeName(draft.name.to_owned()));
        }

        if let Some(recipe) = state.recipes.get_mut(&id) {
            recipe.name = draft.name.to_owned();
            recipe.text = draft.text.to_owned();
            recipe.image = draft.image.to_owned();
            recipe.cooking_time = draft.cooking_time;
        }
        state.compositions.insert(id, composition.clone());

        Ok(())
    }

    async fn store_composition(
        &self,
        recipe_id: Id,
        composition: &RecipeComposition,
    ) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !state.recipes.contains_key(&recipe_id) {
            return Err(Error::RecipeNotFound(recipe_id));
        }
        state.compositions.insert(recipe_id, composition.clone());

        Ok(())
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        if state.recipes.remove(&id).is_none() {
            return Ok(false);
        }

        state.compositions.remove(&id);
        state.favorites.retain(|(_, recipe_id)| *recipe_id != id);
        state.carts.retain(|(_, recipe_id)| *recipe_id != id);

        Ok(true)
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error> {
        Ok(self.state.read().await.recipes.get(&id).cloned())
    }

    async fn recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, Error> {
        Ok(self.state.read().await.parts(recipe_id))
    }

    async fn recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error> {
        let state = self.state.read().await;
        let mut list: Vec<Tag> = state
            .compositions
            .get(&recipe_id)
            .map(|composition| {
                composition
                    .tags()
                    .iter()
                    .filter_map(|id| state.tags.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        list.sort_by(|a, b| a.slug.cmp(&b.slug));

        Ok(list)
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<Id>,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        let state = self.state.read().await;

        let mut list: Vec<Recipe> = state
            .recipes
            .values()
            .filter(|recipe| filter.author.map_or(true, |author| recipe.author_id == author))
            .filter(|recipe| filter.tags.is_empty() || state.has_tag_slug(recipe.id, &filter.tags))
            .filter(|recipe| {
                let Some(viewer) = viewer else { return true };
                [
                    (SetKind::Favorites, filter.is_favorited),
                    (SetKind::ShoppingCart, filter.is_in_shopping_cart),
                ]
                .into_iter()
                .all(|(kind, flag)| match flag {
                    Some(flag) => state.set(kind).contains(&(viewer, recipe.id)) == flag,
                    None => true,
                })
            })
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(page(list, filter.limit, filter.offset))
    }

    async fn recipes_by_author(&self, author_id: Id) -> Result<Vec<RecipeSummary>, Error> {
        let state = self.state.read().await;
        let mut list: Vec<RecipeSummary> = state
            .recipes
            .values()
            .filter(|recipe| recipe.author_id == author_id)
            .map(RecipeSummary::from)
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(list)
    }

    async fn insert_membership(
        &self,
        kind: SetKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        if !state.recipes.contains_key(&recipe_id) {
            return Err(Error::RecipeNotFound(recipe_id));
        }

        Ok(state.set_mut(kind).insert((user_id, recipe_id)))
    }

    async fn delete_membership(
        &self,
        kind: SetKind,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        Ok(state.set_mut(kind).shift_remove(&(user_id, recipe_id)))
    }

    async fn is_member(&self, kind: SetKind, user_id: Id, recipe_id: Id) -> Result<bool, Error> {
        Ok(self
            .state
            .read()
            .await
            .set(kind)
            .contains(&(user_id, recipe_id)))
    }

    async fn cart_recipe_parts(&self, user_id: Id) -> Result<Vec<Vec<RecipePart>>, Error> {
        let state = self.state.read().await;
        Ok(state
            .carts
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, recipe_id)| state.parts(*recipe_id))
            .filter(|parts| !parts.is_empty())
            .collect())
    }

    async fn insert_follow(&self, subscriber_id: Id, author_id: Id) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        if subscriber_id == author_id {
            return Err(Error::SelfFollow);
        }
        if !state.users.contains_key(&author_id) {
            return Err(Error::UserNotFound(author_id));
        }

        Ok(state.follows.insert((subscriber_id, author_id)))
    }

    async fn delete_follow(&self, subscriber_id: Id, author_id: Id) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        Ok(state.follows.shift_remove(&(subscriber_id, author_id)))
    }

    async fn is_following(&self, subscriber_id: Id, author_id: Id) -> Result<bool, Error> {
        Ok(self
            .state
            .read()
            .await
            .follows
            .contains(&(subscriber_id, author_id)))
    }

    async fn list_followed(
        &self,
        subscriber_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        let state = self.state.read().await;
        let authors: Vec<User> = state
            .follows
            .iter()
            .filter(|(subscriber, _)| *subscriber == subscriber_id)
            .filter_map(|(_, author)| state.users.get(author).cloned())
            .collect();

        Ok(page(authors, limit, offset))
    }
}
