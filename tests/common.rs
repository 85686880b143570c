//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc, sync::Once};

use foodgram_sdk::{
    form::RecipePayload,
    jwt::SessionData,
    memory::MemoryStore,
    schema::{Id, IngredientLine, NewIngredient, NewTag, NewUser, User, UserRole},
    services::{composition::TagPolicy, recipes},
    store::Store,
};
use tracing_subscriber::EnvFilter;

static INIT_LOGGER: Once = Once::new();

/// Quiet logging unless TEST_LOG names a level.
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let level = std::env::var("TEST_LOG").unwrap_or_else(|_| "warn".to_owned());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(level))
            .with_test_writer()
            .try_init();
    });
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    ingredients: HashMap<String, Id>,
    tags: HashMap<String, Id>,
    users: HashMap<String, User>,
}

const CATALOG: &[(&str, &str)] = &[
    ("flour", "g"),
    ("sugar", "g"),
    ("salt", "g"),
    ("milk", "ml"),
    ("egg", "pcs"),
];

const TAGS: &[(&str, &str)] = &[("Breakfast", "breakfast"), ("Dinner", "dinner")];

impl Fixture {
    pub async fn new() -> Self {
        init_test_logging();
        let store = Arc::new(MemoryStore::new());

        let ingredients: Vec<NewIngredient> = CATALOG
            .iter()
            .map(|(name, unit)| NewIngredient {
                name: name.to_string(),
                measurement_unit: unit.to_string(),
            })
            .collect();
        store.import_ingredients(&ingredients).await.unwrap();
        let tags: Vec<NewTag> = TAGS
            .iter()
            .map(|(name, slug)| NewTag {
                name: name.to_string(),
                slug: slug.to_string(),
            })
            .collect();
        store.import_tags(&tags).await.unwrap();

        let mut users = HashMap::new();
        for (username, role) in [
            ("ann", UserRole::User),
            ("bob", UserRole::User),
            ("root", UserRole::Admin),
        ] {
            let user = store
                .create_user(&NewUser {
                    email: format!("{username}@example.com"),
                    username: username.to_owned(),
                    first_name: username.to_owned(),
                    last_name: "Tester".to_owned(),
                    password: "unused".to_owned(),
                    role,
                })
                .await
                .unwrap()
                .unwrap();
            users.insert(username.to_owned(), user);
        }

        Self {
            ingredients: store
                .list_ingredients(None)
                .await
                .unwrap()
                .into_iter()
                .map(|i| (i.name, i.id))
                .collect(),
            tags: store
                .list_tags()
                .await
                .unwrap()
                .into_iter()
                .map(|t| (t.slug, t.id))
                .collect(),
            store,
            users,
        }
    }

    pub fn ingredient(&self, name: &str) -> Id {
        self.ingredients[name]
    }

    pub fn tag(&self, slug: &str) -> Id {
        self.tags[slug]
    }

    pub fn user(&self, username: &str) -> &User {
        &self.users[username]
    }

    pub fn session(&self, username: &str) -> SessionData {
        let user = self.user(username);
        SessionData {
            user_id: user.id,
            username: user.username.to_owned(),
            role: user.role,
        }
    }

    pub fn lines(&self, lines: &[(&str, i32)]) -> Vec<IngredientLine> {
        lines
            .iter()
            .map(|(name, amount)| IngredientLine {
                ingredient_id: self.ingredient(name),
                amount: *amount,
            })
            .collect()
    }

    pub fn payload(&self, name: &str, lines: &[(&str, i32)], tags: &[&str]) -> RecipePayload {
        RecipePayload {
            name: Some(name.to_owned()),
            text: Some(format!("How to make {name}")),
            image: Some(format!("{name}.png")),
            cooking_time: Some(30),
            ingredients: Some(self.lines(lines)),
            tags: Some(tags.iter().map(|slug| self.tag(slug)).collect()),
        }
    }

    /// Creates a recipe authored by `username` and returns its id.
    pub async fn recipe(
        &self,
        username: &str,
        name: &str,
        lines: &[(&str, i32)],
        tags: &[&str],
    ) -> Id {
        recipes::create_recipe(
            self.store.as_ref(),
            &self.session(username),
            self.payload(name, lines, tags),
            TagPolicy::Strict,
        )
        .await
        .unwrap()
        .id
    }
}
