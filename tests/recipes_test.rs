mod common;

use common::Fixture;
use foodgram_sdk::{
    error::Error,
    form::RecipePayload,
    pagination::PageContext,
    schema::SetKind,
    services::{
        composition::TagPolicy,
        membership::add_membership,
        recipes::{
            create_recipe, delete_recipe, get_recipe, list_recipes, recipe_filter,
            replace_composition, update_recipe,
        },
        views::RecipeDetail,
    },
    store::Store,
};

fn names(page: PageContext<RecipeDetail>) -> Vec<String> {
    page.results.into_iter().map(|detail| detail.name).collect()
}

fn query(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn created_recipe_projects_its_composition() {
    let fx = Fixture::new().await;
    let ann = fx.session("ann");

    let detail = create_recipe(
        fx.store.as_ref(),
        &ann,
        fx.payload("Pancakes", &[("flour", 200), ("milk", 300)], &["breakfast"]),
        TagPolicy::Strict,
    )
    .await
    .unwrap();

    assert_eq!(detail.author.id, ann.user_id);
    assert_eq!(detail.tags.len(), 1);
    assert_eq!(detail.tags[0].slug, "breakfast");
    let amounts: Vec<(&str, i32)> = detail
        .ingredients
        .iter()
        .map(|part| (part.name.as_str(), part.amount))
        .collect();
    assert_eq!(amounts, vec![("flour", 200), ("milk", 300)]);
    assert!(!detail.is_favorited);
}

#[tokio::test]
async fn duplicate_ingredient_is_rejected_on_create() {
    let fx = Fixture::new().await;

    let err = create_recipe(
        fx.store.as_ref(),
        &fx.session("ann"),
        fx.payload("Pancakes", &[("flour", 200), ("flour", 100)], &["breakfast"]),
        TagPolicy::Strict,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::DuplicateIngredient(id) if id == fx.ingredient("flour")));
    let (recipes, _) = fx
        .store
        .fetch_recipes(&recipe_filter(&[]).unwrap(), None)
        .await
        .unwrap();
    assert!(recipes.is_empty());
}

#[tokio::test]
async fn recipe_names_must_be_unique() {
    let fx = Fixture::new().await;
    fx.recipe("ann", "Pancakes", &[("flour", 200)], &["breakfast"])
        .await;

    let err = create_recipe(
        fx.store.as_ref(),
        &fx.session("bob"),
        fx.payload("Pancakes", &[("flour", 100)], &["breakfast"]),
        TagPolicy::Strict,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::DuplicateRecipeName(_)));
}

#[tokio::test]
async fn failed_replacement_keeps_the_stored_composition() {
    let fx = Fixture::new().await;
    let recipe = fx
        .recipe("ann", "Pancakes", &[("flour", 200)], &["breakfast"])
        .await;

    let err = replace_composition(
        fx.store.as_ref(),
        recipe,
        fx.lines(&[("sugar", 10), ("sugar", 20)]),
        vec![fx.tag("dinner")],
        TagPolicy::Strict,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateIngredient(_)));

    let err = replace_composition(
        fx.store.as_ref(),
        recipe,
        fx.lines(&[("sugar", 10)]),
        vec![],
        TagPolicy::Strict,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::EmptyList("tags")));

    let parts = fx.store.recipe_parts(recipe).await.unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].name, "flour");
    let tags = fx.store.recipe_tags(recipe).await.unwrap();
    assert_eq!(tags[0].slug, "breakfast");
}

#[tokio::test]
async fn successful_replacement_matches_the_input_exactly() {
    let fx = Fixture::new().await;
    let recipe = fx
        .recipe("ann", "Pancakes", &[("flour", 200)], &["breakfast"])
        .await;

    replace_composition(
        fx.store.as_ref(),
        recipe,
        fx.lines(&[("sugar", 10), ("egg", 2)]),
        vec![fx.tag("dinner"), fx.tag("breakfast")],
        TagPolicy::Strict,
    )
    .await
    .unwrap();

    let parts: Vec<(String, i32)> = fx
        .store
        .recipe_parts(recipe)
        .await
        .unwrap()
        .into_iter()
        .map(|part| (part.name, part.amount))
        .collect();
    assert_eq!(parts, vec![("sugar".to_owned(), 10), ("egg".to_owned(), 2)]);
    let slugs: Vec<String> = fx
        .store
        .recipe_tags(recipe)
        .await
        .unwrap()
        .into_iter()
        .map(|tag| tag.slug)
        .collect();
    assert_eq!(slugs, vec!["breakfast", "dinner"]);
}

#[tokio::test]
async fn replacement_of_a_missing_recipe_is_not_found() {
    let fx = Fixture::new().await;

    let err = replace_composition(
        fx.store.as_ref(),
        777,
        fx.lines(&[("sugar", 10)]),
        vec![fx.tag("dinner")],
        TagPolicy::Strict,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::RecipeNotFound(777)));
}

#[tokio::test]
async fn unknown_tags_follow_the_policy() {
    let fx = Fixture::new().await;
    let recipe = fx
        .recipe("ann", "Pancakes", &[("flour", 200)], &["breakfast"])
        .await;

    let err = replace_composition(
        fx.store.as_ref(),
        recipe,
        fx.lines(&[("flour", 200)]),
        vec![fx.tag("dinner"), 999],
        TagPolicy::Strict,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::UnknownTag(ids) if ids == vec![999]));

    let composition = replace_composition(
        fx.store.as_ref(),
        recipe,
        fx.lines(&[("flour", 200)]),
        vec![fx.tag("dinner"), 999],
        TagPolicy::Lenient,
    )
    .await
    .unwrap();
    assert_eq!(composition.tags(), &[fx.tag("dinner")]);
}

#[tokio::test]
async fn update_without_ingredients_changes_nothing() {
    let fx = Fixture::new().await;
    let ann = fx.session("ann");
    let recipe = fx
        .recipe("ann", "Pancakes", &[("flour", 200)], &["breakfast"])
        .await;

    let payload = RecipePayload {
        name: Some("Crepes".to_owned()),
        tags: Some(vec![fx.tag("dinner")]),
        ..Default::default()
    };
    let err = update_recipe(fx.store.as_ref(), &ann, recipe, payload, TagPolicy::Strict)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingField("ingredients")));
    let stored = fx.store.get_recipe(recipe).await.unwrap().unwrap();
    assert_eq!(stored.name, "Pancakes");
}

#[tokio::test]
async fn only_the_author_or_an_admin_may_update() {
    let fx = Fixture::new().await;
    let recipe = fx
        .recipe("ann", "Pancakes", &[("flour", 200)], &["breakfast"])
        .await;
    let payload = fx.payload("Crepes", &[("flour", 150)], &["breakfast"]);

    let err = update_recipe(
        fx.store.as_ref(),
        &fx.session("bob"),
        recipe,
        payload.clone(),
        TagPolicy::Strict,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Forbidden));

    let detail = update_recipe(
        fx.store.as_ref(),
        &fx.session("root"),
        recipe,
        payload,
        TagPolicy::Strict,
    )
    .await
    .unwrap();
    assert_eq!(detail.name, "Crepes");
    assert_eq!(detail.ingredients[0].amount, 150);
}

#[tokio::test]
async fn delete_removes_recipe_and_memberships() {
    let fx = Fixture::new().await;
    let bob = fx.session("bob");
    let recipe = fx
        .recipe("ann", "Pancakes", &[("flour", 200)], &["breakfast"])
        .await;
    add_membership(fx.store.as_ref(), bob.user_id, recipe, SetKind::Favorites)
        .await
        .unwrap();

    assert!(matches!(
        delete_recipe(fx.store.as_ref(), &bob, recipe).await,
        Err(Error::Forbidden)
    ));
    delete_recipe(fx.store.as_ref(), &fx.session("ann"), recipe)
        .await
        .unwrap();

    assert!(matches!(
        get_recipe(fx.store.as_ref(), None, recipe).await,
        Err(Error::RecipeNotFound(_))
    ));
    assert!(!fx
        .store
        .is_member(SetKind::Favorites, bob.user_id, recipe)
        .await
        .unwrap());
}

#[tokio::test]
async fn listing_filters_by_tag_author_and_membership() {
    let fx = Fixture::new().await;
    let bob = fx.session("bob").user_id;
    let pancakes = fx
        .recipe("ann", "Pancakes", &[("flour", 200)], &["breakfast"])
        .await;
    fx.recipe("ann", "Stew", &[("salt", 5)], &["dinner"]).await;
    fx.recipe("bob", "Omelette", &[("egg", 3)], &["breakfast"])
        .await;
    add_membership(fx.store.as_ref(), bob, pancakes, SetKind::Favorites)
        .await
        .unwrap();

    let page = list_recipes(
        fx.store.as_ref(),
        None,
        recipe_filter(&query(&[("tags", "breakfast")])).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(names(page), vec!["Omelette", "Pancakes"]);

    let author = fx.session("ann").user_id.to_string();
    let page = list_recipes(
        fx.store.as_ref(),
        None,
        recipe_filter(&query(&[("author", &author)])).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(names(page), vec!["Pancakes", "Stew"]);

    let page = list_recipes(
        fx.store.as_ref(),
        Some(bob),
        recipe_filter(&query(&[("is_favorited", "1")])).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(names(page), vec!["Pancakes"]);

    // Anonymous viewers have no favorites to filter by.
    let page = list_recipes(
        fx.store.as_ref(),
        None,
        recipe_filter(&query(&[("is_favorited", "1")])).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(page.count, 3);
}

#[tokio::test]
async fn viewer_flags_are_projected() {
    let fx = Fixture::new().await;
    let bob = fx.session("bob").user_id;
    let recipe = fx
        .recipe("ann", "Pancakes", &[("flour", 200)], &["breakfast"])
        .await;
    add_membership(fx.store.as_ref(), bob, recipe, SetKind::ShoppingCart)
        .await
        .unwrap();

    let detail = get_recipe(fx.store.as_ref(), Some(bob), recipe).await.unwrap();
    assert!(detail.is_in_shopping_cart);
    assert!(!detail.is_favorited);

    let anonymous = get_recipe(fx.store.as_ref(), None, recipe).await.unwrap();
    assert!(!anonymous.is_in_shopping_cart);
}

#[tokio::test]
async fn listing_far_past_the_end_is_an_empty_page() {
    let fx = Fixture::new().await;
    fx.recipe("ann", "Pancakes", &[("flour", 200)], &["breakfast"])
        .await;
    let offset = i64::MAX.to_string();

    let page = list_recipes(
        fx.store.as_ref(),
        None,
        recipe_filter(&query(&[("offset", &offset)])).unwrap(),
    )
    .await
    .unwrap();

    assert!(page.results.is_empty());
    assert_eq!(page.count, 1);
    assert_eq!(page.next_offset, None);
}
