//! Favorites and shopping cart membership.

use crate::{
    error::Error,
    schema::{Id, RecipeSummary, SetKind},
    services::shopping_cart::{aggregate, ShoppingReport},
    store::Store,
};

/// Adds `recipe_id` to the user's `kind` set.
pub async fn add_membership<S: Store + ?Sized>(
    store: &S,
    user_id: Id,
    recipe_id: Id,
    kind: SetKind,
) -> Result<RecipeSummary, Error> {
    let recipe = store
        .get_recipe(recipe_id)
        .await?
        .ok_or(Error::RecipeNotFound(recipe_id))?;

    if !store.insert_membership(kind, user_id, recipe_id).await? {
        return Err(Error::AlreadyMember(kind));
    }

    log::info!("User {user_id} added recipe {recipe_id} to {kind}");
    Ok(RecipeSummary::from(&recipe))
}

pub async fn remove_membership<S: Store + ?Sized>(
    store: &S,
    user_id: Id,
    recipe_id: Id,
    kind: SetKind,
) -> Result<(), Error> {
    if store.get_recipe(recipe_id).await?.is_none() {
        return Err(Error::RecipeNotFound(recipe_id));
    }

    if !store.delete_membership(kind, user_id, recipe_id).await? {
        return Err(Error::NotMember(kind));
    }

    log::info!("User {user_id} removed recipe {recipe_id} from {kind}");
    Ok(())
}

/// Shopping list over every recipe in the user's cart, in cart order.
pub async fn shopping_list<S: Store + ?Sized>(
    store: &S,
    user_id: Id,
) -> Result<ShoppingReport, Error> {
    let recipes = store.cart_recipe_parts(user_id).await?;
    Ok(aggregate(&recipes))
}
