//! HTTP surface of the service.

use std::{collections::HashMap, convert::Infallible, str::FromStr, sync::Arc};

use redis::aio::MultiplexedConnection;
use serde::Serialize;
use warp::{
    http::{StatusCode, Uri},
    reject::Rejection,
    reply::{json, with_header, with_status},
    Filter, Reply,
};

use crate::{
    error::Error,
    form::{AvatarPayload, LoginPayload, RecipePayload, RegisterPayload, SetPasswordPayload},
    jwt::{SessionData, SessionKeys},
    middleware::{with_possible_session, with_session},
    permissions::ActionType,
    schema::{Id, SetKind},
    services::{catalog, composition::TagPolicy, follows, membership, recipes, users},
    store::Store,
    SHOPPING_LIST_FILENAME,
};

const BODY_LIMIT: u64 = 1024 * 64;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn Store>,
    pub keys: SessionKeys,
    pub base_url: String,
    pub tag_policy: TagPolicy,
    pub cache: Option<MultiplexedConnection>,
}

impl ApiContext {
    fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// All routes with rejections rendered as `{"detail": ...}`.
pub fn api(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let catalog_routes = list_ingredients_route(ctx.clone())
        .or(get_ingredient_route(ctx.clone()))
        .or(list_tags_route(ctx.clone()))
        .or(get_tag_route(ctx.clone()));

    let recipe_routes = download_shopping_cart_route(ctx.clone())
        .or(list_recipes_route(ctx.clone()))
        .or(create_recipe_route(ctx.clone()))
        .or(get_recipe_route(ctx.clone()))
        .or(update_recipe_route(ctx.clone()))
        .or(delete_recipe_route(ctx.clone()))
        .or(short_link_route(ctx.clone()))
        .or(add_membership_route(ctx.clone(), "favorite", SetKind::Favorites))
        .or(remove_membership_route(ctx.clone(), "favorite", SetKind::Favorites))
        .or(add_membership_route(ctx.clone(), "shopping_cart", SetKind::ShoppingCart))
        .or(remove_membership_route(ctx.clone(), "shopping_cart", SetKind::ShoppingCart));

    let user_routes = me_route(ctx.clone())
        .or(set_avatar_route(ctx.clone()))
        .or(delete_avatar_route(ctx.clone()))
        .or(set_password_route(ctx.clone()))
        .or(subscriptions_route(ctx.clone()))
        .or(list_users_route(ctx.clone()))
        .or(register_route(ctx.clone()))
        .or(get_user_route(ctx.clone()))
        .or(subscribe_route(ctx.clone()))
        .or(unsubscribe_route(ctx.clone()));

    let auth_routes = login_route(ctx.clone()).or(logout_route(ctx.clone()));

    catalog_routes
        .or(recipe_routes)
        .or(user_routes)
        .or(auth_routes)
        .or(redirect_route(ctx))
        .recover(handle_rejection)
}

fn with_context(ctx: ApiContext) -> impl Filter<Extract = (ApiContext,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn json_body<T: serde::de::DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json())
}

fn query_number<T: FromStr>(
    query: &HashMap<String, String>,
    field: &'static str,
) -> Result<Option<T>, Error> {
    query
        .get(field)
        .map(|value| {
            value
                .parse()
                .map_err(|_| Error::invalid(field, "expected a number"))
        })
        .transpose()
}

fn reject(e: Error) -> Rejection {
    warp::reject::custom(e)
}

fn no_content() -> impl Reply {
    with_status(warp::reply(), StatusCode::NO_CONTENT)
}

// Catalog

fn list_ingredients_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_context(ctx))
        .and_then(handle_list_ingredients)
}

async fn handle_list_ingredients(
    query: HashMap<String, String>,
    ctx: ApiContext,
) -> Result<impl Reply, Rejection> {
    let list = catalog::list_ingredients(
        ctx.store(),
        ctx.cache.as_ref(),
        query.get("name").map(String::as_str),
    )
    .await
    .map_err(reject)?;

    Ok(json(&list))
}

fn get_ingredient_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(|id: Id, ctx: ApiContext| async move {
            let ingredient = catalog::get_ingredient(ctx.store(), id)
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(json(&ingredient))
        })
}

fn list_tags_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(|ctx: ApiContext| async move {
            let list = catalog::list_tags(ctx.store(), ctx.cache.as_ref())
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(json(&list))
        })
}

fn get_tag_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(|id: Id, ctx: ApiContext| async move {
            let tag = catalog::get_tag(ctx.store(), id).await.map_err(reject)?;
            Ok::<_, Rejection>(json(&tag))
        })
}

// Recipes

fn list_recipes_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_possible_session(ctx.keys.clone()))
        .and(warp::query::<Vec<(String, String)>>())
        .and(with_context(ctx))
        .and_then(handle_list_recipes)
}

async fn handle_list_recipes(
    session: Option<SessionData>,
    query: Vec<(String, String)>,
    ctx: ApiContext,
) -> Result<impl Reply, Rejection> {
    let filter = recipes::recipe_filter(&query).map_err(reject)?;
    let page = recipes::list_recipes(ctx.store(), session.map(|s| s.user_id), filter)
        .await
        .map_err(reject)?;

    Ok(json(&page))
}

fn create_recipe_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(ctx.keys.clone()))
        .and(json_body::<RecipePayload>())
        .and(with_context(ctx))
        .and_then(handle_create_recipe)
}

async fn handle_create_recipe(
    session: SessionData,
    payload: RecipePayload,
    ctx: ApiContext,
) -> Result<impl Reply, Rejection> {
    let detail = recipes::create_recipe(ctx.store(), &session, payload, ctx.tag_policy)
        .await
        .map_err(reject)?;

    Ok(with_status(json(&detail), StatusCode::CREATED))
}

fn get_recipe_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.keys.clone()))
        .and(with_context(ctx))
        .and_then(
            |id: Id, session: Option<SessionData>, ctx: ApiContext| async move {
                let detail = recipes::get_recipe(ctx.store(), session.map(|s| s.user_id), id)
                    .await
                    .map_err(reject)?;
                Ok::<_, Rejection>(json(&detail))
            },
        )
}

fn update_recipe_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(with_session(ctx.keys.clone()))
        .and(json_body::<RecipePayload>())
        .and(with_context(ctx))
        .and_then(handle_update_recipe)
}

async fn handle_update_recipe(
    id: Id,
    session: SessionData,
    payload: RecipePayload,
    ctx: ApiContext,
) -> Result<impl Reply, Rejection> {
    let detail = recipes::update_recipe(ctx.store(), &session, id, payload, ctx.tag_policy)
        .await
        .map_err(reject)?;

    Ok(json(&detail))
}

fn delete_recipe_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(with_session(ctx.keys.clone()))
        .and(with_context(ctx))
        .and_then(|id: Id, session: SessionData, ctx: ApiContext| async move {
            recipes::delete_recipe(ctx.store(), &session, id)
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(no_content())
        })
}

fn short_link_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "recipes" / Id / "get-link")
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(|id: Id, ctx: ApiContext| async move {
            let link = recipes::short_link(ctx.store(), &ctx.base_url, id)
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(json(&link))
        })
}

fn redirect_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("r" / Id)
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(handle_redirect)
}

async fn handle_redirect(id: Id, ctx: ApiContext) -> Result<impl Reply, Rejection> {
    if ctx.store().get_recipe(id).await.map_err(reject)?.is_none() {
        return Err(reject(Error::RecipeNotFound(id)));
    }

    let location: Uri = format!("/api/recipes/{id}")
        .parse()
        .map_err(|_| reject(Error::Internal(format!("Invalid location for recipe {id}"))))?;

    Ok(warp::redirect::found(location))
}

fn membership_path(
    segment: &'static str,
) -> impl Filter<Extract = (Id,), Error = Rejection> + Clone {
    warp::path("api")
        .and(warp::path("recipes"))
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end())
}

fn add_membership_route(
    ctx: ApiContext,
    segment: &'static str,
    kind: SetKind,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    membership_path(segment)
        .and(warp::post())
        .and(with_session(ctx.keys.clone()))
        .and(with_context(ctx))
        .and_then(move |id: Id, session: SessionData, ctx: ApiContext| async move {
            session
                .authenticate(ActionType::ManageOwnMemberships)
                .map_err(reject)?;
            let summary = membership::add_membership(ctx.store(), session.user_id, id, kind)
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(with_status(json(&summary), StatusCode::CREATED))
        })
}

fn remove_membership_route(
    ctx: ApiContext,
    segment: &'static str,
    kind: SetKind,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    membership_path(segment)
        .and(warp::delete())
        .and(with_session(ctx.keys.clone()))
        .and(with_context(ctx))
        .and_then(move |id: Id, session: SessionData, ctx: ApiContext| async move {
            session
                .authenticate(ActionType::ManageOwnMemberships)
                .map_err(reject)?;
            membership::remove_membership(ctx.store(), session.user_id, id, kind)
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(no_content())
        })
}

fn download_shopping_cart_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(ctx.keys.clone()))
        .and(with_context(ctx))
        .and_then(|session: SessionData, ctx: ApiContext| async move {
            let report = membership::shopping_list(ctx.store(), session.user_id)
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(with_header(
                report.render(),
                "content-disposition",
                format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
            ))
        })
}

// Users

fn list_users_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "users")
        .and(warp::get())
        .and(with_possible_session(ctx.keys.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_context(ctx))
        .and_then(handle_list_users)
}

async fn handle_list_users(
    session: Option<SessionData>,
    query: HashMap<String, String>,
    ctx: ApiContext,
) -> Result<impl Reply, Rejection> {
    let limit = query_number(&query, "limit").map_err(reject)?;
    let offset = query_number(&query, "offset").map_err(reject)?;
    let page = users::list_users(ctx.store(), session.map(|s| s.user_id), limit, offset)
        .await
        .map_err(reject)?;

    Ok(json(&page))
}

fn register_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "users")
        .and(warp::post())
        .and(json_body::<RegisterPayload>())
        .and(with_context(ctx))
        .and_then(|payload: RegisterPayload, ctx: ApiContext| async move {
            let profile = users::register(ctx.store(), payload)
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(with_status(json(&profile), StatusCode::CREATED))
        })
}

fn me_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(ctx.keys.clone()))
        .and(with_context(ctx))
        .and_then(|session: SessionData, ctx: ApiContext| async move {
            let profile = users::me(ctx.store(), &session).await.map_err(reject)?;
            Ok::<_, Rejection>(json(&profile))
        })
}

fn get_user_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.keys.clone()))
        .and(with_context(ctx))
        .and_then(
            |id: Id, session: Option<SessionData>, ctx: ApiContext| async move {
                let profile = users::get_profile(ctx.store(), session.map(|s| s.user_id), id)
                    .await
                    .map_err(reject)?;
                Ok::<_, Rejection>(json(&profile))
            },
        )
}

fn set_avatar_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "users" / "me" / "avatar")
        .and(warp::put())
        .and(with_session(ctx.keys.clone()))
        .and(json_body::<AvatarPayload>())
        .and(with_context(ctx))
        .and_then(
            |session: SessionData, payload: AvatarPayload, ctx: ApiContext| async move {
                let avatar = users::set_avatar(ctx.store(), &session, payload)
                    .await
                    .map_err(reject)?;
                Ok::<_, Rejection>(json(&avatar))
            },
        )
}

fn delete_avatar_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "users" / "me" / "avatar")
        .and(warp::delete())
        .and(with_session(ctx.keys.clone()))
        .and(with_context(ctx))
        .and_then(|session: SessionData, ctx: ApiContext| async move {
            users::delete_avatar(ctx.store(), &session)
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(no_content())
        })
}

fn set_password_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(with_session(ctx.keys.clone()))
        .and(json_body::<SetPasswordPayload>())
        .and(with_context(ctx))
        .and_then(
            |session: SessionData, payload: SetPasswordPayload, ctx: ApiContext| async move {
                users::set_password(ctx.store(), &session, payload)
                    .await
                    .map_err(reject)?;
                Ok::<_, Rejection>(no_content())
            },
        )
}

fn recipes_limit(query: &HashMap<String, String>) -> Result<Option<usize>, Error> {
    query_number(query, "recipes_limit")
}

fn subscriptions_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_session(ctx.keys.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_context(ctx))
        .and_then(handle_subscriptions)
}

async fn handle_subscriptions(
    session: SessionData,
    query: HashMap<String, String>,
    ctx: ApiContext,
) -> Result<impl Reply, Rejection> {
    let (limit, offset) = crate::pagination::clamp_page(
        query_number(&query, "limit").map_err(reject)?,
        query_number(&query, "offset").map_err(reject)?,
        crate::USER_COUNT_PER_PAGE,
    );
    let page = follows::list_subscriptions(
        ctx.store(),
        session.user_id,
        limit,
        offset,
        recipes_limit(&query).map_err(reject)?,
    )
    .await
    .map_err(reject)?;

    Ok(json(&page))
}

fn subscribe_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(with_session(ctx.keys.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_context(ctx))
        .and_then(handle_subscribe)
}

async fn handle_subscribe(
    author_id: Id,
    session: SessionData,
    query: HashMap<String, String>,
    ctx: ApiContext,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnSubscriptions)
        .map_err(reject)?;
    let subscription = follows::follow(
        ctx.store(),
        session.user_id,
        author_id,
        recipes_limit(&query).map_err(reject)?,
    )
    .await
    .map_err(reject)?;

    Ok(with_status(json(&subscription), StatusCode::CREATED))
}

fn unsubscribe_route(
    ctx: ApiContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(ctx.keys.clone()))
        .and(with_context(ctx))
        .and_then(|author_id: Id, session: SessionData, ctx: ApiContext| async move {
            session
                .authenticate(ActionType::ManageOwnSubscriptions)
                .map_err(reject)?;
            follows::unfollow(ctx.store(), session.user_id, author_id)
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(no_content())
        })
}

// Sessions

fn login_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(json_body::<LoginPayload>())
        .and(with_context(ctx))
        .and_then(|payload: LoginPayload, ctx: ApiContext| async move {
            let token = users::login(ctx.store(), &ctx.keys, payload)
                .await
                .map_err(reject)?;
            Ok::<_, Rejection>(json(&token))
        })
}

/// Tokens are stateless, so logout only confirms the caller is authenticated.
fn logout_route(ctx: ApiContext) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(ctx.keys))
        .map(|session: SessionData| {
            log::info!("User {} logged out", session.user_id);
            no_content()
        })
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if let Some(e) = err.find::<Error>() {
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            log::error!("{e}");
        }
        (status, e.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_owned())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"))
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_owned())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_owned())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type".to_owned(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_owned(),
        )
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_owned(),
        )
    };

    Ok(with_status(json(&ErrorBody { detail }), status))
}
