//! Subscriber to author follow edges.

use crate::{
    error::Error,
    pagination::PageContext,
    schema::Id,
    services::views::Subscription,
    store::Store,
};

pub async fn follow<S: Store + ?Sized>(
    store: &S,
    subscriber_id: Id,
    author_id: Id,
    recipes_limit: Option<usize>,
) -> Result<Subscription, Error> {
    if subscriber_id == author_id {
        return Err(Error::SelfFollow);
    }

    let author = store
        .get_user(author_id)
        .await?
        .ok_or(Error::UserNotFound(author_id))?;

    if !store.insert_follow(subscriber_id, author_id).await? {
        return Err(Error::AlreadyFollowing(author_id));
    }

    log::info!("User {subscriber_id} subscribed to user {author_id}");
    Subscription::load(store, &author, subscriber_id, recipes_limit).await
}

pub async fn unfollow<S: Store + ?Sized>(
    store: &S,
    subscriber_id: Id,
    author_id: Id,
) -> Result<(), Error> {
    if store.get_user(author_id).await?.is_none() {
        return Err(Error::UserNotFound(author_id));
    }

    if !store.delete_follow(subscriber_id, author_id).await? {
        return Err(Error::NotFollowing(author_id));
    }

    log::info!("User {subscriber_id} unsubscribed from user {author_id}");
    Ok(())
}

pub async fn list_subscriptions<S: Store + ?Sized>(
    store: &S,
    subscriber_id: Id,
    limit: i64,
    offset: i64,
    recipes_limit: Option<usize>,
) -> Result<PageContext<Subscription>, Error> {
    let (authors, total) = store.list_followed(subscriber_id, limit, offset).await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors.iter() {
        results.push(Subscription::load(store, author, subscriber_id, recipes_limit).await?);
    }

    Ok(PageContext::from_rows(results, total, limit, offset))
}
