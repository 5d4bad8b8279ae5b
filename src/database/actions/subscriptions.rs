use sqlx::{Pool, Postgres};

use crate::{
    association::{Association, Toggle},
    authentication::permissions::ActionType,
    error::{QueryError, StatusError},
    form::SubscriptionQuery,
    jwt::SessionData,
    pagination::PageContext,
    schema::{Author, UserRow},
    USER_COUNT_PER_PAGE,
};

use super::{
    associations::toggle_association, recipes::list_author_recipes, users::get_user_row,
};

async fn count_recipes(author_id: i32, pool: &Pool<Postgres>) -> Result<i64, potion::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

/// Subscribes the session user to `author_id` and returns the author with their recipes.
pub async fn subscribe(
    author_id: i32,
    recipes_limit: Option<i64>,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Author, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let user = get_user_row(author_id, Some(session.user_id), pool)
        .await?
        .ok_or_else(|| StatusError::not_found("User not found"))?;

    toggle_association(
        Association::Subscription,
        session.user_id,
        author_id,
        Toggle::Add,
        pool,
    )
    .await?;

    let recipes = list_author_recipes(&[author_id], recipes_limit, pool)
        .await?
        .remove(&author_id)
        .unwrap_or_default();

    Ok(Author {
        user: UserRow {
            is_subscribed: true,
            ..user
        },
        recipes_count: count_recipes(author_id, pool).await?,
        recipes,
    })
}

pub async fn unsubscribe(
    author_id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    get_user_row(author_id, None, pool)
        .await?
        .ok_or_else(|| StatusError::not_found("User not found"))?;

    toggle_association(
        Association::Subscription,
        session.user_id,
        author_id,
        Toggle::Remove,
        pool,
    )
    .await?;

    Ok(())
}

/// Authors the session user follows, with recipe counts and recent recipes.
pub async fn fetch_subscriptions(
    query: SubscriptionQuery,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Author>, potion::Error> {
    let page = query.page_query();
    let limit = page.page_size(USER_COUNT_PER_PAGE);

    let rows: Vec<Author> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
               TRUE AS is_subscribed,
               (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.subscribed_to_id
        WHERE s.user_id = $1
        ORDER BY u.username, u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(limit)
    .bind(page.offset(USER_COUNT_PER_PAGE))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(session.user_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    let author_ids: Vec<i32> = rows.iter().map(|author| author.user.id).collect();
    let mut recipes = list_author_recipes(&author_ids, query.recipes_limit(), pool).await?;
    let rows = rows
        .into_iter()
        .map(|mut author| {
            author.recipes = recipes.remove(&author.user.id).unwrap_or_default();
            author
        })
        .collect();

    Ok(PageContext::from_rows(rows, total.0, limit, page.page()))
}
