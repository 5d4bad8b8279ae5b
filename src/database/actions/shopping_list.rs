use sqlx::{Pool, Postgres};

use crate::{error::QueryError, schema::CartPart, shopping_list::ShoppingList};

/// Every ingredient line of every recipe in the user's cart, unsummed.
pub async fn list_cart_parts(
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartPart>, potion::Error> {
    let rows: Vec<CartPart> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn aggregate_shopping_list(
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, potion::Error> {
    let parts = list_cart_parts(user_id, pool).await?;
    let list = ShoppingList::aggregate(parts);
    log::trace!("> Shopping list of user {user_id}: {} lines", list.lines.len());

    Ok(list)
}
