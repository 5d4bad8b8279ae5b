use sqlx::{Pool, Postgres};

use crate::{
    error::QueryError,
    schema::{LinkedRecipeTag, Tag},
};

use super::ingredients::missing_ids;

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_tag(id: i32, pool: &Pool<Postgres>) -> Result<Option<Tag>, potion::Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn missing_tags(ids: &[i32], pool: &Pool<Postgres>) -> Result<Vec<i32>, potion::Error> {
    let found: Vec<(i32,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(missing_ids(ids, found.into_iter().map(|row| row.0)))
}

pub async fn list_recipe_tags(
    recipe_ids: &[i32],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, potion::Error> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}
