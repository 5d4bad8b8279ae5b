use std::collections::{HashMap, HashSet};

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    association::{Association, Toggle, ToggleOutcome},
    authentication::permissions::ActionType,
    cache::cache::{expire_recipe_cache, CacheKeyType, RedisValue},
    error::{QueryError, StatusError, ValidationError},
    form::{RecipeForm, RecipeInput, RecipeQuery},
    jwt::SessionData,
    pagination::PageContext,
    schema::{
        LinkedRecipeTag, Recipe, RecipeDetail, RecipePart, RecipeRow, ShortLink, ShortRecipe,
        UserRow,
    },
    short_link::{default_candidates, generate_short_link, short_link_url},
    RECIPE_COUNT_PER_PAGE,
};

use super::{
    associations::toggle_association, ingredients::missing_ingredients, tags::list_recipe_tags,
    tags::missing_tags, users::list_user_rows,
};

pub async fn get_recipe(id: i32, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let recipe: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(recipe)
}

pub async fn get_recipe_cached(
    id: i32,
    cache: &mut Option<MultiplexedConnection>,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    RedisValue::get_or_fetch(CacheKeyType::Recipe.new(id), cache, || get_recipe(id, pool))
        .await?
        .ok_or_else(|| StatusError::not_found("Recipe not found").into())
}

/// Loads a recipe the session is allowed to change: 404 when missing, 403 when not the author.
pub async fn get_recipe_mut(
    id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| StatusError::not_found("Recipe not found"))?;

    session.authorize_owner(
        recipe.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    )?;

    Ok(recipe)
}

/// Which of `candidates` are already used by a recipe.
pub async fn taken_short_links(
    candidates: &[String],
    pool: &Pool<Postgres>,
) -> Result<HashSet<String>, potion::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT short_link FROM recipes WHERE short_link = ANY($1)")
            .bind(candidates)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Ingredient and tag ids must name existing rows.
async fn validate_references(
    input: &RecipeInput,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let mut errors = ValidationError::new();

    let ingredient_ids: Vec<i32> = input.ingredients.iter().map(|part| part.id).collect();
    for id in missing_ingredients(&ingredient_ids, pool).await? {
        errors.add("ingredients", format!("Ingredient {id} does not exist"));
    }
    for id in missing_tags(&input.tags, pool).await? {
        errors.add("tags", format!("Tag {id} does not exist"));
    }

    errors.into_result()?;
    Ok(())
}

async fn insert_recipe_links(
    recipe_id: i32,
    input: &RecipeInput,
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), potion::Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(input.ingredients.iter(), |mut b, part| {
        b.push_bind(recipe_id).push_bind(part.id).push_bind(part.amount);
    });
    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query_builder.push_values(input.tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });
    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Inserts the recipe with its ingredient and tag rows in one transaction.
pub async fn create_recipe(
    input: RecipeInput,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<i32, potion::Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    validate_references(&input, pool).await?;

    let candidates = default_candidates();
    let taken = taken_short_links(&candidates, pool).await?;
    let short_link = generate_short_link(candidates, &taken)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (i32,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time, short_link)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .bind(&short_link)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    insert_recipe_links(id.0, &input, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("User {} created recipe {} ({short_link})", session.user_id, id.0);
    Ok(id.0)
}

/// Replaces every field and both link lists. The stored image is kept when none is sent.
pub async fn update_recipe(
    id: i32,
    form: RecipeForm,
    session: &SessionData,
    cache: &mut Option<MultiplexedConnection>,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;
    let input = form.validate(Some(recipe.image))?;
    validate_references(&input, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query(
        "UPDATE recipes SET name = $2, image = $3, text = $4, cooking_time = $5 WHERE id = $1",
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    insert_recipe_links(id, &input, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    expire_recipe_cache(cache).await;
    log::info!("User {} updated recipe {id}", session.user_id);
    Ok(())
}

pub async fn delete_recipe(
    id: i32,
    session: &SessionData,
    cache: &mut Option<MultiplexedConnection>,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    expire_recipe_cache(cache).await;
    log::info!("User {} deleted recipe {id}", session.user_id);
    Ok(())
}

pub async fn get_short_link(
    id: i32,
    base_url: &str,
    cache: &mut Option<MultiplexedConnection>,
    pool: &Pool<Postgres>,
) -> Result<ShortLink, potion::Error> {
    let recipe = get_recipe_cached(id, cache, pool).await?;

    Ok(ShortLink {
        short_link: short_link_url(base_url, &recipe.short_link),
    })
}

pub async fn resolve_short_link(
    token: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<i32>, potion::Error> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT id FROM recipes WHERE short_link = $1")
        .bind(token)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row.map(|row| row.0))
}

/// Token → recipe id, answered from the cache when one is configured.
pub async fn resolve_short_link_cached(
    token: &str,
    cache: &mut Option<MultiplexedConnection>,
    pool: &Pool<Postgres>,
) -> Result<i32, potion::Error> {
    RedisValue::get_or_fetch(
        CacheKeyType::ShortLink.new(token.to_owned()),
        cache,
        || resolve_short_link(token, pool),
    )
    .await?
    .ok_or_else(|| StatusError::not_found("Short link not found").into())
}

fn push_recipe_flags<'a>(query_builder: &mut QueryBuilder<'a, Postgres>, viewer: Option<i32>) {
    query_builder
        .push(
            "SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time,
            EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
        )
        .push_bind(viewer)
        .push(
            ") AS is_favorited,
            EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
        )
        .push_bind(viewer)
        .push(") AS is_in_shopping_cart FROM recipes r WHERE TRUE");
}

/// Appends the listing filters; the favorite and cart filters only apply to signed-in viewers.
fn push_recipe_filters(
    query_builder: &mut QueryBuilder<'_, Postgres>,
    query: &RecipeQuery,
    viewer: Option<i32>,
) {
    if let Some(author) = query.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !query.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id
                WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(query.tags.clone())
            .push("))");
    }
    if let Some(user_id) = viewer {
        if query.is_favorited {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        if query.is_in_shopping_cart {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

/// Newest first. `count` is the filtered total, also past the last page.
pub async fn fetch_recipes(
    query: RecipeQuery,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeDetail>, potion::Error> {
    let limit = query.page.page_size(RECIPE_COUNT_PER_PAGE);
    let offset = query.page.offset(RECIPE_COUNT_PER_PAGE);

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("");
    push_recipe_flags(&mut query_builder, viewer);
    push_recipe_filters(&mut query_builder, &query, viewer);
    query_builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as::<RecipeRow>()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_recipe_filters(&mut count_builder, &query, viewer);

    let total: (i64,) = count_builder
        .build_query_as::<(i64,)>()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    let details = expand_recipe_rows(rows, viewer, pool).await?;

    Ok(PageContext::from_rows(
        details,
        total.0,
        limit,
        query.page.page(),
    ))
}

pub async fn get_recipe_detail(
    id: i32,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, potion::Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("");
    push_recipe_flags(&mut query_builder, viewer);
    query_builder.push(" AND r.id = ").push_bind(id);

    let row: Option<RecipeRow> = query_builder
        .build_query_as::<RecipeRow>()
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;
    let row = row.ok_or_else(|| StatusError::not_found("Recipe not found"))?;

    expand_recipe_rows(vec![row], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| StatusError::not_found("Recipe not found").into())
}

pub async fn list_recipe_parts(
    recipe_ids: &[i32],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, potion::Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS id, i.name AS name,
               i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

async fn expand_recipe_rows(
    rows: Vec<RecipeRow>,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, potion::Error> {
    if rows.is_empty() {
        return Ok(vec![]);
    }
    let recipe_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let mut author_ids: Vec<i32> = rows.iter().map(|row| row.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let parts = list_recipe_parts(&recipe_ids, pool).await?;
    let tags = list_recipe_tags(&recipe_ids, pool).await?;
    let authors = list_user_rows(&author_ids, viewer, pool).await?;

    Ok(assemble(rows, parts, tags, authors))
}

/// Joins listing rows with their parts, tags and authors, keeping row order.
pub fn assemble(
    rows: Vec<RecipeRow>,
    parts: Vec<RecipePart>,
    tags: Vec<LinkedRecipeTag>,
    authors: Vec<UserRow>,
) -> Vec<RecipeDetail> {
    let mut parts_by_recipe: HashMap<i32, Vec<RecipePart>> = HashMap::new();
    parts
        .into_iter()
        .for_each(|part| parts_by_recipe.entry(part.recipe_id).or_default().push(part));

    let mut tags_by_recipe: HashMap<i32, Vec<LinkedRecipeTag>> = HashMap::new();
    tags.into_iter()
        .for_each(|tag| tags_by_recipe.entry(tag.recipe_id).or_default().push(tag));

    let authors: HashMap<i32, UserRow> =
        authors.into_iter().map(|author| (author.id, author)).collect();

    rows.into_iter()
        .filter_map(|row| {
            let Some(author) = authors.get(&row.author_id) else {
                log::warn!("Recipe {} has no author row", row.id);
                return None;
            };

            Some(RecipeDetail {
                id: row.id,
                tags: tags_by_recipe
                    .remove(&row.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                author: author.clone(),
                ingredients: parts_by_recipe.remove(&row.id).unwrap_or_default(),
                is_favorited: row.is_favorited,
                is_in_shopping_cart: row.is_in_shopping_cart,
                name: row.name,
                image: row.image,
                text: row.text,
                cooking_time: row.cooking_time,
            })
        })
        .collect()
}

/// Adds or removes a recipe from the user's favorites or cart.
/// Returns the short recipe when a row was created.
pub async fn toggle_recipe_list(
    kind: Association,
    recipe_id: i32,
    toggle: Toggle,
    session: &SessionData,
    cache: &mut Option<MultiplexedConnection>,
    pool: &Pool<Postgres>,
) -> Result<Option<ShortRecipe>, potion::Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    let recipe = get_recipe_cached(recipe_id, cache, pool).await?;

    match toggle_association(kind, session.user_id, recipe_id, toggle, pool).await? {
        ToggleOutcome::Created => Ok(Some(recipe.into())),
        ToggleOutcome::Deleted => Ok(None),
    }
}

/// Most recent recipes of each author, at most `limit` each when given.
pub async fn list_author_recipes(
    author_ids: &[i32],
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<i32, Vec<ShortRecipe>>, potion::Error> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = ANY($1) ORDER BY pub_date DESC, id DESC",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(group_by_author(rows, limit))
}

pub(crate) fn group_by_author(
    rows: Vec<Recipe>,
    limit: Option<i64>,
) -> HashMap<i32, Vec<ShortRecipe>> {
    let limit = limit.and_then(|limit| usize::try_from(limit).ok());
    let mut grouped: HashMap<i32, Vec<ShortRecipe>> = HashMap::new();
    for recipe in rows {
        let recipes = grouped.entry(recipe.author_id).or_default();
        if limit.map_or(true, |limit| recipes.len() < limit) {
            recipes.push(recipe.into());
        }
    }
    grouped
}
