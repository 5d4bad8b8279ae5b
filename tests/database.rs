//! Storage-backed tests. Run with `DATABASE_URL` pointing at a scratch Postgres:
//! `cargo test -- --ignored`.

use foodgram::{
    actions::{
        aggregate_shopping_list, create_recipe, delete_recipe, fetch_recipes, get_recipe_detail,
        get_short_link, login_user, register_user, resolve_short_link, subscribe,
        taken_short_links, toggle_recipe_list, unsubscribe,
    },
    association::{Association, Toggle},
    form::{IngredientAmount, NewUser, RecipeInput, RecipeQuery},
    jwt::{JwtSessionData, SessionData},
    pagination::PageQuery,
    schema::{ShoppingListLine, UserRole},
    SessionKey,
};
use pretty_assertions::assert_eq;
use sqlx::PgPool;

async fn user(pool: &PgPool, username: &str) -> SessionData {
    let created = register_user(
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_owned(),
            first_name: String::from("Test"),
            last_name: String::from("User"),
            password: String::from("password"),
        },
        pool,
    )
    .await
    .ok()
    .unwrap();

    JwtSessionData::new(created.id, created.username, UserRole::User).into()
}

async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> i32 {
    let row: (i32,) =
        sqlx::query_as("INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(unit)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

async fn tag(pool: &PgPool, slug: &str) -> i32 {
    let row: (i32,) = sqlx::query_as("INSERT INTO tags (name, slug) VALUES ($1, $1) RETURNING id")
        .bind(slug)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

async fn recipe(
    pool: &PgPool,
    session: &SessionData,
    parts: Vec<(i32, i32)>,
    tags: Vec<i32>,
) -> i32 {
    let input = RecipeInput {
        ingredients: parts
            .into_iter()
            .map(|(id, amount)| IngredientAmount { id, amount })
            .collect(),
        tags,
        image: String::from("data:image/png;base64,AAAA"),
        name: String::from("Test recipe"),
        text: String::from("Cook it."),
        cooking_time: 15,
    };
    create_recipe(input, session, pool).await.ok().unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn aggregates_cart_by_name_and_unit(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let flour = ingredient(&pool, "Flour", "g").await;
    let egg = ingredient(&pool, "Egg", "pcs").await;
    // A second row with the same name and unit still lands on the same line.
    let other_flour = ingredient(&pool, "Flour", "g").await;
    let bulk_flour = ingredient(&pool, "Flour", "kg").await;
    let breakfast = tag(&pool, "breakfast").await;

    let a = recipe(&pool, &cook, vec![(flour, 200)], vec![breakfast]).await;
    let b = recipe(&pool, &cook, vec![(flour, 100), (egg, 2)], vec![breakfast]).await;
    let c = recipe(&pool, &cook, vec![(other_flour, 50), (bulk_flour, 1)], vec![breakfast]).await;
    for id in [a, b, c] {
        toggle_recipe_list(Association::ShoppingCart, id, Toggle::Add, &cook, &mut None, &pool)
            .await
            .ok()
            .unwrap();
    }

    let list = aggregate_shopping_list(cook.user_id, &pool).await.ok().unwrap();
    assert_eq!(
        list.lines,
        vec![
            ShoppingListLine {
                name: String::from("Egg"),
                measurement_unit: String::from("pcs"),
                amount: 2,
            },
            ShoppingListLine {
                name: String::from("Flour"),
                measurement_unit: String::from("g"),
                amount: 350,
            },
            ShoppingListLine {
                name: String::from("Flour"),
                measurement_unit: String::from("kg"),
                amount: 1,
            },
        ]
    );
    assert_eq!(
        list.to_string(),
        "Egg (pcs) - 2\nFlour (g) - 350\nFlour (kg) - 1\n"
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn favorites_reject_duplicates_and_missing_rows(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let salt = ingredient(&pool, "Salt", "g").await;
    let dinner = tag(&pool, "dinner").await;
    let id = recipe(&pool, &cook, vec![(salt, 5)], vec![dinner]).await;

    let toggle = |toggle| {
        let pool = pool.clone();
        let cook = cook.clone();
        async move {
            toggle_recipe_list(Association::Favorite, id, toggle, &cook, &mut None, &pool).await
        }
    };

    let created = toggle(Toggle::Add).await.ok().unwrap();
    assert_eq!(created.map(|r| r.id), Some(id));
    assert!(toggle(Toggle::Add).await.err().unwrap().code == 400);
    assert!(toggle(Toggle::Remove).await.ok().unwrap().is_none());
    assert!(toggle(Toggle::Remove).await.err().unwrap().code == 400);

    let missing =
        toggle_recipe_list(Association::Favorite, id + 100, Toggle::Add, &cook, &mut None, &pool)
            .await;
    assert!(missing.err().unwrap().code == 404);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn subscriptions_follow_the_guard(pool: PgPool) {
    let reader = user(&pool, "reader").await;
    let author = user(&pool, "author").await;

    let own = subscribe(reader.user_id, None, &reader, &pool).await;
    assert!(own.err().unwrap().code == 400);

    let followed = subscribe(author.user_id, Some(1), &reader, &pool).await.ok().unwrap();
    assert!(followed.user.is_subscribed);
    assert_eq!(followed.recipes_count, 0);

    assert!(subscribe(author.user_id, None, &reader, &pool).await.err().unwrap().code == 400);
    assert!(unsubscribe(author.user_id, &reader, &pool).await.is_ok());
    assert!(unsubscribe(author.user_id, &reader, &pool).await.err().unwrap().code == 400);
    assert!(subscribe(9999, None, &reader, &pool).await.err().unwrap().code == 404);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn short_links_resolve_to_their_recipe(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let rice = ingredient(&pool, "Rice", "g").await;
    let lunch = tag(&pool, "lunch").await;
    let id = recipe(&pool, &cook, vec![(rice, 300)], vec![lunch]).await;

    let link = get_short_link(id, "http://localhost:8000", &mut None, &pool)
        .await
        .ok()
        .unwrap();
    let token = link.short_link.rsplit('/').next().unwrap().to_owned();

    assert_eq!(token.len(), 5);
    assert_eq!(resolve_short_link(&token, &pool).await.ok().unwrap(), Some(id));
    assert_eq!(resolve_short_link("zzzzz!", &pool).await.ok().unwrap(), None);

    let candidates = vec![String::from("zzzzz!"), token.clone()];
    let taken = taken_short_links(&candidates, &pool).await.ok().unwrap();
    assert_eq!(taken.into_iter().collect::<Vec<_>>(), vec![token]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn only_the_author_deletes(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let other = user(&pool, "other").await;
    let oil = ingredient(&pool, "Oil", "ml").await;
    let snack = tag(&pool, "snack").await;
    let id = recipe(&pool, &cook, vec![(oil, 10)], vec![snack]).await;

    assert!(delete_recipe(id, &other, &mut None, &pool).await.err().unwrap().code == 403);
    assert!(delete_recipe(id, &cook, &mut None, &pool).await.is_ok());
    assert!(get_recipe_detail(id, None, &pool).await.err().unwrap().code == 404);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn listing_filters_by_tag_and_favorites(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let egg = ingredient(&pool, "Egg", "pcs").await;
    let breakfast = tag(&pool, "breakfast").await;
    let dinner = tag(&pool, "dinner").await;

    let morning = recipe(&pool, &cook, vec![(egg, 2)], vec![breakfast]).await;
    let evening = recipe(&pool, &cook, vec![(egg, 3)], vec![dinner]).await;
    toggle_recipe_list(Association::Favorite, evening, Toggle::Add, &cook, &mut None, &pool)
        .await
        .ok()
        .unwrap();

    let all = fetch_recipes(RecipeQuery::default(), None, &pool).await.ok().unwrap();
    assert_eq!(all.count, 2);
    assert_eq!(
        all.results.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![evening, morning]
    );

    let tagged = RecipeQuery {
        tags: vec![String::from("breakfast")],
        ..RecipeQuery::default()
    };
    let page = fetch_recipes(tagged, None, &pool).await.ok().unwrap();
    assert_eq!(page.results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![morning]);

    let favorited = RecipeQuery {
        is_favorited: true,
        ..RecipeQuery::default()
    };
    let page = fetch_recipes(favorited, Some(cook.user_id), &pool).await.ok().unwrap();
    assert_eq!(page.results.len(), 1);
    assert!(page.results[0].is_favorited);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn pages_past_the_end_keep_the_total(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let egg = ingredient(&pool, "Egg", "pcs").await;
    let breakfast = tag(&pool, "breakfast").await;
    for amount in 1..=3 {
        recipe(&pool, &cook, vec![(egg, amount)], vec![breakfast]).await;
    }

    let second = RecipeQuery {
        page: PageQuery {
            page: Some(2),
            limit: Some(2),
        },
        ..RecipeQuery::default()
    };
    let page = fetch_recipes(second, None, &pool).await.ok().unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.next, None);
    assert_eq!(page.previous, Some(1));

    let beyond = RecipeQuery {
        page: PageQuery {
            page: Some(i64::MAX),
            limit: Some(100),
        },
        ..RecipeQuery::default()
    };
    let page = fetch_recipes(beyond, None, &pool).await.ok().unwrap();
    assert_eq!(page.count, 3);
    assert!(page.results.is_empty());
    assert_eq!(page.next, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn login_signs_a_verifiable_session(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let key = SessionKey::new(b"login-secret").ok().unwrap();

    let token = login_user("cook@example.com", "password", &key, &pool)
        .await
        .ok()
        .unwrap();
    assert_eq!(key.verify(&token).ok().unwrap().user_id, cook.user_id);

    let wrong = login_user("cook@example.com", "nope", &key, &pool).await;
    assert!(wrong.err().unwrap().code == 400);
}
