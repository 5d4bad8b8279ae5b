use potion::HtmlError;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::SessionKey,
    },
    error::{QueryError, StatusError, ValidationError},
    form::NewUser,
    pagination::{PageContext, PageQuery},
    schema::{CreatedUser, User, UserRow},
    USER_COUNT_PER_PAGE,
};

const USER_ROW_COLUMNS: &str = "
    u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
    EXISTS (SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.subscribed_to_id = u.id) AS is_subscribed
";

pub async fn get_user(
    pool: &Pool<Postgres>,
    username: &str,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(
    user: NewUser,
    pool: &Pool<Postgres>,
) -> Result<CreatedUser, potion::Error> {
    let mut errors = ValidationError::new();
    if get_user_by_email(pool, &user.email).await?.is_some() {
        errors.add("email", "A user with that email already exists");
    }
    if get_user(pool, &user.username).await?.is_some() {
        errors.add("username", "A user with that username already exists");
    }
    errors.into_result()?;

    let password = hash_password(&user.password)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to hash password"))?;

    let id: (i32,) = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    log::info!("Registered user {} ({})", user.username, id.0);
    Ok(CreatedUser {
        id: id.0,
        email: user.email,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
    })
}

/// Checks email and password and signs a session token for the external login flow.
pub async fn login_user(
    email: &str,
    password: &str,
    key: &SessionKey,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    let user = get_user_by_email(pool, email)
        .await?
        .ok_or_else(|| HtmlError::InvalidRequest.new("Invalid credentials"))?;

    let authenticated = verify_password(password, &user.password)
        .map_err(|_| HtmlError::InternalServerError.new("Stored password hash is malformed"))?;
    if !authenticated {
        return Err(HtmlError::InvalidRequest.new("Invalid credentials"));
    }

    key.sign(&user)
}

/// `viewer` decides `is_subscribed`; anonymous viewers see `false`.
pub async fn get_user_row(
    user_id: i32,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<Option<UserRow>, potion::Error> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_ROW_COLUMNS} FROM users u WHERE u.id = $2"
    ))
    .bind(viewer)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_row_or_404(
    user_id: i32,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<UserRow, potion::Error> {
    get_user_row(user_id, viewer, pool)
        .await?
        .ok_or_else(|| StatusError::not_found("User not found").into())
}

pub async fn list_user_rows(
    user_ids: &[i32],
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserRow>, potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_ROW_COLUMNS} FROM users u WHERE u.id = ANY($2)"
    ))
    .bind(viewer)
    .bind(user_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn fetch_users(
    query: PageQuery,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserRow>, potion::Error> {
    let limit = query.page_size(USER_COUNT_PER_PAGE);
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_ROW_COLUMNS} FROM users u ORDER BY u.id LIMIT $2 OFFSET $3"
    ))
    .bind(viewer)
    .bind(limit)
    .bind(query.offset(USER_COUNT_PER_PAGE))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(PageContext::from_rows(rows, total.0, limit, query.page()))
}

pub async fn set_avatar(
    user_id: i32,
    avatar: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
        .bind(avatar)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
