use sqlx::{Pool, Postgres};

use crate::{
    association::{guard, guard_subscription, Association, Toggle, ToggleOutcome},
    error::QueryError,
};

pub async fn has_association(
    kind: Association,
    user_id: i32,
    target_id: i32,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let row: (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND {} = $2)",
        kind.table(),
        kind.target_column()
    ))
    .bind(user_id)
    .bind(target_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

/// Adds or removes one join row after checking the current membership.
/// A unique-index violation on insert is a race and surfaces as a server error.
pub async fn toggle_association(
    kind: Association,
    user_id: i32,
    target_id: i32,
    toggle: Toggle,
    pool: &Pool<Postgres>,
) -> Result<ToggleOutcome, potion::Error> {
    let present = has_association(kind, user_id, target_id, pool).await?;
    let outcome = match kind {
        Association::Subscription => guard_subscription(user_id, target_id, toggle, present)?,
        _ => guard(kind, toggle, present)?,
    };

    match outcome {
        ToggleOutcome::Created => {
            sqlx::query(&format!(
                "INSERT INTO {} (user_id, {}) VALUES ($1, $2)",
                kind.table(),
                kind.target_column()
            ))
            .bind(user_id)
            .bind(target_id)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;
        }
        ToggleOutcome::Deleted => {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
                kind.table(),
                kind.target_column()
            ))
            .bind(user_id)
            .bind(target_id)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;
        }
    }

    log::info!("{kind:?} {outcome:?}: user {user_id} -> {target_id}");
    Ok(outcome)
}
