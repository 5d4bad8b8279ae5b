use sqlx::{Pool, Postgres};

use crate::{error::QueryError, schema::Ingredient};

/// Case-insensitive prefix search; no prefix lists everything.
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let rows: Vec<Ingredient> = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(prefix) => sqlx::query_as(
            "SELECT * FROM ingredients WHERE starts_with(LOWER(name), LOWER($1)) ORDER BY name, id",
        )
        .bind(prefix)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(
    id: i32,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, potion::Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Returns the ids from `ids` with no ingredient row.
pub async fn missing_ingredients(
    ids: &[i32],
    pool: &Pool<Postgres>,
) -> Result<Vec<i32>, potion::Error> {
    let found: Vec<(i32,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(missing_ids(ids, found.into_iter().map(|row| row.0)))
}

pub(crate) fn missing_ids(requested: &[i32], found: impl IntoIterator<Item = i32>) -> Vec<i32> {
    let found: std::collections::HashSet<i32> = found.into_iter().collect();
    requested
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_ids_without_rows() {
        assert_eq!(missing_ids(&[1, 2, 3], vec![3, 1]), vec![2]);
        assert!(missing_ids(&[4], vec![4]).is_empty());
    }
}
