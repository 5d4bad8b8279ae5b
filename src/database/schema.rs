use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type RowId = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: RowId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub avatar: Option<String>,
    pub role: UserRole,
}

/// Public shape of a user. `is_subscribed` is relative to the viewer.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct UserRow {
    pub id: RowId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreatedUser {
    pub id: RowId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Author {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: UserRow,
    pub recipes_count: i64,
    #[sqlx(skip)]
    pub recipes: Vec<ShortRecipe>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: RowId,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: RowId,
    pub name: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RowId,
    pub author_id: RowId,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub short_link: String,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct ShortRecipe {
    pub id: RowId,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<Recipe> for ShortRecipe {
    fn from(value: Recipe) -> Self {
        Self {
            id: value.id,
            name: value.name,
            image: value.image,
            cooking_time: value.cooking_time,
        }
    }
}

/// Listing row with the viewer-relative flags already resolved.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: RowId,
    pub author_id: RowId,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct RecipePart {
    #[serde(skip)]
    pub recipe_id: RowId,
    pub id: RowId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedRecipeTag {
    pub recipe_id: RowId,
    pub id: RowId,
    pub name: String,
    pub slug: String,
}

impl From<LinkedRecipeTag> for Tag {
    fn from(value: LinkedRecipeTag) -> Self {
        Self {
            id: value.id,
            name: value.name,
            slug: value.slug,
        }
    }
}

/// Fully expanded recipe as served by the detail and listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: RowId,
    pub tags: Vec<Tag>,
    pub author: UserRow,
    pub ingredients: Vec<RecipePart>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// One ingredient line of a recipe in the user's cart, before aggregation.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct CartPart {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortLink {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_link_uses_hyphenated_key() {
        let value = serde_json::to_value(ShortLink {
            short_link: String::from("http://localhost/s/abcde"),
        })
        .unwrap();

        assert_eq!(value, json!({ "short-link": "http://localhost/s/abcde" }));
    }

    #[test]
    fn recipe_part_hides_recipe_id() {
        let part = RecipePart {
            recipe_id: 7,
            id: 1,
            name: String::from("Flour"),
            measurement_unit: String::from("g"),
            amount: 200,
        };

        assert_eq!(
            serde_json::to_value(part).unwrap(),
            json!({ "id": 1, "name": "Flour", "measurement_unit": "g", "amount": 200 })
        );
    }
}
