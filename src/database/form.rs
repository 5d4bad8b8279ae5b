use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{error::ValidationError, pagination::PageQuery};
use crate::constants::{
    EMAIL_MAX_LENGTH, MAX_COOKING_TIME, MAX_INGREDIENT_AMOUNT, MIN_COOKING_TIME,
    MIN_INGREDIENT_AMOUNT, PASSWORD_MAX_LENGTH, PERSON_NAME_MAX_LENGTH, RECIPE_NAME_MAX_LENGTH,
    USERNAME_MAX_LENGTH,
};

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern"));
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));

const REQUIRED: &str = "This field is required";

fn required_text(
    errors: &mut ValidationError,
    field: &str,
    value: Option<String>,
    max_length: usize,
) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if value.chars().count() > max_length {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_length} characters"),
        );
    }
    value
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserForm {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl UserForm {
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        let mut errors = ValidationError::new();

        let email = required_text(&mut errors, "email", self.email, EMAIL_MAX_LENGTH);
        if !email.is_empty() && !EMAIL_PATTERN.is_match(&email) {
            errors.add("email", "Enter a valid email address");
        }
        let username = required_text(&mut errors, "username", self.username, USERNAME_MAX_LENGTH);
        if !username.is_empty() && !USERNAME_PATTERN.is_match(&username) {
            errors.add(
                "username",
                "Username may contain only letters, digits and @/./+/-/_",
            );
        }
        if username.eq_ignore_ascii_case("me") {
            errors.add("username", "This username is reserved");
        }
        let first_name = required_text(
            &mut errors,
            "first_name",
            self.first_name,
            PERSON_NAME_MAX_LENGTH,
        );
        let last_name = required_text(
            &mut errors,
            "last_name",
            self.last_name,
            PERSON_NAME_MAX_LENGTH,
        );
        // Passwords are not trimmed.
        let password = self.password.unwrap_or_default();
        if password.is_empty() {
            errors.add("password", REQUIRED);
        } else if password.chars().count() > PASSWORD_MAX_LENGTH {
            errors.add(
                "password",
                format!("Ensure this field has no more than {PASSWORD_MAX_LENGTH} characters"),
            );
        }

        errors.into_result()?;
        Ok(NewUser {
            email: email.to_lowercase(),
            username,
            first_name,
            last_name,
            password,
        })
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AvatarForm {
    pub avatar: Option<String>,
}

impl AvatarForm {
    pub fn validate(self) -> Result<String, ValidationError> {
        let mut errors = ValidationError::new();
        let avatar = self.avatar.map(|a| a.trim().to_string()).unwrap_or_default();
        if avatar.is_empty() {
            errors.add("avatar", REQUIRED);
        }
        errors.into_result()?;
        Ok(avatar)
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: i32,
    pub amount: i32,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipeForm {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<i32>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeInput {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i32>,
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeForm {
    /// `current_image` lets an update keep the stored image when none is sent.
    pub fn validate(self, current_image: Option<String>) -> Result<RecipeInput, ValidationError> {
        let mut errors = ValidationError::new();

        let ingredients = self.ingredients.unwrap_or_default();
        if ingredients.is_empty() {
            errors.add("ingredients", "At least one ingredient is required");
        }
        let mut seen = HashSet::new();
        for part in &ingredients {
            if !seen.insert(part.id) {
                errors.add("ingredients", format!("Ingredient {} is listed twice", part.id));
            }
            if !(MIN_INGREDIENT_AMOUNT..=MAX_INGREDIENT_AMOUNT).contains(&part.amount) {
                errors.add(
                    "ingredients",
                    format!(
                        "Amount of ingredient {} must be between {MIN_INGREDIENT_AMOUNT} and {MAX_INGREDIENT_AMOUNT}",
                        part.id
                    ),
                );
            }
        }

        let tags = self.tags.unwrap_or_default();
        if tags.is_empty() {
            errors.add("tags", "At least one tag is required");
        }
        let mut seen = HashSet::new();
        for tag in &tags {
            if !seen.insert(*tag) {
                errors.add("tags", format!("Tag {tag} is listed twice"));
            }
        }

        let image = match self.image.map(|i| i.trim().to_string()) {
            Some(image) if !image.is_empty() => image,
            _ => match current_image {
                Some(image) => image,
                None => {
                    errors.add("image", REQUIRED);
                    String::new()
                }
            },
        };

        let name = required_text(&mut errors, "name", self.name, RECIPE_NAME_MAX_LENGTH);
        let text = required_text(&mut errors, "text", self.text, usize::MAX);

        let cooking_time = match self.cooking_time {
            Some(time) if (MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&time) => time,
            Some(_) => {
                errors.add(
                    "cooking_time",
                    format!("Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME}"),
                );
                0
            }
            None => {
                errors.add("cooking_time", REQUIRED);
                0
            }
        };

        errors.into_result()?;
        Ok(RecipeInput {
            ingredients,
            tags,
            image,
            name,
            text,
            cooking_time,
        })
    }
}

/// Listing filters for `/api/recipes/`. `tags` may repeat; flags take `1`/`0` or `true`/`false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeQuery {
    pub page: PageQuery,
    pub author: Option<i32>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeQuery {
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut errors = ValidationError::new();
        let mut query = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "page" => query.page.page = parse_number(&mut errors, "page", &value),
                "limit" => query.page.limit = parse_number(&mut errors, "limit", &value),
                "author" => {
                    query.author = parse_number(&mut errors, "author", &value)
                        .and_then(|id: i64| i32::try_from(id).ok())
                }
                "tags" if !value.is_empty() => query.tags.push(value),
                "is_favorited" => {
                    query.is_favorited = parse_flag(&mut errors, "is_favorited", &value)
                }
                "is_in_shopping_cart" => {
                    query.is_in_shopping_cart =
                        parse_flag(&mut errors, "is_in_shopping_cart", &value)
                }
                _ => {}
            }
        }

        errors.into_result()?;
        Ok(query)
    }
}

fn parse_number(errors: &mut ValidationError, field: &str, value: &str) -> Option<i64> {
    match value.trim().parse::<i64>() {
        Ok(number) => Some(number),
        Err(_) => {
            errors.add(field, "A valid integer is required");
            None
        }
    }
}

fn parse_flag(errors: &mut ValidationError, field: &str, value: &str) -> bool {
    match value.trim() {
        "1" | "true" | "True" => true,
        "0" | "false" | "False" | "" => false,
        _ => {
            errors.add(field, "Expected 0 or 1");
            false
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct SubscriptionQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<i64>,
}

impl SubscriptionQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }

    /// Negative limits are treated as absent.
    pub fn recipes_limit(&self) -> Option<i64> {
        self.recipes_limit.filter(|limit| *limit >= 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recipe_form() -> RecipeForm {
        RecipeForm {
            ingredients: Some(vec![IngredientAmount { id: 1, amount: 200 }]),
            tags: Some(vec![1, 2]),
            image: Some(String::from("data:image/png;base64,AAAA")),
            name: Some(String::from("Pancakes")),
            text: Some(String::from("Mix and fry.")),
            cooking_time: Some(20),
        }
    }

    #[test]
    fn accepts_complete_recipe() {
        let input = recipe_form().validate(None).unwrap();

        assert_eq!(input.name, "Pancakes");
        assert_eq!(input.tags, vec![1, 2]);
        assert_eq!(input.cooking_time, 20);
    }

    #[test]
    fn reports_every_bad_field() {
        let form = RecipeForm {
            ingredients: Some(vec![
                IngredientAmount { id: 1, amount: 0 },
                IngredientAmount { id: 1, amount: 5 },
            ]),
            tags: Some(vec![]),
            image: None,
            name: Some(String::from("   ")),
            text: None,
            cooking_time: Some(0),
        };

        let errors = form.validate(None).unwrap_err();
        let fields: Vec<&str> = errors.fields().keys().map(|k| k.as_str()).collect();

        assert_eq!(
            fields,
            vec!["cooking_time", "image", "ingredients", "name", "tags", "text"]
        );
        assert_eq!(errors.fields()["ingredients"].len(), 2);
    }

    #[test]
    fn update_keeps_current_image() {
        let form = RecipeForm {
            image: None,
            ..recipe_form()
        };

        let input = form.validate(Some(String::from("recipes/images/1.png"))).unwrap();
        assert_eq!(input.image, "recipes/images/1.png");
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let form = RecipeForm {
            tags: Some(vec![3, 3]),
            ..recipe_form()
        };

        let errors = form.validate(None).unwrap_err();
        assert_eq!(errors.fields()["tags"], vec![String::from("Tag 3 is listed twice")]);
    }

    #[test]
    fn validates_new_users() {
        let form = UserForm {
            email: Some(String::from("Cook@Example.com")),
            username: Some(String::from("chef.john")),
            first_name: Some(String::from("John")),
            last_name: Some(String::from("Doe")),
            password: Some(String::from("correct horse")),
        };

        let user = form.validate().unwrap();
        assert_eq!(user.email, "cook@example.com");
        assert_eq!(user.username, "chef.john");
    }

    #[test]
    fn rejects_bad_usernames_and_emails() {
        let form = UserForm {
            email: Some(String::from("not-an-email")),
            username: Some(String::from("bad name!")),
            first_name: None,
            last_name: Some(String::from("Doe")),
            password: Some(String::new()),
        };

        let errors = form.validate().unwrap_err();
        let fields: Vec<&str> = errors.fields().keys().map(|k| k.as_str()).collect();
        assert_eq!(fields, vec!["email", "first_name", "password", "username"]);
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_recipe_filters() {
        let query = RecipeQuery::from_pairs(pairs(&[
            ("page", "2"),
            ("limit", "3"),
            ("author", "7"),
            ("tags", "breakfast"),
            ("tags", "lunch"),
            ("is_favorited", "1"),
            ("unknown", "x"),
        ]))
        .unwrap();

        assert_eq!(query.page.page(), 2);
        assert_eq!(query.page.page_size(6), 3);
        assert_eq!(query.author, Some(7));
        assert_eq!(query.tags, vec!["breakfast", "lunch"]);
        assert!(query.is_favorited);
        assert!(!query.is_in_shopping_cart);
    }

    #[test]
    fn rejects_malformed_filters() {
        let errors = RecipeQuery::from_pairs(pairs(&[("author", "me"), ("is_in_shopping_cart", "yes")]))
            .unwrap_err();
        let fields: Vec<&str> = errors.fields().keys().map(|k| k.as_str()).collect();

        assert_eq!(fields, vec!["author", "is_in_shopping_cart"]);
    }

    #[test]
    fn avatar_is_required() {
        assert!(AvatarForm { avatar: None }.validate().is_err());
        assert_eq!(
            AvatarForm {
                avatar: Some(String::from(" a.png "))
            }
            .validate()
            .unwrap(),
            "a.png"
        );
    }
}
