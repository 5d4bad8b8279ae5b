pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const SHORT_LINK_LENGTH: usize = 5;
pub const SHORT_LINK_MAX_ATTEMPTS: usize = 64;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PERSON_NAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MAX_LENGTH: usize = 150;
pub const RECIPE_NAME_MAX_LENGTH: usize = 256;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32_000;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MAX_INGREDIENT_AMOUNT: i32 = 32_000;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_HEADER_SCHEME: &str = "Token";
pub const SESSION_LIFETIME_HOURS: i64 = 24;

pub const RECIPE_CACHE_KEY: &str = "recipe-cache-key";

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

pub const MAX_BODY_BYTES: u64 = 8 * 1024 * 1024;
