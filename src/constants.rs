pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 10;
pub const MAX_COUNT_PER_PAGE: i64 = 100;

pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32000;
pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32000;

pub const RECIPE_NAME_MAX_LENGTH: usize = 256;
pub const TAG_NAME_MAX_LENGTH: usize = 32;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 128;
pub const MEASUREMENT_UNIT_MAX_LENGTH: usize = 64;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";

/// Extra characters allowed in tag slugs besides ASCII alphanumerics.
pub const SLUG_EXTRA_CHARS: &[char] = &['_', '-'];
/// Extra characters allowed in usernames besides alphanumerics.
pub const USERNAME_EXTRA_CHARS: &[char] = &['.', '@', '+', '-', '_'];

pub const CATALOG_CACHE_BIND: &str = "catalog-cache-key";
