pub const PAGE_SIZE: i64 = 6;
pub const PAGE_SIZE_MAX: i64 = 100;

pub const RECIPE_NAME_MAX_LENGTH: usize = 256;

pub const RECIPE_IMAGE_DIR: &str = "recipes/images";
pub const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("png", "png"),
    ("jpeg", "jpg"),
    ("jpg", "jpg"),
    ("gif", "gif"),
    ("webp", "webp"),
];

pub const SESSION_LIFETIME_HOURS: i64 = 24;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

pub const MAX_BODY_BYTES: u64 = 1024 * 1024 * 10;
