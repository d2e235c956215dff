//! Client-facing shapes of stored entities.
//!
//! Each use case has its own builder: the full recipe view, the compact
//! recipe view returned by favorite/cart toggles, the user profile and the
//! subscription view. Flags that depend on who is asking are passed in as a
//! [`ViewerFlags`] set, which is empty for anonymous requests.

use std::collections::HashSet;

use serde::Serialize;

use super::schema::{Recipe, RecipePart, Tag, User, Uuid};
use crate::media::MediaStorage;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeIngredientView {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeView {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeCompactView {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<RecipeCompactView>,
    pub recipes_count: i64,
}

/// What the requesting principal has favorited, carted and subscribed to,
/// restricted to the recipes and authors being rendered.
#[derive(Debug, Default, Clone)]
pub struct ViewerFlags {
    pub favorited: HashSet<Uuid>,
    pub in_shopping_cart: HashSet<Uuid>,
    pub subscribed: HashSet<Uuid>,
}

impl ViewerFlags {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

pub fn user_view(user: &User, is_subscribed: bool) -> UserView {
    UserView {
        id: user.id,
        email: user.email.to_owned(),
        username: user.username.to_owned(),
        first_name: user.first_name.to_owned(),
        last_name: user.last_name.to_owned(),
        is_subscribed,
    }
}

pub fn recipe_view(
    recipe: &Recipe,
    author: &User,
    tags: Vec<Tag>,
    parts: Vec<RecipePart>,
    flags: &ViewerFlags,
    media: &MediaStorage,
) -> RecipeView {
    RecipeView {
        id: recipe.id,
        tags,
        author: user_view(author, flags.subscribed.contains(&author.id)),
        ingredients: parts
            .into_iter()
            .map(|part| RecipeIngredientView {
                id: part.ingredient_id,
                name: part.name,
                measurement_unit: part.measurement_unit,
                amount: part.amount,
            })
            .collect(),
        is_favorited: flags.favorited.contains(&recipe.id),
        is_in_shopping_cart: flags.in_shopping_cart.contains(&recipe.id),
        name: recipe.name.to_owned(),
        image: media.url(&recipe.image),
        text: recipe.text.to_owned(),
        cooking_time: recipe.cooking_time,
    }
}

pub fn recipe_compact_view(recipe: &Recipe, media: &MediaStorage) -> RecipeCompactView {
    RecipeCompactView {
        id: recipe.id,
        name: recipe.name.to_owned(),
        image: media.url(&recipe.image),
        cooking_time: recipe.cooking_time,
    }
}

pub fn subscription_view(
    author: &User,
    is_subscribed: bool,
    recipes: &[Recipe],
    recipes_count: i64,
    media: &MediaStorage,
) -> SubscriptionView {
    SubscriptionView {
        user: user_view(author, is_subscribed),
        recipes: recipes
            .iter()
            .map(|recipe| recipe_compact_view(recipe, media))
            .collect(),
        recipes_count,
    }
}
