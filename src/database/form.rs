use std::{
    collections::{HashMap, HashSet},
    str::FromStr,
};

use serde::Deserialize;

use super::{error::ApiError, schema::Uuid};
use crate::constants::{RECIPE_NAME_MAX_LENGTH, PAGE_SIZE, PAGE_SIZE_MAX};

pub type FormData = Vec<(String, String)>;

/// Query string parameters, keeping every value of repeated keys.
pub struct Form {
    inner: HashMap<String, Vec<String>>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        let mut inner: HashMap<String, Vec<String>> = HashMap::new();
        data.into_iter()
            .for_each(|(key, value)| inner.entry(key).or_default().push(value));

        Self { inner }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(|value| value.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner.get(key).cloned().unwrap_or_default()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, ApiError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_e| ApiError::Validation(format!("Invalid value for '{key}'"))),
            None => Ok(None),
        }
    }

    /// `1` and `true` switch a filter on, anything else leaves it off.
    pub fn get_flag(&self, key: &str) -> bool {
        matches!(self.get_str(key), Some("1") | Some("true"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn from_form(form: &Form) -> Result<Self, ApiError> {
        let page = form.get_number::<i64>("page")?.unwrap_or(1);
        let limit = form.get_number::<i64>("limit")?.unwrap_or(PAGE_SIZE);

        if !(1..=i64::MAX / PAGE_SIZE_MAX + 1).contains(&page) {
            return Err(ApiError::validation("Invalid page."));
        }
        if limit < 1 {
            return Err(ApiError::validation("Invalid limit."));
        }

        Ok(Self {
            page,
            limit: limit.min(PAGE_SIZE_MAX),
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<Self, ApiError> {
        Ok(Self {
            tags: form.get_all("tags"),
            author: form.get_number("author")?,
            is_favorited: form.get_flag("is_favorited"),
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart"),
        })
    }
}

/// Cap on the recipes nested in subscription views.
pub fn recipes_limit(form: &Form) -> Result<Option<i64>, ApiError> {
    match form.get_number::<i64>("recipes_limit")? {
        Some(limit) if limit < 0 => Err(ApiError::validation("Invalid recipes_limit.")),
        limit => Ok(limit),
    }
}

/// Prefix filter of the ingredient listing, `name` or `search`.
pub fn ingredient_search(form: &Form) -> Option<String> {
    form.get_str("name")
        .or_else(|| form.get_str("search"))
        .map(str::trim)
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_owned)
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Write payload for both recipe creation and update.
#[derive(Deserialize, Debug, Clone)]
pub struct RecipeForm {
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeForm {
    pub fn validate(&self, creating: bool) -> Result<(), ApiError> {
        let mut seen = HashSet::new();
        for ingredient in self.ingredients.iter() {
            if !seen.insert(ingredient.id) {
                return Err(ApiError::validation("Duplicated ingredients"));
            }
            if ingredient.amount <= 0 {
                return Err(ApiError::validation("Amount should be more than 0"));
            }
        }

        if self.cooking_time <= 0 {
            return Err(ApiError::validation("Cooking time should be more than 0"));
        }

        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("Name may not be blank"));
        }
        if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
            return Err(ApiError::Validation(format!(
                "Name may not be longer than {RECIPE_NAME_MAX_LENGTH} characters"
            )));
        }
        if self.text.trim().is_empty() {
            return Err(ApiError::validation("Text may not be blank"));
        }

        if creating && self.image.as_deref().map_or(true, str::is_empty) {
            return Err(ApiError::validation("Image is required"));
        }

        Ok(())
    }

    pub fn ingredient_ids(&self) -> Vec<Uuid> {
        self.ingredients.iter().map(|i| i.id).collect()
    }

    /// Tag ids in request order with repeats dropped.
    pub fn unique_tags(&self) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.tags
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(ingredients: &[(Uuid, i32)], cooking_time: i32) -> RecipeForm {
        RecipeForm {
            ingredients: ingredients
                .iter()
                .map(|(id, amount)| IngredientAmount {
                    id: *id,
                    amount: *amount,
                })
                .collect(),
            tags: vec![1, 2, 1],
            image: Some(String::from("data:image/png;base64,iVBORw0KGgo=")),
            name: String::from("Omelette"),
            text: String::from("Beat the eggs."),
            cooking_time,
        }
    }

    fn message(result: Result<(), ApiError>) -> String {
        match result {
            Err(ApiError::Validation(info)) => info,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_recipe() {
        assert!(form(&[(1, 2), (2, 3)], 10).validate(true).is_ok());
    }

    #[test]
    fn rejects_zero_cooking_time() {
        assert_eq!(
            message(form(&[(1, 2)], 0).validate(true)),
            "Cooking time should be more than 0"
        );
        assert!(form(&[(1, 2)], -5).validate(false).is_err());
    }

    #[test]
    fn rejects_duplicated_ingredients() {
        assert_eq!(
            message(form(&[(1, 2), (3, 1), (1, 5)], 10).validate(true)),
            "Duplicated ingredients"
        );
    }

    #[test]
    fn rejects_non_positive_amount() {
        assert_eq!(
            message(form(&[(1, 0)], 10).validate(true)),
            "Amount should be more than 0"
        );
        assert!(form(&[(1, -2)], 10).validate(true).is_err());
    }

    #[test]
    fn image_is_only_required_on_create() {
        let mut recipe = form(&[(1, 1)], 5);
        recipe.image = None;

        assert_eq!(message(recipe.validate(true)), "Image is required");
        assert!(recipe.validate(false).is_ok());
    }

    #[test]
    fn rejects_blank_and_overlong_names() {
        let mut recipe = form(&[(1, 1)], 5);
        recipe.name = String::from("   ");
        assert!(recipe.validate(true).is_err());

        recipe.name = "a".repeat(RECIPE_NAME_MAX_LENGTH + 1);
        assert!(recipe.validate(true).is_err());
    }

    #[test]
    fn empty_ingredient_list_is_allowed() {
        assert!(form(&[], 5).validate(true).is_ok());
    }

    #[test]
    fn unique_tags_keep_first_occurrence() {
        assert_eq!(form(&[(1, 1)], 5).unique_tags(), vec![1, 2]);
    }

    #[test]
    fn parses_recipe_payload() {
        let recipe: RecipeForm = serde_json::from_str(
            r#"{
                "ingredients": [{"id": 1123, "amount": 10}],
                "tags": [1, 2],
                "image": "data:image/png;base64,AAAA",
                "name": "string",
                "text": "string",
                "cooking_time": 1
            }"#,
        )
        .unwrap();

        assert_eq!(
            recipe.ingredients,
            vec![IngredientAmount {
                id: 1123,
                amount: 10
            }]
        );
        assert_eq!(recipe.ingredient_ids(), vec![1123]);
    }

    #[test]
    fn filter_reads_repeated_tags_and_flags() {
        let form = Form::from_data(vec![
            (String::from("tags"), String::from("breakfast")),
            (String::from("tags"), String::from("lunch")),
            (String::from("author"), String::from("3")),
            (String::from("is_favorited"), String::from("1")),
            (String::from("is_in_shopping_cart"), String::from("0")),
        ]);

        let filter = RecipeFilter::from_form(&form).unwrap();
        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
        assert_eq!(filter.author, Some(3));
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
    }

    #[test]
    fn filter_rejects_non_numeric_author() {
        let form = Form::from_data(vec![(String::from("author"), String::from("me"))]);
        assert!(RecipeFilter::from_form(&form).is_err());
    }

    #[test]
    fn recipes_limit_is_optional_and_non_negative() {
        let none = Form::from_data(vec![]);
        assert_eq!(recipes_limit(&none).unwrap(), None);

        let three = Form::from_data(vec![(String::from("recipes_limit"), String::from("3"))]);
        assert_eq!(recipes_limit(&three).unwrap(), Some(3));

        let negative = Form::from_data(vec![(String::from("recipes_limit"), String::from("-1"))]);
        assert!(recipes_limit(&negative).is_err());
    }

    #[test]
    fn ingredient_search_accepts_both_keys() {
        let by_name = Form::from_data(vec![(String::from("name"), String::from(" eg "))]);
        assert_eq!(ingredient_search(&by_name).as_deref(), Some("eg"));

        let by_search = Form::from_data(vec![(String::from("search"), String::from("fl"))]);
        assert_eq!(ingredient_search(&by_search).as_deref(), Some("fl"));

        let blank = Form::from_data(vec![(String::from("name"), String::from("  "))]);
        assert_eq!(ingredient_search(&blank), None);
    }

    #[test]
    fn page_request_defaults_and_caps() {
        let page = PageRequest::from_form(&Form::from_data(vec![])).unwrap();
        assert_eq!(page, PageRequest::default());
        assert_eq!(page.offset(), 0);

        let page = PageRequest::from_form(&Form::from_data(vec![
            (String::from("page"), String::from("3")),
            (String::from("limit"), String::from("1000")),
        ]))
        .unwrap();
        assert_eq!(page.limit, PAGE_SIZE_MAX);
        assert_eq!(page.offset(), 2 * PAGE_SIZE_MAX);

        let page = Form::from_data(vec![(String::from("page"), String::from("0"))]);
        assert!(PageRequest::from_form(&page).is_err());
    }

    #[test]
    fn page_request_rejects_offset_overflow() {
        let huge = Form::from_data(vec![
            (String::from("page"), i64::MAX.to_string()),
            (String::from("limit"), String::from("1000")),
        ]);
        assert!(matches!(
            PageRequest::from_form(&huge),
            Err(ApiError::Validation(_))
        ));

        let last = Form::from_data(vec![
            (String::from("page"), (i64::MAX / PAGE_SIZE_MAX + 1).to_string()),
            (String::from("limit"), String::from("1000")),
        ]);
        let page = PageRequest::from_form(&last).unwrap();
        assert_eq!(page.offset(), i64::MAX / PAGE_SIZE_MAX * PAGE_SIZE_MAX);
    }
}
