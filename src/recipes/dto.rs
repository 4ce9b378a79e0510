use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::attributes::dto::{clean_name, AttributeView};
use crate::error::ApiError;
use crate::recipes::repo_types::{NewRecipe, Recipe, RecipeChanges, RecipeWithLinks};

const MAX_CHARS: usize = 255;
const PRICE_DECIMAL_PLACES: u32 = 2;
const PRICE_WHOLE_DIGITS: u32 = 3;

/// Which handler is rendering; decides the output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeAction {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
}

impl RecipeAction {
    /// `List` gets the reduced shape, every other action the full one.
    pub fn render(self, full: RecipeWithLinks, image_url: Option<String>) -> RecipeView {
        match self {
            RecipeAction::List => RecipeView::Summary(summary(&full.recipe)),
            RecipeAction::Retrieve
            | RecipeAction::Create
            | RecipeAction::Update
            | RecipeAction::PartialUpdate => RecipeView::Detail(detail(full, image_url)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RecipeView {
    Summary(RecipeSummary),
    Detail(RecipeDetail),
}

#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<AttributeView>,
    pub ingredients: Vec<AttributeView>,
    pub image: Option<String>,
}

fn money(mut price: Decimal) -> Decimal {
    price.rescale(PRICE_DECIMAL_PLACES);
    price
}

fn summary(r: &Recipe) -> RecipeSummary {
    RecipeSummary {
        id: r.id,
        title: r.title.clone(),
        time_minutes: r.time_minutes,
        price: money(r.price),
        link: r.link.clone(),
    }
}

fn detail(full: RecipeWithLinks, image_url: Option<String>) -> RecipeDetail {
    let RecipeWithLinks {
        recipe,
        tags,
        ingredients,
    } = full;
    RecipeDetail {
        id: recipe.id,
        title: recipe.title,
        description: recipe.description,
        time_minutes: recipe.time_minutes,
        price: money(recipe.price),
        link: recipe.link,
        tags: tags.into_iter().map(Into::into).collect(),
        ingredients: ingredients.into_iter().map(Into::into).collect(),
        image: image_url,
    }
}

/// Nested `{ "name": ... }` used for tags and ingredients in recipe writes.
#[derive(Debug, Deserialize)]
pub struct NameRef {
    pub name: String,
}

/// Body of POST and PUT. Unknown fields such as `user` are ignored.
#[derive(Debug, Deserialize)]
pub struct RecipeWrite {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    #[serde(default)]
    pub link: String,
    pub tags: Option<Vec<NameRef>>,
    pub ingredients: Option<Vec<NameRef>>,
}

/// Body of PATCH.
#[derive(Debug, Default, Deserialize)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<NameRef>>,
    pub ingredients: Option<Vec<NameRef>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

fn clean_title(raw: &str) -> Result<String, ApiError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("title: This field may not be blank."));
    }
    if title.chars().count() > MAX_CHARS {
        return Err(ApiError::bad_request(format!(
            "title: Ensure this field has no more than {MAX_CHARS} characters."
        )));
    }
    Ok(title.to_string())
}

fn clean_link(raw: &str) -> Result<String, ApiError> {
    let link = raw.trim();
    if link.chars().count() > MAX_CHARS {
        return Err(ApiError::bad_request(format!(
            "link: Ensure this field has no more than {MAX_CHARS} characters."
        )));
    }
    Ok(link.to_string())
}

/// Fits NUMERIC(5, 2): non-negative, at most 2 decimal places and 3 whole digits.
pub(crate) fn clean_price(price: Decimal) -> Result<Decimal, ApiError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ApiError::bad_request(
            "price: Ensure this value is greater than or equal to 0.",
        ));
    }
    let price = price.normalize();
    if price.scale() > PRICE_DECIMAL_PLACES {
        return Err(ApiError::bad_request(format!(
            "price: Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
        )));
    }
    if price.trunc() >= Decimal::from(10_i64.pow(PRICE_WHOLE_DIGITS)) {
        return Err(ApiError::bad_request(format!(
            "price: Ensure that there are no more than {PRICE_WHOLE_DIGITS} digits before the decimal point."
        )));
    }
    Ok(money(price))
}

fn clean_names(refs: Option<Vec<NameRef>>) -> Result<Option<Vec<String>>, ApiError> {
    refs.map(|list| list.iter().map(|r| clean_name(&r.name)).collect())
        .transpose()
}

impl RecipeWrite {
    pub fn into_new(self) -> Result<NewRecipe, ApiError> {
        Ok(NewRecipe {
            title: clean_title(&self.title)?,
            description: self.description,
            time_minutes: self.time_minutes,
            price: clean_price(self.price)?,
            link: clean_link(&self.link)?,
            tags: clean_names(self.tags)?.unwrap_or_default(),
            ingredients: clean_names(self.ingredients)?.unwrap_or_default(),
        })
    }

    /// Full replacement; omitted tag/ingredient lists keep their links.
    pub fn into_changes(self) -> Result<RecipeChanges, ApiError> {
        Ok(RecipeChanges {
            title: Some(clean_title(&self.title)?),
            description: Some(self.description),
            time_minutes: Some(self.time_minutes),
            price: Some(clean_price(self.price)?),
            link: Some(clean_link(&self.link)?),
            tags: clean_names(self.tags)?,
            ingredients: clean_names(self.ingredients)?,
        })
    }
}

impl RecipePatch {
    pub fn into_changes(self) -> Result<RecipeChanges, ApiError> {
        Ok(RecipeChanges {
            title: self.title.as_deref().map(clean_title).transpose()?,
            description: self.description,
            time_minutes: self.time_minutes,
            price: self.price.map(clean_price).transpose()?,
            link: self.link.as_deref().map(clean_link).transpose()?,
            tags: clean_names(self.tags)?,
            ingredients: clean_names(self.ingredients)?,
        })
    }
}

/// Parses `1,3,5` into ids; blank input means no filter.
pub(crate) fn parse_ids(param: Option<&str>, field: &str) -> Result<Vec<i64>, ApiError> {
    let Some(raw) = param else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ApiError::bad_request(format!("{field}: '{s}' is not a valid id.")))
        })
        .collect()
}
