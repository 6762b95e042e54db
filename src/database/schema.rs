use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type RecipeId = i32;
pub type UserId = i32;

/// One row of the recipes table. Child collections live in their own tables
/// and are stitched on by the assembler.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub submitted_by: String,
    pub servings: Option<String>,
    pub category: String,
    pub vegetarian: bool,
    pub featured: bool,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// Header row plus the aggregated tag list, as returned by the summary
/// queries. Recipes without tags carry an empty list.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub title: String,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub submitted_by: String,
    pub servings: Option<String>,
    pub category: String,
    pub vegetarian: bool,
    pub featured: bool,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientEntry {
    pub ingredient: String,
    pub footnote: Option<String>,
}

/// Fully assembled recipe: header fields flattened together with every child
/// collection, ordering preserved as fetched.
#[derive(Debug, Clone, Serialize)]
pub struct FullRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub tags: Vec<String>,
    pub ingredients: Vec<IngredientEntry>,
    pub steps: Vec<String>,
    pub footnotes: Vec<String>,
}

/// Creation payload for one recipe and its children. `ingredients` and
/// `steps` are non-empty by the time this is constructed.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub title: String,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub submitted_by: String,
    pub servings: Option<String>,
    pub category: String,
    pub vegetarian: bool,
    pub ingredients: Vec<IngredientEntry>,
    pub steps: Vec<String>,
    pub tags: Option<Vec<String>>,
    pub footnotes: Option<Vec<String>>,
}

/// Partial edit payload. Header fields update only the supplied columns;
/// a supplied child collection replaces the stored one wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub submitted_by: Option<String>,
    pub servings: Option<String>,
    pub category: Option<String>,
    pub vegetarian: Option<bool>,
    pub featured: Option<bool>,
    pub ingredients: Option<Vec<IngredientEntry>>,
    pub steps: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub footnotes: Option<Vec<String>>,
}

impl RecipePatch {
    pub fn has_header_fields(&self) -> bool {
        self.title.is_some()
            || self.source.is_some()
            || self.source_url.is_some()
            || self.submitted_by.is_some()
            || self.servings.is_some()
            || self.category.is_some()
            || self.vegetarian.is_some()
            || self.featured.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_header_fields()
            && self.ingredients.is_none()
            && self.steps.is_none()
            && self.tags.is_none()
            && self.footnotes.is_none()
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub token: Option<String>,
}

/// The slice of a user row handed back after signup and signin. The token is
/// the sole authentication credential.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct UserSession {
    pub id: UserId,
    pub username: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.username.is_none()
            && self.email.is_none()
    }
}
