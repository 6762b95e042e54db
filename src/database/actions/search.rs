use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, Pool, Postgres, QueryBuilder};
use thiserror::Error;

use crate::database::actions::fetch_rows;
use crate::database::error::{QueryError, TypeError};
use crate::database::schema::RecipeId;

/// One matching recipe id, as produced by the combined search query.
#[derive(FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchMatch {
    pub recipe_id: RecipeId,
}

/// AND vs OR combination, across parameter categories and across the
/// comma-separated terms inside one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    All,
    Any,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{0}")]
    Invalid(#[from] TypeError),

    #[error("{0}")]
    Query(#[from] QueryError),
}

/// Recognized search parameters. Free-text fields match case-insensitively
/// as regex patterns; `category` and the boolean flags match exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub title: Option<String>,
    pub source: Option<String>,
    pub submitted_by: Option<String>,
    pub category: Option<String>,
    pub vegetarian: Option<bool>,
    pub featured: Option<bool>,
    pub confirmed: Option<bool>,
    pub steps: Option<String>,
    pub footnotes: Option<String>,
    pub tags: Option<String>,
    pub ingredients: Option<String>,
    pub wildcard: Option<String>,
    pub limit: Option<i64>,
}

impl SearchParams {
    /// Reads the recognized parameters out of a query-string map. Unknown
    /// keys are ignored; a request with no id-producing parameter at all is
    /// rejected here, before any query is built.
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, TypeError> {
        let text = |key: &str| query.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let params = Self {
            title: text("title"),
            source: text("source"),
            submitted_by: text("submitted_by"),
            category: text("category"),
            vegetarian: parse_bool(query, "vegetarian")?,
            featured: parse_bool(query, "featured")?,
            confirmed: parse_bool(query, "confirmed")?,
            steps: text("steps"),
            footnotes: text("footnotes").or_else(|| text("notes")),
            tags: text("tags"),
            ingredients: text("ingredients"),
            wildcard: text("wildcard"),
            limit: parse_limit(query)?,
        };

        if !params.contributes() {
            return Err(TypeError::new("At least one search parameter is required."));
        }

        Ok(params)
    }

    /// Whether any parameter contributes a candidate-id subquery. `limit`
    /// alone restricts nothing and does not count.
    pub fn contributes(&self) -> bool {
        self.title.is_some()
            || self.source.is_some()
            || self.submitted_by.is_some()
            || self.category.is_some()
            || self.vegetarian.is_some()
            || self.featured.is_some()
            || self.confirmed.is_some()
            || self.steps.is_some()
            || self.footnotes.is_some()
            || self.tags.is_some()
            || self.ingredients.is_some()
            || self.wildcard.is_some()
    }
}

fn parse_bool(query: &HashMap<String, String>, key: &str) -> Result<Option<bool>, TypeError> {
    match query.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(value) => match value.to_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(TypeError::new(&format!(
                "Type Error: '{key}' must be a boolean"
            ))),
        },
    }
}

fn parse_limit(query: &HashMap<String, String>) -> Result<Option<i64>, TypeError> {
    match query.get("limit").map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(value) => match value.parse::<i64>() {
            Ok(limit) if limit > 0 => Ok(Some(limit)),
            _ => Err(TypeError::new("Type Error: 'limit' must be a positive number")),
        },
    }
}

/// One candidate-id subquery against a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IdQuery {
    HeaderPattern {
        column: &'static str,
        pattern: String,
    },
    HeaderText {
        column: &'static str,
        value: String,
    },
    HeaderFlag {
        column: &'static str,
        value: bool,
    },
    ChildPattern {
        table: &'static str,
        column: &'static str,
        pattern: String,
    },
    /// Ingredient text or its companion footnote.
    IngredientPattern { pattern: String },
    /// One wildcard term, searched across every text-bearing table.
    WildcardPattern { pattern: String },
}

fn split_terms(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// Per-field patterns for a comma-separated value. Under match-all each term
/// becomes its own subquery (intersection); under match-any the terms
/// collapse into one alternation pattern.
fn field_patterns(value: &str, mode: MatchMode) -> Vec<String> {
    let terms = split_terms(value);
    match mode {
        MatchMode::All => terms,
        MatchMode::Any => {
            if terms.len() <= 1 {
                terms
            } else {
                vec![terms.join("|")]
            }
        }
    }
}

fn id_queries(params: &SearchParams, mode: MatchMode) -> Vec<IdQuery> {
    let mut queries = Vec::new();

    let mut header = |column: &'static str, value: &Option<String>| {
        if let Some(value) = value {
            for pattern in field_patterns(value, mode) {
                queries.push(IdQuery::HeaderPattern { column, pattern });
            }
        }
    };
    header("title", &params.title);
    header("source", &params.source);
    header("submitted_by", &params.submitted_by);

    if let Some(category) = &params.category {
        queries.push(IdQuery::HeaderText {
            column: "category",
            value: category.clone(),
        });
    }

    let mut flag = |column: &'static str, value: Option<bool>| {
        if let Some(value) = value {
            queries.push(IdQuery::HeaderFlag { column, value });
        }
    };
    flag("vegetarian", params.vegetarian);
    flag("featured", params.featured);
    flag("is_confirmed", params.confirmed);

    let mut child = |table: &'static str, column: &'static str, value: &Option<String>| {
        if let Some(value) = value {
            for pattern in field_patterns(value, mode) {
                queries.push(IdQuery::ChildPattern {
                    table,
                    column,
                    pattern,
                });
            }
        }
    };
    child("steps", "step", &params.steps);
    child("footnotes", "footnote", &params.footnotes);
    child("tags", "tag", &params.tags);

    if let Some(value) = &params.ingredients {
        for pattern in field_patterns(value, mode) {
            queries.push(IdQuery::IngredientPattern { pattern });
        }
    }

    // Every wildcard term is its own subquery, regardless of mode.
    if let Some(value) = &params.wildcard {
        for pattern in split_terms(value) {
            queries.push(IdQuery::WildcardPattern { pattern });
        }
    }

    queries
}

fn push_id_query(builder: &mut QueryBuilder<'static, Postgres>, query: IdQuery) {
    match query {
        IdQuery::HeaderPattern { column, pattern } => {
            builder
                .push("(SELECT id AS recipe_id FROM recipes WHERE ")
                .push(column)
                .push(" ~* ")
                .push_bind(pattern)
                .push(")");
        }
        IdQuery::HeaderText { column, value } => {
            builder
                .push("(SELECT id AS recipe_id FROM recipes WHERE ")
                .push(column)
                .push(" = ")
                .push_bind(value)
                .push(")");
        }
        IdQuery::HeaderFlag { column, value } => {
            builder
                .push("(SELECT id AS recipe_id FROM recipes WHERE ")
                .push(column)
                .push(" = ")
                .push_bind(value)
                .push(")");
        }
        IdQuery::ChildPattern {
            table,
            column,
            pattern,
        } => {
            builder
                .push("(SELECT recipe_id FROM ")
                .push(table)
                .push(" WHERE ")
                .push(column)
                .push(" ~* ")
                .push_bind(pattern)
                .push(")");
        }
        IdQuery::IngredientPattern { pattern } => {
            builder
                .push("(SELECT recipe_id FROM ingredients WHERE ingredient ~* ")
                .push_bind(pattern.clone())
                .push(" OR footnote ~* ")
                .push_bind(pattern)
                .push(")");
        }
        IdQuery::WildcardPattern { pattern } => {
            builder
                .push("(SELECT id AS recipe_id FROM recipes WHERE title ~* ")
                .push_bind(pattern.clone())
                .push(" UNION SELECT recipe_id FROM ingredients WHERE ingredient ~* ")
                .push_bind(pattern.clone())
                .push(" OR footnote ~* ")
                .push_bind(pattern.clone())
                .push(" UNION SELECT recipe_id FROM steps WHERE step ~* ")
                .push_bind(pattern.clone())
                .push(" UNION SELECT recipe_id FROM tags WHERE tag ~* ")
                .push_bind(pattern.clone())
                .push(" UNION SELECT recipe_id FROM footnotes WHERE footnote ~* ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// Composes the combined candidate-id query: every contributed subquery
/// joined with INTERSECT (match-all) or UNION (match-any), de-duplicated,
/// with the optional row limit applied only to the final result. Pure
/// composition over bound parameters; user input never lands in the SQL
/// text itself.
pub fn build_search_query(
    params: &SearchParams,
    mode: MatchMode,
) -> Result<QueryBuilder<'static, Postgres>, TypeError> {
    let queries = id_queries(params, mode);
    if queries.is_empty() {
        return Err(TypeError::new("At least one search parameter is required."));
    }

    let connector = match mode {
        MatchMode::All => " INTERSECT ",
        MatchMode::Any => " UNION ",
    };

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT DISTINCT recipe_id FROM (");

    for (i, query) in queries.into_iter().enumerate() {
        if i > 0 {
            builder.push(connector);
        }
        push_id_query(&mut builder, query);
    }

    builder.push(") AS matches");

    if let Some(limit) = params.limit {
        builder.push(" LIMIT ").push_bind(limit);
    }

    Ok(builder)
}

/// Resolves the de-duplicated set of recipe ids matching the parameters.
pub async fn search_recipes_for_matches(
    params: &SearchParams,
    mode: MatchMode,
    pool: &Pool<Postgres>,
) -> Result<Vec<SearchMatch>, SearchError> {
    let mut query = build_search_query(params, mode)?;

    let matches = fetch_rows(query.build_query_as::<SearchMatch>().fetch_all(pool)).await?;

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn split_terms_trims_and_drops_empty_entries() {
        assert_eq!(split_terms("vegan, quick ,,  "), vec!["vegan", "quick"]);
    }

    #[test]
    fn match_any_collapses_terms_into_one_alternation() {
        assert_eq!(
            field_patterns("vegan,quick", MatchMode::Any),
            vec!["vegan|quick"]
        );
        assert_eq!(
            field_patterns("vegan,quick", MatchMode::All),
            vec!["vegan", "quick"]
        );
    }

    #[test]
    fn multi_term_tags_intersect_under_match_all() {
        let params = SearchParams {
            tags: Some(String::from("vegan,quick")),
            ..SearchParams::default()
        };

        let query = build_search_query(&params, MatchMode::All).unwrap();
        assert_eq!(
            query.sql(),
            "SELECT DISTINCT recipe_id FROM (\
             (SELECT recipe_id FROM tags WHERE tag ~* $1) \
             INTERSECT \
             (SELECT recipe_id FROM tags WHERE tag ~* $2)\
             ) AS matches"
        );
    }

    #[test]
    fn multi_term_tags_union_under_match_any() {
        let params = SearchParams {
            tags: Some(String::from("vegan,quick")),
            ..SearchParams::default()
        };

        let query = build_search_query(&params, MatchMode::Any).unwrap();
        assert_eq!(
            query.sql(),
            "SELECT DISTINCT recipe_id FROM (\
             (SELECT recipe_id FROM tags WHERE tag ~* $1)\
             ) AS matches"
        );
    }

    #[test]
    fn categories_combine_with_the_same_mode() {
        let params = SearchParams {
            title: Some(String::from("chili")),
            vegetarian: Some(true),
            ..SearchParams::default()
        };

        let all = build_search_query(&params, MatchMode::All).unwrap();
        assert!(all.sql().contains(" INTERSECT "));
        assert!(all.sql().contains("title ~* $1"));
        assert!(all.sql().contains("vegetarian = $2"));

        let any = build_search_query(&params, MatchMode::Any).unwrap();
        assert!(any.sql().contains(" UNION "));
    }

    #[test]
    fn category_matches_exactly_not_as_pattern() {
        let params = SearchParams {
            category: Some(String::from("dessert")),
            ..SearchParams::default()
        };

        let query = build_search_query(&params, MatchMode::Any).unwrap();
        assert!(query.sql().contains("category = $1"));
        assert!(!query.sql().contains("category ~*"));
    }

    #[test]
    fn ingredients_match_text_or_companion_footnote() {
        let params = SearchParams {
            ingredients: Some(String::from("butter")),
            ..SearchParams::default()
        };

        let query = build_search_query(&params, MatchMode::All).unwrap();
        assert!(query
            .sql()
            .contains("ingredient ~* $1 OR footnote ~* $2"));
    }

    #[test]
    fn each_wildcard_term_spans_all_tables() {
        let params = SearchParams {
            wildcard: Some(String::from("lemon,mint")),
            ..SearchParams::default()
        };

        let query = build_search_query(&params, MatchMode::All).unwrap();
        let sql = query.sql();

        assert!(sql.contains("title ~* $1"));
        assert!(sql.contains("FROM steps WHERE step ~* $4"));
        assert!(sql.contains("FROM tags WHERE tag ~* $5"));
        assert!(sql.contains("FROM footnotes WHERE footnote ~* $6"));
        // Two terms, two wildcard subqueries joined by the top-level mode.
        assert!(sql.contains(" INTERSECT "));
        assert!(sql.contains("title ~* $7"));
    }

    #[test]
    fn limit_applies_only_to_the_combined_query() {
        let params = SearchParams {
            tags: Some(String::from("vegan")),
            limit: Some(5),
            ..SearchParams::default()
        };

        let query = build_search_query(&params, MatchMode::Any).unwrap();
        assert!(query.sql().ends_with(") AS matches LIMIT $2"));
    }

    #[test]
    fn no_parameters_is_a_validation_error() {
        let err = build_search_query(&SearchParams::default(), MatchMode::Any)
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "At least one search parameter is required."
        );
    }

    #[test]
    fn from_query_requires_a_contributing_parameter() {
        let err = SearchParams::from_query(&query_map(&[("limit", "5")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "At least one search parameter is required."
        );
    }

    #[test]
    fn from_query_reads_recognized_keys() {
        let params = SearchParams::from_query(&query_map(&[
            ("title", "chili"),
            ("tags", "vegan,quick"),
            ("vegetarian", "true"),
            ("limit", "10"),
            ("unrecognized", "ignored"),
        ]))
        .unwrap();

        assert_eq!(params.title.as_deref(), Some("chili"));
        assert_eq!(params.tags.as_deref(), Some("vegan,quick"));
        assert_eq!(params.vegetarian, Some(true));
        assert_eq!(params.limit, Some(10));
        assert_eq!(params.source, None);
    }

    #[test]
    fn notes_is_an_alias_for_footnotes() {
        let params = SearchParams::from_query(&query_map(&[("notes", "oven")])).unwrap();
        assert_eq!(params.footnotes.as_deref(), Some("oven"));
    }

    #[test]
    fn booleans_parse_strictly() {
        let err = SearchParams::from_query(&query_map(&[("vegetarian", "yes")])).unwrap_err();
        assert_eq!(err.to_string(), "Type Error: 'vegetarian' must be a boolean");

        let params = SearchParams::from_query(&query_map(&[("featured", "0")])).unwrap();
        assert_eq!(params.featured, Some(false));
    }

    #[test]
    fn limit_must_be_a_positive_number() {
        let err =
            SearchParams::from_query(&query_map(&[("title", "x"), ("limit", "-3")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type Error: 'limit' must be a positive number"
        );
    }
}
