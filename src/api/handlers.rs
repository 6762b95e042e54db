use std::collections::HashMap;
use std::convert::Infallible;

use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{Pool, Postgres};
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::authentication::cryptography::{generate_access_token, hash_password, verify_password};
use crate::constants::RECIPE_CATEGORIES;
use crate::database::actions::search::{self, MatchMode, SearchError, SearchParams};
use crate::database::actions::{recipes, users};
use crate::database::error::{QueryError, TypeError, WriteError};
use crate::database::form::Form;
use crate::database::schema::{NewRecipe, NewUser, RecipeId, RecipePatch, User, UserId, UserPatch};

fn json_reply<T: Serialize>(status: StatusCode, body: &T) -> Response {
    reply::with_status(reply::json(body), status).into_response()
}

fn text_reply(status: StatusCode, body: &'static str) -> Response {
    reply::with_status(body, status).into_response()
}

/// `{"error": "<message>"}`, the user-route error shape.
fn user_error(status: StatusCode, message: &str) -> Response {
    json_reply(status, &json!({ "error": message }))
}

/// `{"error": {"message", "details"?}}`, the recipe-route error shape.
fn recipe_error(status: StatusCode, message: &str, details: Option<&str>) -> Response {
    let mut error = serde_json::Map::new();
    error.insert("message".to_string(), Value::String(message.to_string()));
    if let Some(details) = details {
        error.insert("details".to_string(), Value::String(details.to_string()));
    }

    json_reply(status, &json!({ "error": error }))
}

fn invalid_payload(err: TypeError) -> Response {
    recipe_error(StatusCode::BAD_REQUEST, &err.to_string(), None)
}

fn known_category(category: &str) -> bool {
    RECIPE_CATEGORIES.iter().any(|(slug, _)| *slug == category)
}

pub async fn info() -> Result<Response, Infallible> {
    Ok(json_reply(
        StatusCode::OK,
        &json!({ "info": "API made with Rust and PostgreSQL for storing recipes." }),
    ))
}

/// GET /recipes: all recipe summaries. `?confirmed=true` narrows to
/// confirmed ones.
pub async fn get_all_recipes(
    query: HashMap<String, String>,
    pool: Pool<Postgres>,
) -> Result<Response, Infallible> {
    let confirmed_only = matches!(
        query.get("confirmed").map(|v| v.trim().to_lowercase()),
        Some(v) if v == "true" || v == "1"
    );

    let result = if confirmed_only {
        recipes::get_all_confirmed_recipes(&pool).await
    } else {
        recipes::get_all_recipes(&pool).await
    };

    Ok(match result {
        Ok(rows) => json_reply(StatusCode::OK, &json!({ "data": rows })),
        Err(e) => recipe_error(StatusCode::BAD_REQUEST, &e.to_string(), e.details()),
    })
}

/// GET /recipes/search: resolves matching ids, then hydrates them into
/// summaries ordered by title. `?all=true` switches to match-all.
pub async fn search_recipes(
    query: HashMap<String, String>,
    pool: Pool<Postgres>,
) -> Result<Response, Infallible> {
    let mode = match query.get("all").map(|v| v.trim().to_lowercase()) {
        None => MatchMode::Any,
        Some(v) if v.is_empty() || v == "false" || v == "0" => MatchMode::Any,
        Some(v) if v == "true" || v == "1" => MatchMode::All,
        Some(_) => {
            return Ok(recipe_error(
                StatusCode::BAD_REQUEST,
                "Type Error: 'all' must be a boolean",
                None,
            ))
        }
    };

    let params = match SearchParams::from_query(&query) {
        Ok(params) => params,
        Err(e) => return Ok(invalid_payload(e)),
    };

    let matches = match search::search_recipes_for_matches(&params, mode, &pool).await {
        Ok(matches) => matches,
        Err(SearchError::Invalid(e)) => return Ok(invalid_payload(e)),
        Err(SearchError::Query(e)) => {
            return Ok(recipe_error(
                StatusCode::BAD_REQUEST,
                &e.to_string(),
                e.details(),
            ))
        }
    };

    if matches.is_empty() {
        return Ok(json_reply(StatusCode::OK, &json!({ "data": [] })));
    }

    let ids: Vec<RecipeId> = matches.into_iter().map(|m| m.recipe_id).collect();

    Ok(match recipes::get_recipes_by_ids(&ids, &pool).await {
        Ok(rows) => json_reply(StatusCode::OK, &json!({ "data": rows })),
        Err(e) => recipe_error(StatusCode::BAD_REQUEST, &e.to_string(), e.details()),
    })
}

/// GET /recipes/:id: the fully assembled recipe.
pub async fn get_recipe(id: RecipeId, pool: Pool<Postgres>) -> Result<Response, Infallible> {
    Ok(match recipes::get_full_recipe(id, &pool).await {
        Ok(recipe) => json_reply(StatusCode::OK, &recipe),
        Err(QueryError::NotFound) => {
            recipe_error(StatusCode::NOT_FOUND, "Recipe not found.", None)
        }
        Err(e) => recipe_error(StatusCode::BAD_REQUEST, &e.to_string(), e.details()),
    })
}

/// POST /recipes: validates the payload shape, then hands off to the
/// transactional writer.
pub async fn add_recipe(body: Value, pool: Pool<Postgres>) -> Result<Response, Infallible> {
    let form = match Form::from_value(body) {
        Ok(form) => form,
        Err(e) => return Ok(invalid_payload(e)),
    };

    let title = match form.get_str("title") {
        Ok(title) => title,
        Err(e) => return Ok(invalid_payload(e)),
    };
    let submitted_by = match form.get_str("submitted_by") {
        Ok(submitted_by) => submitted_by,
        Err(e) => return Ok(invalid_payload(e)),
    };

    let ingredients = match form.optional_ingredient_array("ingredients") {
        Ok(Some(ingredients)) if !ingredients.is_empty() => ingredients,
        Ok(_) => {
            return Ok(recipe_error(
                StatusCode::BAD_REQUEST,
                "At least one ingredient is required",
                None,
            ))
        }
        Err(e) => return Ok(invalid_payload(e)),
    };

    let steps = match form.optional_str_array("steps") {
        Ok(Some(steps)) if !steps.is_empty() => steps,
        Ok(_) => {
            return Ok(recipe_error(
                StatusCode::BAD_REQUEST,
                "At least one step is required",
                None,
            ))
        }
        Err(e) => return Ok(invalid_payload(e)),
    };

    let tags = match form.optional_str_array("tags") {
        Ok(tags) => tags,
        Err(e) => return Ok(invalid_payload(e)),
    };
    let footnotes = match form.optional_str_array("footnotes") {
        Ok(footnotes) => footnotes,
        Err(e) => return Ok(invalid_payload(e)),
    };

    let category = match form.get_str("category") {
        Ok(category) => category,
        Err(e) => return Ok(invalid_payload(e)),
    };
    if !known_category(&category) {
        return Ok(recipe_error(
            StatusCode::BAD_REQUEST,
            &format!("Unknown category '{category}'"),
            None,
        ));
    }

    let (source, source_url, servings, vegetarian) = match (
        form.optional_str("source"),
        form.optional_str("source_url"),
        form.optional_str("servings"),
        form.optional_bool("vegetarian"),
    ) {
        (Ok(source), Ok(source_url), Ok(servings), Ok(vegetarian)) => {
            (source, source_url, servings, vegetarian)
        }
        (Err(e), ..) | (_, Err(e), ..) | (_, _, Err(e), _) | (.., Err(e)) => {
            return Ok(invalid_payload(e))
        }
    };

    let payload = NewRecipe {
        title: title.clone(),
        source,
        source_url,
        submitted_by,
        servings,
        category,
        vegetarian: vegetarian.unwrap_or(false),
        ingredients,
        steps,
        tags,
        footnotes,
    };

    Ok(match recipes::add_recipe(&payload, &pool).await {
        Ok(recipe_id) => json_reply(StatusCode::OK, &json!({ "id": recipe_id, "title": title })),
        Err(e) => recipe_error(StatusCode::BAD_REQUEST, &e.to_string(), e.details()),
    })
}

/// PATCH /recipes/:id: partial header update plus wholesale replacement of
/// any supplied child collection.
pub async fn edit_recipe(
    id: RecipeId,
    body: Value,
    pool: Pool<Postgres>,
) -> Result<Response, Infallible> {
    let form = match Form::from_value(body) {
        Ok(form) => form,
        Err(e) => return Ok(invalid_payload(e)),
    };

    let patch = match parse_recipe_patch(&form) {
        Ok(patch) => patch,
        Err(e) => return Ok(invalid_payload(e)),
    };

    if patch.is_empty() {
        return Ok(recipe_error(
            StatusCode::BAD_REQUEST,
            "You must include data to update in the request body.",
            None,
        ));
    }

    if let Some(category) = &patch.category {
        if !known_category(category) {
            return Ok(recipe_error(
                StatusCode::BAD_REQUEST,
                &format!("Unknown category '{category}'"),
                None,
            ));
        }
    }

    Ok(match recipes::edit_recipe(id, &patch, &pool).await {
        Ok(recipe_id) => json_reply(
            StatusCode::OK,
            &json!({ "id": recipe_id, "title": patch.title }),
        ),
        Err(WriteError::NotFound) => {
            recipe_error(StatusCode::NOT_FOUND, "Recipe not found", None)
        }
        Err(e) => recipe_error(StatusCode::BAD_REQUEST, &e.to_string(), e.details()),
    })
}

fn parse_recipe_patch(form: &Form) -> Result<RecipePatch, TypeError> {
    Ok(RecipePatch {
        title: form.optional_str("title")?,
        source: form.optional_str("source")?,
        source_url: form.optional_str("source_url")?,
        submitted_by: form.optional_str("submitted_by")?,
        servings: form.optional_str("servings")?,
        category: form.optional_str("category")?,
        vegetarian: form.optional_bool("vegetarian")?,
        featured: form.optional_bool("featured")?,
        ingredients: form.optional_ingredient_array("ingredients")?,
        steps: form.optional_str_array("steps")?,
        tags: form.optional_str_array("tags")?,
        footnotes: form.optional_str_array("footnotes")?,
    })
}

pub async fn list_tags(pool: Pool<Postgres>) -> Result<Response, Infallible> {
    Ok(match recipes::list_tags(&pool).await {
        Ok(tags) => json_reply(StatusCode::OK, &json!({ "tags": tags })),
        Err(e) => recipe_error(StatusCode::BAD_REQUEST, &e.to_string(), e.details()),
    })
}

/// The submitter list ships under the `tags` key; clients depend on that
/// shape.
pub async fn list_submitters(pool: Pool<Postgres>) -> Result<Response, Infallible> {
    Ok(match recipes::list_submitters(&pool).await {
        Ok(submitters) => json_reply(StatusCode::OK, &json!({ "tags": submitters })),
        Err(e) => recipe_error(StatusCode::BAD_REQUEST, &e.to_string(), e.details()),
    })
}

pub async fn list_categories() -> Result<Response, Infallible> {
    let categories: Vec<&str> = RECIPE_CATEGORIES.iter().map(|(slug, _)| *slug).collect();
    Ok(json_reply(StatusCode::OK, &json!({ "categories": categories })))
}

/// POST /signup: creates a user with a hashed password and a fresh token.
pub async fn signup(body: Value, pool: Pool<Postgres>) -> Result<Response, Infallible> {
    let form = match Form::from_value(body) {
        Ok(form) => form,
        Err(e) => return Ok(user_error(StatusCode::BAD_REQUEST, &e.to_string())),
    };

    let required = [
        ("first_name", "First name is required"),
        ("last_name", "Last name is required"),
        ("email", "Email is required"),
        ("username", "Username is required"),
        ("password", "Password is required"),
    ];

    let mut fields = HashMap::new();
    for (key, message) in required {
        match form.optional_str(key) {
            Ok(Some(value)) => {
                fields.insert(key, value);
            }
            Ok(None) => return Ok(user_error(StatusCode::BAD_REQUEST, message)),
            Err(e) => return Ok(user_error(StatusCode::BAD_REQUEST, &e.to_string())),
        }
    }

    let password_hash = match hash_password(&fields["password"]) {
        Ok(hash) => hash,
        Err(_) => {
            return Ok(user_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.",
            ))
        }
    };

    let new_user = NewUser {
        first_name: fields["first_name"].clone(),
        last_name: fields["last_name"].clone(),
        username: fields["username"].clone(),
        email: fields["email"].clone(),
        password_hash,
        token: generate_access_token(),
    };

    Ok(match users::create_user(&new_user, &pool).await {
        Ok(user) => json_reply(StatusCode::CREATED, &json!({ "user": user })),
        Err(QueryError::Conflict { constraint }) if constraint == "users_username_key" => {
            user_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                &format!(
                    "Username {} is taken. Please select another one.",
                    new_user.username
                ),
            )
        }
        Err(QueryError::Conflict { constraint }) if constraint == "users_email_key" => user_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!(
                "Email {} already has an account. Please log in.",
                new_user.email
            ),
        ),
        Err(e) => user_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.details().unwrap_or("Something went wrong. Please try again."),
        ),
    })
}

/// POST /signin: verifies credentials and rotates the token. Unknown
/// username and wrong password are indistinguishable to the caller.
pub async fn signin(body: Value, pool: Pool<Postgres>) -> Result<Response, Infallible> {
    let form = match Form::from_value(body) {
        Ok(form) => form,
        Err(e) => return Ok(user_error(StatusCode::BAD_REQUEST, &e.to_string())),
    };

    let username = match form.optional_str("username") {
        Ok(Some(username)) => username,
        Ok(None) => return Ok(user_error(StatusCode::BAD_REQUEST, "Username is required")),
        Err(e) => return Ok(user_error(StatusCode::BAD_REQUEST, &e.to_string())),
    };
    let password = match form.optional_str("password") {
        Ok(Some(password)) => password,
        Ok(None) => return Ok(user_error(StatusCode::BAD_REQUEST, "Password is required")),
        Err(e) => return Ok(user_error(StatusCode::BAD_REQUEST, &e.to_string())),
    };

    let user = match users::get_user_by_username(&username, &pool).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Ok(user_error(
                StatusCode::UNAUTHORIZED,
                "Username or password is invalid.",
            ))
        }
        Err(e) => {
            return Ok(user_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.details().unwrap_or("Something went wrong. Please try again."),
            ))
        }
    };

    let authenticated = verify_password(&password, &user.password_hash).unwrap_or(false);
    if !authenticated {
        return Ok(user_error(
            StatusCode::UNAUTHORIZED,
            "Username or password is invalid.",
        ));
    }

    Ok(
        match users::rotate_user_token(user.id, &generate_access_token(), &pool).await {
            Ok(session) => json_reply(StatusCode::OK, &json!({ "user": session })),
            Err(e) => user_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.details().unwrap_or("Something went wrong. Please try again."),
            ),
        },
    )
}

/// POST /signout: clears the requester's token.
pub async fn signout(user: User, pool: Pool<Postgres>) -> Result<Response, Infallible> {
    Ok(match users::clear_user_token(user.id, &pool).await {
        Ok(()) => text_reply(StatusCode::OK, "User successfully signed out."),
        Err(_) => user_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong. User token not removed.",
        ),
    })
}

/// PATCH /user/:id: partial profile update. The requester can only update
/// themselves.
pub async fn update_user(
    id: UserId,
    user: User,
    body: Value,
    pool: Pool<Postgres>,
) -> Result<Response, Infallible> {
    if user.id != id {
        return Ok(user_error(
            StatusCode::UNAUTHORIZED,
            "Access denied. You do not have permission to update this user.",
        ));
    }

    let form = match Form::from_value(body) {
        Ok(form) => form,
        Err(e) => return Ok(user_error(StatusCode::BAD_REQUEST, &e.to_string())),
    };

    let patch = match (
        form.optional_str("first_name"),
        form.optional_str("last_name"),
        form.optional_str("username"),
        form.optional_str("email"),
    ) {
        (Ok(first_name), Ok(last_name), Ok(username), Ok(email)) => UserPatch {
            first_name,
            last_name,
            username,
            email,
        },
        (Err(e), ..) | (_, Err(e), ..) | (_, _, Err(e), _) | (.., Err(e)) => {
            return Ok(user_error(StatusCode::BAD_REQUEST, &e.to_string()))
        }
    };

    if patch.is_empty() {
        return Ok(user_error(
            StatusCode::BAD_REQUEST,
            "You must include data to update in the request body.",
        ));
    }

    Ok(match users::update_user(id, &patch, &pool).await {
        Ok(updated) => json_reply(StatusCode::OK, &json!({ "user": updated })),
        Err(QueryError::NotFound) => user_error(StatusCode::NOT_FOUND, "No user found."),
        Err(QueryError::Conflict { constraint }) if constraint == "users_username_key" => {
            user_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                &format!(
                    "Username {} is taken. Please select another one.",
                    patch.username.as_deref().unwrap_or_default()
                ),
            )
        }
        Err(QueryError::Conflict { constraint }) if constraint == "users_email_key" => user_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!(
                "Email {} already has an account. Please log in.",
                patch.email.as_deref().unwrap_or_default()
            ),
        ),
        Err(e) => user_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.details().unwrap_or("Something went wrong. Please try again."),
        ),
    })
}

/// DELETE /user/:id: the requester can only delete themselves.
pub async fn delete_user(
    id: UserId,
    user: User,
    pool: Pool<Postgres>,
) -> Result<Response, Infallible> {
    if user.id != id {
        return Ok(user_error(
            StatusCode::UNAUTHORIZED,
            "Access denied. You do not have permission to delete this user.",
        ));
    }

    Ok(match users::delete_user(id, &pool).await {
        Ok(0) => user_error(StatusCode::NOT_FOUND, "No user found."),
        Ok(_) => text_reply(StatusCode::OK, "User successfully deleted."),
        Err(e) => user_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.details().unwrap_or("Something went wrong. Please try again."),
        ),
    })
}
