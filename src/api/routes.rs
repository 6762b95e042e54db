use std::collections::HashMap;
use std::convert::Infallible;

use sqlx::{Pool, Postgres};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::api::handlers;
use crate::authentication::middleware::{with_pool, with_user, InvalidToken, MissingToken};

/// The complete route tree. Every handler gets the pool injected; protected
/// routes resolve the `token` header to a user first.
pub fn routes(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let info = warp::path::end().and(warp::get()).and_then(handlers::info);

    let signup = warp::path!("signup")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::signup);

    let signin = warp::path!("signin")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::signin);

    let signout = warp::path!("signout")
        .and(warp::post())
        .and(with_user(pool.clone()))
        .and(with_pool(pool.clone()))
        .and_then(handlers::signout);

    let update_user = warp::path!("user" / i32)
        .and(warp::patch())
        .and(with_user(pool.clone()))
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::update_user);

    let delete_user = warp::path!("user" / i32)
        .and(warp::delete())
        .and(with_user(pool.clone()))
        .and(with_pool(pool.clone()))
        .and_then(handlers::delete_user);

    let search_recipes = warp::path!("recipes" / "search")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_pool(pool.clone()))
        .and_then(handlers::search_recipes);

    let list_tags = warp::path!("recipes" / "tags")
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(handlers::list_tags);

    let list_submitters = warp::path!("recipes" / "submitters")
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(handlers::list_submitters);

    let list_categories = warp::path!("recipes" / "categories")
        .and(warp::get())
        .and_then(handlers::list_categories);

    let get_all_recipes = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_pool(pool.clone()))
        .and_then(handlers::get_all_recipes);

    let get_recipe = warp::path!("recipes" / i32)
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(handlers::get_recipe);

    let add_recipe = warp::path!("recipes")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::add_recipe);

    let edit_recipe = warp::path!("recipes" / i32)
        .and(warp::patch())
        .and(warp::body::json())
        .and(with_pool(pool))
        .and_then(handlers::edit_recipe);

    info.or(signup)
        .or(signin)
        .or(signout)
        .or(update_user)
        .or(delete_user)
        .or(search_recipes)
        .or(list_tags)
        .or(list_submitters)
        .or(list_categories)
        .or(get_all_recipes)
        .or(get_recipe)
        .or(add_recipe)
        .or(edit_recipe)
        .recover(handle_rejection)
}

/// Maps auth and framework rejections onto the wire responses the handlers
/// themselves never produce.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.find::<MissingToken>().is_some() {
        (StatusCode::UNAUTHORIZED, "Access denied. No token provided.")
    } else if err.find::<InvalidToken>().is_some() {
        (StatusCode::UNAUTHORIZED, "Access denied. Invalid token.")
    } else if err
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
    {
        (StatusCode::BAD_REQUEST, "Request body must be valid JSON.")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found.")
    } else {
        log::error!("unhandled rejection: {err:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
    };

    Ok(warp::reply::with_status(message, status))
}
