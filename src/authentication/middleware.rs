use std::convert::Infallible;

use sqlx::{Pool, Postgres};
use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::database::actions::users;
use crate::database::schema::User;

#[derive(Debug)]
pub struct MissingToken;

impl reject::Reject for MissingToken {}

#[derive(Debug)]
pub struct InvalidToken;

impl reject::Reject for InvalidToken {}

pub fn with_pool(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (Pool<Postgres>,), Error = Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

/// Resolves the `token` header to the signed-in user. Requests without a
/// token, or with one no user currently holds, are rejected.
pub fn with_user(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (User,), Error = Rejection> + Clone {
    warp::header::optional::<String>("token")
        .and(with_pool(pool))
        .and_then(|token: Option<String>, pool: Pool<Postgres>| async move {
            let token = token.ok_or_else(|| reject::custom(MissingToken))?;

            match users::get_user_by_token(&token, &pool).await {
                Ok(Some(user)) => Ok(user),
                _ => Err(reject::custom(InvalidToken)),
            }
        })
}
