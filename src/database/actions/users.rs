use sqlx::{Pool, Postgres, QueryBuilder};

use crate::database::actions::{execute_query, fetch_single_row};
use crate::database::error::QueryError;
use crate::database::schema::{NewUser, User, UserId, UserPatch, UserSession};

/// Inserts a user row. Username and email uniqueness is enforced by the
/// store; violations surface as `QueryError::Conflict` naming the
/// constraint.
pub async fn create_user(user: &NewUser, pool: &Pool<Postgres>) -> Result<UserSession, QueryError> {
    fetch_single_row(
        sqlx::query_as(
            "
            INSERT INTO users (first_name, last_name, username, email, password_hash, token)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, token
        ",
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.token)
        .fetch_optional(pool),
    )
    .await
}

pub async fn get_user_by_username(
    username: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, QueryError> {
    sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)
}

pub async fn get_user_by_id(
    user_id: UserId,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, QueryError> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)
}

pub async fn get_user_by_token(
    token: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, QueryError> {
    sqlx::query_as("SELECT * FROM users WHERE token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)
}

/// Stores a freshly generated token on the user row, replacing whatever was
/// there. The previous token stops authenticating immediately.
pub async fn rotate_user_token(
    user_id: UserId,
    token: &str,
    pool: &Pool<Postgres>,
) -> Result<UserSession, QueryError> {
    fetch_single_row(
        sqlx::query_as("UPDATE users SET token = $2 WHERE id = $1 RETURNING id, username, token")
            .bind(user_id)
            .bind(token)
            .fetch_optional(pool),
    )
    .await
}

pub async fn clear_user_token(user_id: UserId, pool: &Pool<Postgres>) -> Result<(), QueryError> {
    let affected = execute_query(
        sqlx::query("UPDATE users SET token = NULL WHERE id = $1")
            .bind(user_id)
            .execute(pool),
    )
    .await?;

    if affected == 0 {
        return Err(QueryError::NotFound);
    }
    Ok(())
}

/// Partial profile update; only the supplied columns change. Uniqueness
/// violations map to `Conflict` exactly like signup.
pub async fn update_user(
    user_id: UserId,
    patch: &UserPatch,
    pool: &Pool<Postgres>,
) -> Result<User, QueryError> {
    if patch.is_empty() {
        return Err(QueryError::new(
            "You must include data to update in the request body.".to_owned(),
        ));
    }

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
    let mut columns = query_builder.separated(", ");

    if let Some(first_name) = &patch.first_name {
        columns
            .push("first_name = ")
            .push_bind_unseparated(first_name.clone());
    }
    if let Some(last_name) = &patch.last_name {
        columns
            .push("last_name = ")
            .push_bind_unseparated(last_name.clone());
    }
    if let Some(username) = &patch.username {
        columns
            .push("username = ")
            .push_bind_unseparated(username.clone());
    }
    if let Some(email) = &patch.email {
        columns.push("email = ").push_bind_unseparated(email.clone());
    }

    query_builder
        .push(" WHERE id = ")
        .push_bind(user_id)
        .push(" RETURNING *");

    fetch_single_row(query_builder.build_query_as::<User>().fetch_optional(pool)).await
}

/// Removes the user row; reports whether anything was deleted.
pub async fn delete_user(user_id: UserId, pool: &Pool<Postgres>) -> Result<u64, QueryError> {
    execute_query(
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(pool),
    )
    .await
}
