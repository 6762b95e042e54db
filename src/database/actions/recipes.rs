use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::database::actions::{
    begin_transaction, commit_transaction, fetch_rows, fetch_single_row,
};
use crate::database::error::{ChildCollection, QueryError, WriteError};
use crate::database::schema::{
    FullRecipe, IngredientEntry, NewRecipe, Recipe, RecipeId, RecipePatch, RecipeSummary,
};

const SUMMARY_SELECT: &str = "SELECT r.*, COALESCE(array_agg(t.tag ORDER BY t.tag) \
     FILTER (WHERE t.tag IS NOT NULL), ARRAY[]::text[]) AS tags \
     FROM recipes r LEFT JOIN tags t ON t.recipe_id = r.id";

/// Creates one recipe and all of its child rows as a single transaction.
/// Any failure rolls the whole write back; collection failures name the
/// table that broke the write.
pub async fn add_recipe(
    payload: &NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<RecipeId, WriteError> {
    let mut tr = begin_transaction(pool).await.map_err(WriteError::Transaction)?;

    let row: Option<(RecipeId,)> = sqlx::query_as(
        "
        INSERT INTO recipes (title, source, source_url, submitted_by, servings, category, vegetarian, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        RETURNING id
    ",
    )
    .bind(&payload.title)
    .bind(&payload.source)
    .bind(&payload.source_url)
    .bind(&payload.submitted_by)
    .bind(&payload.servings)
    .bind(&payload.category)
    .bind(payload.vegetarian)
    .fetch_optional(&mut *tr)
    .await
    .map_err(|e| WriteError::Header(QueryError::from(e)))?;

    let recipe_id = match row {
        Some((id,)) => id,
        None => return Err(WriteError::NoIdReturned),
    };

    insert_ingredients(&mut tr, recipe_id, &payload.ingredients)
        .await
        .map_err(|source| WriteError::Collection {
            collection: ChildCollection::Ingredients,
            source,
        })?;

    insert_steps(&mut tr, recipe_id, &payload.steps)
        .await
        .map_err(|source| WriteError::Collection {
            collection: ChildCollection::Steps,
            source,
        })?;

    if let Some(tags) = &payload.tags {
        insert_tags(&mut tr, recipe_id, tags)
            .await
            .map_err(|source| WriteError::Collection {
                collection: ChildCollection::Tags,
                source,
            })?;
    }

    if let Some(footnotes) = &payload.footnotes {
        insert_footnotes(&mut tr, recipe_id, footnotes)
            .await
            .map_err(|source| WriteError::Collection {
                collection: ChildCollection::Footnotes,
                source,
            })?;
    }

    commit_transaction(tr).await.map_err(WriteError::Transaction)?;

    Ok(recipe_id)
}

/// Edits the recipe header (only the supplied columns) and replaces each
/// supplied child collection wholesale, all inside one transaction. An empty
/// patch is rejected before a transaction is opened.
pub async fn edit_recipe(
    recipe_id: RecipeId,
    patch: &RecipePatch,
    pool: &Pool<Postgres>,
) -> Result<RecipeId, WriteError> {
    if patch.is_empty() {
        return Err(WriteError::EmptyPayload);
    }

    let mut tr = begin_transaction(pool).await.map_err(WriteError::Transaction)?;

    if patch.has_header_fields() {
        let result = header_update_query(recipe_id, patch)
            .build()
            .execute(&mut *tr)
            .await
            .map_err(|e| WriteError::HeaderUpdate(QueryError::from(e)))?;

        if result.rows_affected() == 0 {
            return Err(WriteError::NotFound);
        }
    }

    if let Some(ingredients) = &patch.ingredients {
        delete_children(&mut tr, recipe_id, ChildCollection::Ingredients).await?;
        insert_ingredients(&mut tr, recipe_id, ingredients)
            .await
            .map_err(|source| WriteError::Collection {
                collection: ChildCollection::Ingredients,
                source,
            })?;
    }

    if let Some(steps) = &patch.steps {
        delete_children(&mut tr, recipe_id, ChildCollection::Steps).await?;
        insert_steps(&mut tr, recipe_id, steps)
            .await
            .map_err(|source| WriteError::Collection {
                collection: ChildCollection::Steps,
                source,
            })?;
    }

    if let Some(tags) = &patch.tags {
        delete_children(&mut tr, recipe_id, ChildCollection::Tags).await?;
        insert_tags(&mut tr, recipe_id, tags)
            .await
            .map_err(|source| WriteError::Collection {
                collection: ChildCollection::Tags,
                source,
            })?;
    }

    if let Some(footnotes) = &patch.footnotes {
        delete_children(&mut tr, recipe_id, ChildCollection::Footnotes).await?;
        insert_footnotes(&mut tr, recipe_id, footnotes)
            .await
            .map_err(|source| WriteError::Collection {
                collection: ChildCollection::Footnotes,
                source,
            })?;
    }

    commit_transaction(tr).await.map_err(WriteError::Transaction)?;

    Ok(recipe_id)
}

/// Builds the partial header UPDATE covering exactly the supplied columns.
/// `created_at` and `is_confirmed` are never part of it.
fn header_update_query(
    recipe_id: RecipeId,
    patch: &RecipePatch,
) -> QueryBuilder<'static, Postgres> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE recipes SET ");
    let mut columns = query_builder.separated(", ");

    if let Some(title) = &patch.title {
        columns.push("title = ").push_bind_unseparated(title.clone());
    }
    if let Some(source) = &patch.source {
        columns.push("source = ").push_bind_unseparated(source.clone());
    }
    if let Some(source_url) = &patch.source_url {
        columns
            .push("source_url = ")
            .push_bind_unseparated(source_url.clone());
    }
    if let Some(submitted_by) = &patch.submitted_by {
        columns
            .push("submitted_by = ")
            .push_bind_unseparated(submitted_by.clone());
    }
    if let Some(servings) = &patch.servings {
        columns
            .push("servings = ")
            .push_bind_unseparated(servings.clone());
    }
    if let Some(category) = &patch.category {
        columns
            .push("category = ")
            .push_bind_unseparated(category.clone());
    }
    if let Some(vegetarian) = patch.vegetarian {
        columns
            .push("vegetarian = ")
            .push_bind_unseparated(vegetarian);
    }
    if let Some(featured) = patch.featured {
        columns.push("featured = ").push_bind_unseparated(featured);
    }

    query_builder.push(" WHERE id = ").push_bind(recipe_id);
    query_builder
}

async fn delete_children(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: RecipeId,
    collection: ChildCollection,
) -> Result<(), WriteError> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1",
        collection.table()
    ))
    .bind(recipe_id)
    .execute(&mut **tr)
    .await
    .map_err(|e| WriteError::Collection {
        collection,
        source: QueryError::from(e),
    })?;

    Ok(())
}

async fn insert_ingredients(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: RecipeId,
    entries: &[IngredientEntry],
) -> Result<(), QueryError> {
    if entries.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO ingredients (recipe_id, ingredient, footnote, recipe_order) ");

    query_builder.push_values(entries.iter().enumerate(), |mut b, (i, entry)| {
        b.push_bind(recipe_id)
            .push_bind(entry.ingredient.clone())
            .push_bind(entry.footnote.clone())
            .push_bind(i as i32);
    });

    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn insert_steps(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: RecipeId,
    steps: &[String],
) -> Result<(), QueryError> {
    if steps.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO steps (recipe_id, step, recipe_order) ");

    query_builder.push_values(steps.iter().enumerate(), |mut b, (i, step)| {
        b.push_bind(recipe_id).push_bind(step.clone()).push_bind(i as i32);
    });

    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Tags are stored lower-cased; duplicates are the caller's responsibility.
async fn insert_tags(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: RecipeId,
    tags: &[String],
) -> Result<(), QueryError> {
    if tags.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO tags (recipe_id, tag) ");

    query_builder.push_values(tags.iter(), |mut b, tag| {
        b.push_bind(recipe_id).push_bind(tag.to_lowercase());
    });

    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn insert_footnotes(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: RecipeId,
    footnotes: &[String],
) -> Result<(), QueryError> {
    if footnotes.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO footnotes (recipe_id, footnote, recipe_order) ");

    query_builder.push_values(footnotes.iter().enumerate(), |mut b, (i, footnote)| {
        b.push_bind(recipe_id)
            .push_bind(footnote.clone())
            .push_bind(i as i32);
    });

    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn get_recipe(
    id: RecipeId,
    pool: &Pool<Postgres>,
) -> Result<Option<Recipe>, QueryError> {
    sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)
}

/// Fetches one recipe and stitches its full representation. A missing header
/// row surfaces as `QueryError::NotFound`; the first failing sub-fetch
/// short-circuits.
pub async fn get_full_recipe(
    id: RecipeId,
    pool: &Pool<Postgres>,
) -> Result<FullRecipe, QueryError> {
    let recipe: Recipe = fetch_single_row(
        sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool),
    )
    .await?;

    let tags = fetch_rows(
        sqlx::query_scalar("SELECT tag FROM tags WHERE recipe_id = $1")
            .bind(id)
            .fetch_all(pool),
    )
    .await?;

    let ingredients: Vec<IngredientEntry> = fetch_rows(
        sqlx::query_as(
            "SELECT ingredient, footnote FROM ingredients WHERE recipe_id = $1 ORDER BY recipe_order",
        )
        .bind(id)
        .fetch_all(pool),
    )
    .await?;

    let steps = fetch_rows(
        sqlx::query_scalar("SELECT step FROM steps WHERE recipe_id = $1 ORDER BY recipe_order")
            .bind(id)
            .fetch_all(pool),
    )
    .await?;

    let footnotes = fetch_rows(
        sqlx::query_scalar(
            "SELECT footnote FROM footnotes WHERE recipe_id = $1 ORDER BY recipe_order",
        )
        .bind(id)
        .fetch_all(pool),
    )
    .await?;

    Ok(FullRecipe {
        recipe,
        tags,
        ingredients,
        steps,
        footnotes,
    })
}

pub async fn get_all_recipes(pool: &Pool<Postgres>) -> Result<Vec<RecipeSummary>, QueryError> {
    fetch_rows(
        sqlx::query_as(&format!("{SUMMARY_SELECT} GROUP BY r.id ORDER BY r.title"))
            .fetch_all(pool),
    )
    .await
}

pub async fn get_all_confirmed_recipes(
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeSummary>, QueryError> {
    fetch_rows(
        sqlx::query_as(&format!(
            "{SUMMARY_SELECT} WHERE r.is_confirmed GROUP BY r.id ORDER BY r.title"
        ))
        .fetch_all(pool),
    )
    .await
}

/// Summary rows (header + aggregated tags) for the given ids, ordered by
/// title. Used to hydrate search matches without re-fetching every child
/// collection.
pub async fn get_recipes_by_ids(
    ids: &[RecipeId],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeSummary>, QueryError> {
    fetch_rows(
        sqlx::query_as(&format!(
            "{SUMMARY_SELECT} WHERE r.id = ANY($1) GROUP BY r.id ORDER BY r.title"
        ))
        .bind(ids.to_vec())
        .fetch_all(pool),
    )
    .await
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<String>, QueryError> {
    fetch_rows(
        sqlx::query_scalar("SELECT DISTINCT tag FROM tags ORDER BY tag").fetch_all(pool),
    )
    .await
}

pub async fn list_submitters(pool: &Pool<Postgres>) -> Result<Vec<String>, QueryError> {
    fetch_rows(
        sqlx::query_scalar("SELECT DISTINCT submitted_by FROM recipes ORDER BY submitted_by")
            .fetch_all(pool),
    )
    .await
}
