use sqlx::PgPool;

use recipe_box::schema::{IngredientEntry, NewRecipe};

const SCHEMA: &[&str] = &[
    "CREATE TABLE recipes (
        id SERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        source TEXT,
        source_url TEXT,
        submitted_by TEXT NOT NULL,
        servings TEXT,
        category TEXT NOT NULL,
        vegetarian BOOLEAN NOT NULL DEFAULT FALSE,
        featured BOOLEAN NOT NULL DEFAULT FALSE,
        is_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE ingredients (
        id SERIAL PRIMARY KEY,
        recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        ingredient TEXT NOT NULL CHECK (ingredient <> ''),
        footnote TEXT,
        recipe_order INTEGER NOT NULL
    )",
    "CREATE TABLE steps (
        id SERIAL PRIMARY KEY,
        recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        step TEXT NOT NULL CHECK (step <> ''),
        recipe_order INTEGER NOT NULL
    )",
    "CREATE TABLE tags (
        id SERIAL PRIMARY KEY,
        recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        tag TEXT NOT NULL CHECK (tag <> '')
    )",
    "CREATE TABLE footnotes (
        id SERIAL PRIMARY KEY,
        recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        footnote TEXT NOT NULL CHECK (footnote <> ''),
        recipe_order INTEGER NOT NULL
    )",
    "CREATE TABLE users (
        id SERIAL PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        token TEXT,
        CONSTRAINT users_username_key UNIQUE (username),
        CONSTRAINT users_email_key UNIQUE (email)
    )",
];

pub async fn setup_schema(pool: &PgPool) {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .expect("failed to create test schema");
    }
}

pub fn ingredient(text: &str) -> IngredientEntry {
    IngredientEntry {
        ingredient: text.to_string(),
        footnote: None,
    }
}

/// A minimal valid creation payload; tests override the fields they examine.
pub fn new_recipe(title: &str) -> NewRecipe {
    NewRecipe {
        title: title.to_string(),
        source: None,
        source_url: None,
        submitted_by: String::from("test kitchen"),
        servings: None,
        category: String::from("main"),
        vegetarian: false,
        ingredients: vec![ingredient("1 cup water")],
        steps: vec![String::from("Boil the water.")],
        tags: None,
        footnotes: None,
    }
}
