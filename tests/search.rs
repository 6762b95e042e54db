mod common;

use sqlx::PgPool;

use recipe_box::actions::recipes;
use recipe_box::actions::search::{search_recipes_for_matches, MatchMode, SearchParams};
use recipe_box::schema::{IngredientEntry, RecipeId};

use common::{ingredient, new_recipe, setup_schema};

async fn seed_tagged(pool: &PgPool, title: &str, tags: &[&str]) -> RecipeId {
    let mut payload = new_recipe(title);
    payload.tags = Some(tags.iter().map(|t| t.to_string()).collect());
    recipes::add_recipe(&payload, pool).await.unwrap()
}

fn ids(matches: Vec<recipe_box::actions::search::SearchMatch>) -> Vec<RecipeId> {
    let mut ids: Vec<RecipeId> = matches.into_iter().map(|m| m.recipe_id).collect();
    ids.sort();
    ids
}

#[sqlx::test]
async fn match_all_intersects_and_match_any_unions(pool: PgPool) {
    setup_schema(&pool).await;

    let r1 = seed_tagged(&pool, "Lentil Stew", &["vegan"]).await;
    let r2 = seed_tagged(&pool, "Weeknight Stir-fry", &["quick"]).await;

    let params = SearchParams {
        tags: Some(String::from("vegan,quick")),
        ..SearchParams::default()
    };

    let all = search_recipes_for_matches(&params, MatchMode::All, &pool)
        .await
        .unwrap();
    assert!(all.is_empty());

    let any = search_recipes_for_matches(&params, MatchMode::Any, &pool)
        .await
        .unwrap();
    assert_eq!(ids(any), vec![r1, r2]);
}

#[sqlx::test]
async fn match_all_finds_a_recipe_carrying_every_term(pool: PgPool) {
    setup_schema(&pool).await;

    let both = seed_tagged(&pool, "Green Curry", &["vegan", "quick"]).await;
    seed_tagged(&pool, "Slow Roast", &["quick"]).await;

    let params = SearchParams {
        tags: Some(String::from("vegan,quick")),
        ..SearchParams::default()
    };

    let matches = search_recipes_for_matches(&params, MatchMode::All, &pool)
        .await
        .unwrap();
    assert_eq!(ids(matches), vec![both]);
}

#[sqlx::test]
async fn title_search_is_case_insensitive_substring(pool: PgPool) {
    setup_schema(&pool).await;

    let id = recipes::add_recipe(&new_recipe("Spicy Chili"), &pool).await.unwrap();
    recipes::add_recipe(&new_recipe("Plain Rice"), &pool).await.unwrap();

    let params = SearchParams {
        title: Some(String::from("CHILI")),
        ..SearchParams::default()
    };

    let matches = search_recipes_for_matches(&params, MatchMode::Any, &pool)
        .await
        .unwrap();
    assert_eq!(ids(matches), vec![id]);
}

#[sqlx::test]
async fn parameters_intersect_across_categories_under_match_all(pool: PgPool) {
    setup_schema(&pool).await;

    let mut vegetarian_chili = new_recipe("Vegetarian Chili");
    vegetarian_chili.vegetarian = true;
    let expected = recipes::add_recipe(&vegetarian_chili, &pool).await.unwrap();

    recipes::add_recipe(&new_recipe("Texas Chili"), &pool).await.unwrap();

    let params = SearchParams {
        title: Some(String::from("chili")),
        vegetarian: Some(true),
        ..SearchParams::default()
    };

    let matches = search_recipes_for_matches(&params, MatchMode::All, &pool)
        .await
        .unwrap();
    assert_eq!(ids(matches), vec![expected]);
}

#[sqlx::test]
async fn category_matches_exactly(pool: PgPool) {
    setup_schema(&pool).await;

    let mut dessert = new_recipe("Flan");
    dessert.category = String::from("dessert");
    let id = recipes::add_recipe(&dessert, &pool).await.unwrap();

    recipes::add_recipe(&new_recipe("Bisque"), &pool).await.unwrap();

    let params = SearchParams {
        category: Some(String::from("dessert")),
        ..SearchParams::default()
    };
    let matches = search_recipes_for_matches(&params, MatchMode::Any, &pool)
        .await
        .unwrap();
    assert_eq!(ids(matches), vec![id]);

    // Substrings of a category value do not match.
    let partial = SearchParams {
        category: Some(String::from("dess")),
        ..SearchParams::default()
    };
    let matches = search_recipes_for_matches(&partial, MatchMode::Any, &pool)
        .await
        .unwrap();
    assert!(matches.is_empty());
}

#[sqlx::test]
async fn ingredient_search_covers_the_companion_footnote(pool: PgPool) {
    setup_schema(&pool).await;

    let mut payload = new_recipe("Browned Butter Cookies");
    payload.ingredients = vec![IngredientEntry {
        ingredient: String::from("1 stick butter"),
        footnote: Some(String::from("browned slowly")),
    }];
    let id = recipes::add_recipe(&payload, &pool).await.unwrap();

    let params = SearchParams {
        ingredients: Some(String::from("slowly")),
        ..SearchParams::default()
    };
    let matches = search_recipes_for_matches(&params, MatchMode::Any, &pool)
        .await
        .unwrap();
    assert_eq!(ids(matches), vec![id]);
}

#[sqlx::test]
async fn wildcard_terms_search_every_table(pool: PgPool) {
    setup_schema(&pool).await;

    let mut by_step = new_recipe("Seared Scallops");
    by_step.steps = vec![String::from("Sear in brown butter.")];
    let step_match = recipes::add_recipe(&by_step, &pool).await.unwrap();

    let title_match = recipes::add_recipe(&new_recipe("Butter Chicken"), &pool)
        .await
        .unwrap();

    let by_tag = seed_tagged(&pool, "Morning Rolls", &["butter"]).await;

    recipes::add_recipe(&new_recipe("Fruit Salad"), &pool).await.unwrap();

    let params = SearchParams {
        wildcard: Some(String::from("butter")),
        ..SearchParams::default()
    };
    let matches = search_recipes_for_matches(&params, MatchMode::Any, &pool)
        .await
        .unwrap();

    let mut expected = vec![step_match, title_match, by_tag];
    expected.sort();
    assert_eq!(ids(matches), expected);
}

#[sqlx::test]
async fn wildcard_terms_combine_with_the_top_level_mode(pool: PgPool) {
    setup_schema(&pool).await;

    let mut payload = new_recipe("Lemon Mint Cooler");
    payload.ingredients = vec![ingredient("1 lemon"), ingredient("mint sprigs")];
    let both = recipes::add_recipe(&payload, &pool).await.unwrap();

    let mut lemon_only = new_recipe("Lemon Bars");
    lemon_only.ingredients = vec![ingredient("2 lemons")];
    recipes::add_recipe(&lemon_only, &pool).await.unwrap();

    let params = SearchParams {
        wildcard: Some(String::from("lemon,mint")),
        ..SearchParams::default()
    };

    let matches = search_recipes_for_matches(&params, MatchMode::All, &pool)
        .await
        .unwrap();
    assert_eq!(ids(matches), vec![both]);
}

#[sqlx::test]
async fn limit_caps_the_combined_result(pool: PgPool) {
    setup_schema(&pool).await;

    for title in ["Soup One", "Soup Two", "Soup Three"] {
        recipes::add_recipe(&new_recipe(title), &pool).await.unwrap();
    }

    let params = SearchParams {
        title: Some(String::from("soup")),
        limit: Some(2),
        ..SearchParams::default()
    };
    let matches = search_recipes_for_matches(&params, MatchMode::Any, &pool)
        .await
        .unwrap();
    assert_eq!(matches.len(), 2);
}

#[sqlx::test]
async fn duplicate_matches_collapse_to_one_id(pool: PgPool) {
    setup_schema(&pool).await;

    // Matches by title and by tag; the union must still yield one row.
    let mut payload = new_recipe("Butter Tart");
    payload.tags = Some(vec![String::from("butter")]);
    let id = recipes::add_recipe(&payload, &pool).await.unwrap();

    let params = SearchParams {
        title: Some(String::from("butter")),
        tags: Some(String::from("butter")),
        ..SearchParams::default()
    };
    let matches = search_recipes_for_matches(&params, MatchMode::Any, &pool)
        .await
        .unwrap();
    assert_eq!(ids(matches), vec![id]);
}

#[sqlx::test]
async fn search_results_hydrate_into_title_ordered_summaries(pool: PgPool) {
    setup_schema(&pool).await;

    let b = recipes::add_recipe(&new_recipe("Beet Soup"), &pool).await.unwrap();
    let a = recipes::add_recipe(&new_recipe("Asparagus Soup"), &pool).await.unwrap();

    let params = SearchParams {
        title: Some(String::from("soup")),
        ..SearchParams::default()
    };
    let matches = search_recipes_for_matches(&params, MatchMode::Any, &pool)
        .await
        .unwrap();
    assert_eq!(ids(matches.clone()), vec![b.min(a), b.max(a)]);

    let found: Vec<RecipeId> = matches.into_iter().map(|m| m.recipe_id).collect();
    let summaries = recipes::get_recipes_by_ids(&found, &pool).await.unwrap();
    assert_eq!(summaries[0].title, "Asparagus Soup");
    assert_eq!(summaries[1].title, "Beet Soup");
}
