//! Browser-storage layout of the stores.
//!
//! A snapshot is a flat map from storage key to a JSON-encoded string, the
//! same shape a browser profile keeps under `localStorage`. Export produces
//! one; import folds one into the database. A missing or malformed value
//! reads as an empty collection.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use crate::api::validation::{parse_image, parse_protein, ProteinInput};
use crate::db::{now_millis, Comment, EngagementRepository, Recipe, RecipeRepository};
use crate::error::AppError;

pub const USER_KEY: &str = "user";
pub const LOGGED_IN_KEY: &str = "loggedIn";
pub const USERNAME_KEY: &str = "username";
pub const ALL_RECIPES_KEY: &str = "all_recipes";
pub const COMMENTS_KEY: &str = "recipe_comments";
pub const SECTION_LIKES_KEY: &str = "recipe_section_likes";

/// Ceiling for any like counter read from a dump
pub const MAX_IMPORTED_LIKES: i64 = 1_000_000;

pub type Snapshot = BTreeMap<String, String>;

pub fn user_recipes_key(username: &str) -> String {
    format!("recipes_{}", username)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecipe {
    pub id: i64,
    pub title: String,
    pub protein: f64,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub image: String,
    pub username: String,
}

impl From<&Recipe> for StoredRecipe {
    fn from(recipe: &Recipe) -> Self {
        StoredRecipe {
            id: recipe.id,
            title: recipe.title.clone(),
            protein: recipe.protein,
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
            image: recipe.image.clone().unwrap_or_default(),
            username: recipe.username.clone(),
        }
    }
}

/// Browser ids are `Date.now()` values, so a real one is positive and
/// not in the future.
impl TryFrom<StoredRecipe> for Recipe {
    type Error = AppError;

    fn try_from(stored: StoredRecipe) -> Result<Self, Self::Error> {
        if stored.id <= 0 || stored.id > now_millis() {
            return Err(AppError::Validation(format!(
                "Recipe id {} is not a creation timestamp",
                stored.id
            )));
        }

        let title = stored.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }

        Ok(Recipe {
            id: stored.id,
            title: title.to_string(),
            protein: parse_protein(Some(ProteinInput::Number(stored.protein)))?,
            ingredients: stored.ingredients,
            instructions: stored.instructions,
            image: parse_image(Some(stored.image))?,
            username: stored.username,
            created_at: stored.id / 1000,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredComment {
    pub recipe_id: i64,
    pub username: String,
    pub text: String,
    #[serde(default)]
    pub likes: i64,
}

impl From<&Comment> for StoredComment {
    fn from(comment: &Comment) -> Self {
        StoredComment {
            recipe_id: comment.recipe_id,
            username: comment.username.clone(),
            text: comment.text.clone(),
            likes: comment.likes,
        }
    }
}

pub fn encode_collection<T: Serialize + ?Sized>(items: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string(items)?)
}

/// Decode one stored value. Absent or corrupt data degrades to the empty
/// collection.
pub fn decode_collection<T>(key: &str, raw: Option<&str>) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = raw else {
        return T::default();
    };

    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "malformed stored collection, treating as empty");
            T::default()
        }
    }
}

/// What an import would write for `username`, before touching the database
#[derive(Debug, Default, PartialEq)]
pub struct ImportPlan {
    pub recipes: Vec<Recipe>,
    pub recipes_rejected: usize,
    pub comments: Vec<StoredComment>,
    pub section_likes: BTreeMap<i64, i64>,
}

pub fn plan_import(snapshot: &Snapshot, username: &str) -> ImportPlan {
    let get = |key: &str| snapshot.get(key).map(String::as_str);

    let global: Vec<StoredRecipe> = decode_collection(ALL_RECIPES_KEY, get(ALL_RECIPES_KEY));
    let own_key = user_recipes_key(username);
    let own: Vec<StoredRecipe> = decode_collection(&own_key, get(&own_key));

    // The two lists mirror each other; take their union once per id
    let mut seen = BTreeSet::new();
    let mut recipes = Vec::new();
    let mut recipes_rejected = 0;
    for stored in global.into_iter().chain(own) {
        if stored.username != username || !seen.insert(stored.id) {
            continue;
        }
        match Recipe::try_from(stored) {
            Ok(recipe) => recipes.push(recipe),
            Err(e) => {
                tracing::warn!(username, error = %e, "skipping invalid stored recipe");
                recipes_rejected += 1;
            }
        }
    }

    let comments: Vec<StoredComment> = decode_collection(COMMENTS_KEY, get(COMMENTS_KEY));
    let comments = comments
        .into_iter()
        .filter(|c| c.username == username && !c.text.trim().is_empty())
        .map(|c| StoredComment {
            text: c.text.trim().to_string(),
            likes: c.likes.clamp(0, MAX_IMPORTED_LIKES),
            ..c
        })
        .collect();

    let section_likes: BTreeMap<i64, i64> =
        decode_collection(SECTION_LIKES_KEY, get(SECTION_LIKES_KEY));
    let section_likes = section_likes
        .into_iter()
        .map(|(recipe_id, count)| (recipe_id, count.clamp(0, MAX_IMPORTED_LIKES)))
        .collect();

    ImportPlan {
        recipes,
        recipes_rejected,
        comments,
        section_likes,
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub recipes_imported: usize,
    pub recipes_skipped: usize,
    pub recipes_rejected: usize,
    pub comments_imported: usize,
    pub comments_skipped: usize,
    pub section_likes_merged: usize,
    pub section_likes_ignored: usize,
}

/// Fold a browser dump into the stores on behalf of `username`
pub async fn import(
    pool: &Pool<Sqlite>,
    snapshot: &Snapshot,
    username: &str,
) -> Result<ImportReport, AppError> {
    let plan = plan_import(snapshot, username);
    let mut report = ImportReport {
        recipes_rejected: plan.recipes_rejected,
        ..ImportReport::default()
    };

    for recipe in &plan.recipes {
        if RecipeRepository::insert_existing(pool, recipe).await? {
            report.recipes_imported += 1;
        } else {
            report.recipes_skipped += 1;
        }
    }

    // A comment repeated n times in the dump exists n times after import,
    // however often the same dump is replayed.
    let mut already: HashMap<(i64, &str), i64> = HashMap::new();
    let mut wanted: HashMap<(i64, &str), i64> = HashMap::new();
    for comment in &plan.comments {
        let key = (comment.recipe_id, comment.text.as_str());
        if !already.contains_key(&key) {
            let existing = EngagementRepository::count_matching(
                pool,
                comment.recipe_id,
                username,
                &comment.text,
            )
            .await?;
            already.insert(key, existing);
        }

        let nth = wanted.entry(key).or_insert(0);
        *nth += 1;
        if *nth <= already[&key] {
            report.comments_skipped += 1;
            continue;
        }

        EngagementRepository::insert_comment(
            pool,
            comment.recipe_id,
            username,
            &comment.text,
            comment.likes,
        )
        .await?;
        report.comments_imported += 1;
    }

    // Counters only land on recipes the importer owns
    let owned: HashSet<i64> = RecipeRepository::list_for_user(pool, username)
        .await?
        .iter()
        .map(|r| r.id)
        .collect();
    for (recipe_id, count) in &plan.section_likes {
        if !owned.contains(recipe_id) {
            report.section_likes_ignored += 1;
            continue;
        }
        EngagementRepository::merge_section_likes(pool, *recipe_id, *count).await?;
        report.section_likes_merged += 1;
    }

    tracing::info!(
        username,
        recipes = report.recipes_imported,
        skipped = report.recipes_skipped,
        rejected = report.recipes_rejected,
        comments = report.comments_imported,
        "browser storage imported"
    );
    Ok(report)
}

/// Render the stores in browser layout, as seen by a logged-in `username`
pub async fn export(pool: &Pool<Sqlite>, username: &str) -> Result<Snapshot, AppError> {
    let all: Vec<StoredRecipe> = RecipeRepository::list_all(pool)
        .await?
        .iter()
        .map(StoredRecipe::from)
        .collect();
    let own: Vec<StoredRecipe> = all.iter().filter(|r| r.username == username).cloned().collect();
    let comments: Vec<StoredComment> = EngagementRepository::all_comments(pool)
        .await?
        .iter()
        .map(StoredComment::from)
        .collect();
    let section_likes = EngagementRepository::all_section_likes(pool).await?;

    let mut snapshot = Snapshot::new();
    snapshot.insert(
        USER_KEY.to_string(),
        encode_collection(&StoredUser {
            username: username.to_string(),
        })?,
    );
    snapshot.insert(LOGGED_IN_KEY.to_string(), "true".to_string());
    snapshot.insert(USERNAME_KEY.to_string(), username.to_string());
    snapshot.insert(user_recipes_key(username), encode_collection(&own)?);
    snapshot.insert(ALL_RECIPES_KEY.to_string(), encode_collection(&all)?);
    snapshot.insert(COMMENTS_KEY.to_string(), encode_collection(&comments)?);
    snapshot.insert(SECTION_LIKES_KEY.to_string(), encode_collection(&section_likes)?);

    Ok(snapshot)
}
