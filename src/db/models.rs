use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CredentialRecord {
    pub username: String,
    pub password_hash: Vec<u8>,
    pub password_salt: Vec<u8>,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    pub token: String,
    pub username: String,
    pub logged_in: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub protein: f64,
    pub ingredients: String,
    pub instructions: String,
    pub image: Option<String>,
    pub username: String, // Owner
    pub created_at: i64,
}

/// Validated recipe fields, ready to be stored under an owner
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub protein: f64,
    pub ingredients: String,
    pub instructions: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub recipe_id: i64,
    pub username: String,
    pub text: String,
    pub likes: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SectionLike {
    pub recipe_id: i64,
    pub count: i64,
}
