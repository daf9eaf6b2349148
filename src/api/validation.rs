use serde::Deserialize;

use crate::db::NewRecipe;
use crate::error::AppError;

/// Protein arrives from form fields as text or from scripts as a number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProteinInput {
    Number(f64),
    Text(String),
}

/// Raw recipe form as posted from the dashboard
#[derive(Debug, Default, Deserialize)]
pub struct RecipeForm {
    #[serde(default)]
    pub title: String,
    pub protein: Option<ProteinInput>,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub instructions: String,
    pub image: Option<String>,
}

impl TryFrom<RecipeForm> for NewRecipe {
    type Error = AppError;

    fn try_from(form: RecipeForm) -> Result<Self, Self::Error> {
        let title = form.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }

        Ok(NewRecipe {
            title: title.to_string(),
            protein: parse_protein(form.protein)?,
            ingredients: form.ingredients,
            instructions: form.instructions,
            image: parse_image(form.image)?,
        })
    }
}

pub fn parse_protein(input: Option<ProteinInput>) -> Result<f64, AppError> {
    let value = match input {
        None => return Err(AppError::Validation("Protein is required".to_string())),
        Some(ProteinInput::Number(n)) => n,
        Some(ProteinInput::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(AppError::Validation("Protein is required".to_string()));
            }
            text.parse::<f64>()
                .map_err(|_| AppError::Validation("Protein must be a number".to_string()))?
        }
    };

    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(
            "Protein must be a non-negative number".to_string(),
        ));
    }
    Ok(value)
}

/// Accept an inline `data:<mime>;base64,<payload>` image. Empty means none.
pub fn parse_image(input: Option<String>) -> Result<Option<String>, AppError> {
    let Some(image) = input.filter(|i| !i.trim().is_empty()) else {
        return Ok(None);
    };

    let rest = image
        .strip_prefix("data:")
        .ok_or_else(|| AppError::Validation("Image must be a data URL".to_string()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| AppError::Validation("Image must be base64 encoded".to_string()))?;

    if !mime.starts_with("image/") {
        return Err(AppError::Validation(format!("Unsupported image type: {}", mime)));
    }

    base64_simd::STANDARD
        .decode_to_vec(payload)
        .map_err(|e| AppError::Validation(format!("Invalid image data: {}", e)))?;

    Ok(Some(image))
}

/// Both login fields must be non-empty; usernames are compared trimmed
pub fn credentials_present(username: &str, password: &str) -> Option<(String, String)> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return None;
    }
    Some((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protein_accepts_numbers_and_numeric_text() {
        assert_eq!(parse_protein(Some(ProteinInput::Number(20.0))).unwrap(), 20.0);
        assert_eq!(
            parse_protein(Some(ProteinInput::Text(" 12.5 ".to_string()))).unwrap(),
            12.5
        );
        assert_eq!(parse_protein(Some(ProteinInput::Text("0".to_string()))).unwrap(), 0.0);
    }

    #[test]
    fn test_protein_rejects_missing_garbage_and_negative() {
        assert!(parse_protein(None).is_err());
        assert!(parse_protein(Some(ProteinInput::Text("".to_string()))).is_err());
        assert!(parse_protein(Some(ProteinInput::Text("lots".to_string()))).is_err());
        assert!(parse_protein(Some(ProteinInput::Number(-1.0))).is_err());
        assert!(parse_protein(Some(ProteinInput::Text("NaN".to_string()))).is_err());
    }

    #[test]
    fn test_image_data_url() {
        assert_eq!(parse_image(None).unwrap(), None);
        assert_eq!(parse_image(Some(String::new())).unwrap(), None);

        let png = "data:image/png;base64,iVBORw0KGgo=".to_string();
        assert_eq!(parse_image(Some(png.clone())).unwrap(), Some(png));

        assert!(parse_image(Some("http://example.com/a.png".to_string())).is_err());
        assert!(parse_image(Some("data:image/png,raw".to_string())).is_err());
        assert!(parse_image(Some("data:text/plain;base64,aGk=".to_string())).is_err());
        assert!(parse_image(Some("data:image/png;base64,!!!".to_string())).is_err());
    }

    #[test]
    fn test_recipe_form_requires_title_and_protein() {
        let form = RecipeForm {
            title: "  ".to_string(),
            protein: Some(ProteinInput::Number(10.0)),
            ..Default::default()
        };
        assert!(NewRecipe::try_from(form).is_err());

        let form = RecipeForm {
            title: "Eggs".to_string(),
            ..Default::default()
        };
        assert!(NewRecipe::try_from(form).is_err());

        let form = RecipeForm {
            title: "Eggs".to_string(),
            protein: Some(ProteinInput::Text("20".to_string())),
            ingredients: "eggs".to_string(),
            ..Default::default()
        };
        let recipe = NewRecipe::try_from(form).unwrap();
        assert_eq!(recipe.title, "Eggs");
        assert_eq!(recipe.protein, 20.0);
        assert_eq!(recipe.image, None);
    }

    #[test]
    fn test_credentials_present() {
        assert!(credentials_present("", "pw").is_none());
        assert!(credentials_present("   ", "pw").is_none());
        assert!(credentials_present("alice", "").is_none());
        assert_eq!(
            credentials_present(" alice ", "pw1"),
            Some(("alice".to_string(), "pw1".to_string()))
        );
    }
}
