use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{repo_types::Person, services::EmbeddedImage};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct CreatePersonRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub photo_data: Option<String>, // data URL or bare base64
}

#[derive(Debug, Deserialize)]
pub struct DeletePersonRequest {
    pub id: i64,
}

/// Validated create command; the photo is already decoded.
#[derive(Debug)]
pub struct NewPerson {
    pub full_name: String,
    pub photo: Option<EmbeddedImage>,
}

impl CreatePersonRequest {
    pub fn validate(self) -> Result<NewPerson, ApiError> {
        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(ApiError::validation("full_name is required"));
        }
        let photo = self
            .photo_data
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(EmbeddedImage::parse)
            .transpose()?;
        Ok(NewPerson { full_name, photo })
    }
}

#[derive(Debug, Serialize)]
pub struct PersonView {
    pub id: i64,
    pub full_name: String,
    pub photo_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Person> for PersonView {
    fn from(p: Person) -> Self {
        Self {
            id: p.id,
            full_name: p.full_name,
            photo_url: p.photo_url,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PeopleResponse {
    pub people: Vec<PersonView>,
}

#[derive(Debug, Serialize)]
pub struct PersonResponse {
    pub person: PersonView,
}
