use anyhow::Context;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{dto::NewPerson, repo, repo_types::Person};
use crate::{error::ApiError, state::AppState, storage::StorageClient};

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Decoded `photo_data` payload.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub body: Bytes,
    pub content_type: &'static str,
    pub ext: &'static str,
}

/// Where an uploaded photo ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPhoto {
    pub key: String,
    pub url: String,
}

lazy_static! {
    static ref DATA_URL_RE: Regex =
        Regex::new(r"(?s)^data:(?P<mime>[\w.+-]+/[\w.+-]+)?(?:;[^,]*)?,(?P<payload>.*)$").unwrap();
}

impl EmbeddedImage {
    /// Accepts `data:<mime>;base64,<payload>` or a bare base64 payload.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let raw = raw.trim();
        let (mime, payload) = match DATA_URL_RE.captures(raw) {
            Some(caps) => (
                caps.name("mime").map(|m| m.as_str().to_ascii_lowercase()),
                caps.name("payload").map_or("", |p| p.as_str()),
            ),
            // `base64,<payload>` and similar prefixes without `data:`
            None => (None, raw.rsplit(',').next().unwrap_or(raw)),
        };

        let (content_type, ext) = mime
            .as_deref()
            .and_then(ext_from_mime)
            .unwrap_or((DEFAULT_CONTENT_TYPE, "jpg"));

        let cleaned: String = payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = Base64::decode_vec(&cleaned)
            .map_err(|_| ApiError::validation("photo_data is not valid base64"))?;
        if bytes.is_empty() {
            return Err(ApiError::validation("photo_data is empty"));
        }

        Ok(Self {
            body: Bytes::from(bytes),
            content_type,
            ext,
        })
    }
}

fn ext_from_mime(ct: &str) -> Option<(&'static str, &'static str)> {
    match ct {
        "image/jpeg" | "image/jpg" => Some(("image/jpeg", "jpg")),
        "image/png" => Some(("image/png", "png")),
        "image/webp" => Some(("image/webp", "webp")),
        "image/heic" => Some(("image/heic", "heic")),
        _ => None,
    }
}

/// Same owner and name always map to the same key; a re-upload overwrites.
pub fn photo_key(user_id: i64, full_name: &str, ext: &str) -> String {
    let slug: String = full_name
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '_' } else { c })
        .collect();
    format!("people/{}_{}.{}", user_id, slug, ext)
}

pub async fn upload_photo(
    storage: &dyn StorageClient,
    user_id: i64,
    full_name: &str,
    image: EmbeddedImage,
) -> anyhow::Result<StoredPhoto> {
    let key = photo_key(user_id, full_name, image.ext);
    storage
        .put_object(&key, image.body, image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    let url = storage.public_url(&key);
    Ok(StoredPhoto { key, url })
}

pub async fn create_person(
    st: &AppState,
    user_id: i64,
    new: NewPerson,
) -> Result<Person, ApiError> {
    let photo = match new.photo {
        Some(image) => Some(
            upload_photo(st.storage.as_ref(), user_id, &new.full_name, image)
                .await
                .map_err(ApiError::Storage)?,
        ),
        None => None,
    };

    let person = match repo::insert_person(&st.db, user_id, &new.full_name, photo.as_ref()).await {
        Ok(p) => p,
        Err(e) => {
            if let Some(p) = &photo {
                warn!(key = %p.key, "person insert failed after photo upload; object left in place");
            }
            return Err(e.into());
        }
    };

    info!(user_id, person_id = person.id, has_photo = photo.is_some(), "person created");
    Ok(person)
}

/// Deletes the caller's person; other owners' ids are a no-op.
pub async fn delete_person(st: &AppState, user_id: i64, person_id: i64) -> Result<(), ApiError> {
    let mut tx = st.db.begin().await?;
    let Some(photo_key) = repo::delete_person_tx(&mut tx, user_id, person_id).await? else {
        // not found or owned by someone else
        return Ok(());
    };
    // two people with the same name share a key
    let orphaned_key = match photo_key {
        Some(key) => (!repo::photo_key_in_use_tx(&mut tx, &key).await?).then_some(key),
        None => None,
    };
    tx.commit().await?;
    info!(user_id, person_id, "person deleted");

    if let Some(key) = orphaned_key {
        if let Err(e) = st.storage.delete_object(&key).await {
            warn!(error = %format!("{e:#}"), %key, "photo delete failed");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    // "hello" in base64
    const HELLO_B64: &str = "aGVsbG8=";

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some(("image/jpeg", "jpg")));
        assert_eq!(ext_from_mime("image/jpg"), Some(("image/jpeg", "jpg")));
        assert_eq!(ext_from_mime("image/png"), Some(("image/png", "png")));
        assert_eq!(ext_from_mime("image/webp"), Some(("image/webp", "webp")));
        assert_eq!(ext_from_mime("image/heic"), Some(("image/heic", "heic")));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn parses_data_url_with_mime() {
        let img = EmbeddedImage::parse(&format!("data:image/png;base64,{HELLO_B64}")).unwrap();
        assert_eq!(&img.body[..], b"hello");
        assert_eq!(img.content_type, "image/png");
        assert_eq!(img.ext, "png");
    }

    #[test]
    fn bare_payload_defaults_to_jpeg() {
        let img = EmbeddedImage::parse(HELLO_B64).unwrap();
        assert_eq!(&img.body[..], b"hello");
        assert_eq!(img.content_type, "image/jpeg");
        assert_eq!(img.ext, "jpg");
    }

    #[test]
    fn prefix_without_data_scheme_uses_text_after_last_comma() {
        let img = EmbeddedImage::parse(&format!("base64,{HELLO_B64}")).unwrap();
        assert_eq!(&img.body[..], b"hello");
        assert_eq!(img.content_type, "image/jpeg");
    }

    #[test]
    fn unknown_mime_falls_back_to_jpeg() {
        let img = EmbeddedImage::parse(&format!("data:image/gif;base64,{HELLO_B64}")).unwrap();
        assert_eq!(img.content_type, "image/jpeg");
        assert_eq!(img.ext, "jpg");
    }

    #[test]
    fn wrapped_payload_is_accepted() {
        let img = EmbeddedImage::parse("data:image/jpeg;base64,aGVs\nbG8=").unwrap();
        assert_eq!(&img.body[..], b"hello");
    }

    #[test]
    fn invalid_base64_is_a_validation_error() {
        let err = EmbeddedImage::parse("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = EmbeddedImage::parse("data:image/png;base64,").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn photo_key_is_deterministic() {
        assert_eq!(photo_key(7, "Ann Lee", "jpg"), "people/7_Ann_Lee.jpg");
        assert_eq!(photo_key(7, "Ann Lee", "jpg"), photo_key(7, "Ann Lee", "jpg"));
        assert_eq!(photo_key(3, "a/b", "png"), "people/3_a_b.png");
    }

    #[tokio::test]
    async fn public_url_keeps_reserved_name_characters_in_the_path() {
        let store = MemoryStorage::default();
        for (name, url) in [
            ("Ann #2", "https://fake.local/files/people/1_Ann_%232.jpg"),
            ("100% Bob", "https://fake.local/files/people/1_100%25_Bob.jpg"),
            ("Who?", "https://fake.local/files/people/1_Who%3F.jpg"),
        ] {
            let img = EmbeddedImage::parse(HELLO_B64).unwrap();
            let photo = upload_photo(&store, 1, name, img).await.unwrap();
            assert_eq!(photo.url, url, "{name}");
            assert!(store.get(&photo.key).is_some(), "{name}");
        }
    }

    #[tokio::test]
    async fn upload_stores_object_and_returns_public_url() {
        let store = MemoryStorage::default();
        let img = EmbeddedImage::parse(&format!("data:image/webp;base64,{HELLO_B64}")).unwrap();

        let photo = upload_photo(&store, 5, "Ivan Petrov", img).await.unwrap();
        assert_eq!(photo.key, "people/5_Ivan_Petrov.webp");
        assert_eq!(photo.url, "https://fake.local/files/people/5_Ivan_Petrov.webp");

        let (body, ct) = store.get(&photo.key).expect("object stored");
        assert_eq!(&body[..], b"hello");
        assert_eq!(ct, "image/webp");
    }

    #[tokio::test]
    async fn upload_surfaces_storage_failure() {
        let store = MemoryStorage::failing();
        let img = EmbeddedImage::parse(HELLO_B64).unwrap();
        let err = upload_photo(&store, 1, "Ann", img).await.unwrap_err();
        assert!(format!("{err:#}").contains("people/1_Ann.jpg"));
    }
}
