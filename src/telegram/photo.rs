//! Stored photo references.
//!
//! A received photo is kept as `id:access_hash:file_reference`, with the
//! file reference base64-encoded, so it can be sent again later without
//! downloading it.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use grammers_tl_types as tl;

use crate::listings::PhotoRef;

/// Parts of a Telegram photo needed to send it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPhoto {
    pub id: i64,
    pub access_hash: i64,
    pub file_reference: Vec<u8>,
}

impl StoredPhoto {
    /// Encodes the photo as a listing photo reference.
    #[must_use]
    pub fn encode(&self) -> PhotoRef {
        PhotoRef(format!(
            "{}:{}:{}",
            self.id,
            self.access_hash,
            URL_SAFE_NO_PAD.encode(&self.file_reference)
        ))
    }

    /// Decodes a reference produced by [`StoredPhoto::encode`].
    #[must_use]
    pub fn decode(photo: &PhotoRef) -> Option<Self> {
        let mut parts = photo.as_str().splitn(3, ':');
        let id = parts.next()?.parse().ok()?;
        let access_hash = parts.next()?.parse().ok()?;
        let file_reference = URL_SAFE_NO_PAD.decode(parts.next()?).ok()?;

        Some(Self {
            id,
            access_hash,
            file_reference,
        })
    }

    /// Extracts the photo from incoming message media.
    #[must_use]
    pub fn from_raw(photo: &tl::enums::Photo) -> Option<Self> {
        match photo {
            tl::enums::Photo::Photo(photo) => Some(Self {
                id: photo.id,
                access_hash: photo.access_hash,
                file_reference: photo.file_reference.clone(),
            }),
            tl::enums::Photo::Empty(_) => None,
        }
    }

    /// Media value for re-sending the photo.
    #[must_use]
    pub fn to_input_media(&self) -> tl::enums::InputMedia {
        tl::types::InputMediaPhoto {
            spoiler: false,
            id: tl::types::InputPhoto {
                id: self.id,
                access_hash: self.access_hash,
                file_reference: self.file_reference.clone(),
            }
            .into(),
            ttl_seconds: None,
        }
        .into()
    }
}
