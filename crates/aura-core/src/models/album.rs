use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An album: a named, sluggable collection of photos with its own sharing and
/// permission state.
///
/// `image_count` is denormalized and must always equal the number of photo
/// rows referencing this album; the ingestion and deletion paths keep it
/// synchronized inside the same transaction as the row writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Album {
    pub id: Uuid,
    pub name: String,
    /// Unique url-safe key, also the object-store prefix. See [`album_slug`].
    pub slug: String,
    /// Human-readable storage location, `{owner}/{name}` un-normalized.
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub image_count: i64,
    pub shared: bool,
    pub public_upload: bool,
    /// Opaque token for unlisted-link sharing, minted at creation.
    pub secret: String,
    pub face_detection: bool,
}

/// Fields for a new album row; the id and creation timestamp are assigned by
/// the repository on insert, and the counter starts at zero.
#[derive(Debug, Clone)]
pub struct NewAlbum {
    pub name: String,
    pub slug: String,
    pub location: String,
    pub shared: bool,
    pub public_upload: bool,
    /// Minted by the caller, one fresh UUIDv4 per created album.
    pub secret: String,
    pub face_detection: bool,
}

/// How an upload target album was obtained: freshly created for this batch,
/// or found already existing under the slug (additive upload).
#[derive(Debug, Clone)]
pub enum AlbumResolution {
    Created(Album),
    Found(Album),
}

impl AlbumResolution {
    pub fn album(&self) -> &Album {
        match self {
            AlbumResolution::Created(album) | AlbumResolution::Found(album) => album,
        }
    }

    pub fn into_album(self) -> Album {
        match self {
            AlbumResolution::Created(album) | AlbumResolution::Found(album) => album,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, AlbumResolution::Created(_))
    }
}

/// Build the unique slug for an owner + display-name pair: the name is
/// lowercased with spaces replaced by hyphens, prefixed by the owner.
pub fn album_slug(owner: &str, name: &str) -> String {
    format!("{}/{}", owner, name.to_lowercase().replace(' ', "-"))
}
