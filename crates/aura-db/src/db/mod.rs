//! Database repositories for the data access layer.
//!
//! One repository per domain entity. Multi-table operations (photo insert
//! with its counter bump, the deletion cascades) run inside a single
//! transaction held by the repository method; everything else goes straight
//! through the pool.

pub mod albums;
pub mod faces;
pub mod permissions;
pub mod photos;
pub mod users;

pub use albums::AlbumRepository;
pub use faces::FaceRepository;
pub use permissions::PermissionRepository;
pub use photos::PhotoRepository;
pub use users::UserRepository;
