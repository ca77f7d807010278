// Users module
// Profile management, notification preferences and the contact-us relay

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use models::{ProfileResponse, ProfileUpdate, UpdateProfileRequest};
pub use repository::{PgProfileStore, ProfileStore};
pub use service::ProfileService;
