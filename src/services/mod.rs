pub mod auth_service;
pub mod comment_service;
pub mod version_service;
