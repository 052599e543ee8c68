//! URL handling module for Harvest
//!
//! This module provides href resolution, domain extraction, and the slug
//! used to name persisted article files.

mod domain;
mod normalize;
mod slug;

// Re-export main functions
pub use domain::extract_domain;
pub use normalize::{normalize_url, parse_http_url};
pub use slug::url_slug;
