//! Session handling and media resolution for niconico.
//!
//! A [`Session`] logs in and keeps cookies; [`ApiResolver`] scrapes the
//! legacy endpoints for single videos and timeshift recordings;
//! [`DomResolver`] reads the rendered watch page through a headless browser.

pub mod extractor;
pub mod media;
pub mod session;

pub use extractor::api::ApiResolver;
pub use extractor::dom::{DomConfig, DomResolver};
pub use extractor::endpoints::Endpoints;
pub use extractor::error::ExtractorError;
pub use extractor::resolver::VideoResolver;
pub use media::{ResolvedLiveMedia, VideoInfo};
pub use session::{Credentials, Session};
