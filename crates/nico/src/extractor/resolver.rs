use async_trait::async_trait;

use super::error::ExtractorError;
use crate::media::VideoInfo;

/// Turns a video id into a playable URL and a title.
///
/// Implemented by [`ApiResolver`](super::api::ApiResolver), which scrapes
/// the legacy endpoints, and [`DomResolver`](super::dom::DomResolver), which
/// reads the rendered watch page through a browser. The caller picks one at
/// startup.
#[async_trait]
pub trait VideoResolver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn resolve(&self, video_id: &str) -> Result<VideoInfo, ExtractorError>;
}
