use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::error::ExtractorError;
use super::parse;
use super::resolver::VideoResolver;
use crate::media::{ResolvedLiveMedia, VideoInfo};
use crate::session::Session;

/// Resolver backed by the legacy flat-info and player-status endpoints.
///
/// Owns the [`Session`] whose cookies authorize every request.
#[derive(Debug)]
pub struct ApiResolver {
    session: Session,
}

impl ApiResolver {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Stream URL of a video from the flat video-info endpoint.
    pub async fn video_url(&self, video_id: &str) -> Result<String, ExtractorError> {
        let url = self.session.endpoints().flat_info_url(video_id);
        let body = self.session.get_text(&url).await?;
        let stream_url = parse::parse_flat_info(&body)?;
        debug!(video_id, stream_url = %stream_url, "Resolved flat video info");
        Ok(stream_url)
    }

    /// Watch page title with the site suffixes removed and path separators
    /// replaced. Empty when the page has no `<title>`.
    pub async fn video_title(&self, video_id: &str) -> Result<String, ExtractorError> {
        let url = self.session.endpoints().watch_url(video_id);
        let html = self.session.get_text(&url).await?;
        match parse::extract_page_title(&html) {
            Some(title) => Ok(parse::normalize_title(&title)),
            None => {
                warn!(video_id, "Watch page has no <title>");
                Ok(String::new())
            }
        }
    }

    /// RTMP base URL, ticket and ordered segment list of a timeshift.
    ///
    /// A document without any segment match resolves to an empty list; the
    /// caller decides what that means.
    pub async fn resolve_live(&self, live_id: &str) -> Result<ResolvedLiveMedia, ExtractorError> {
        let url = self.session.endpoints().live_status_url(live_id);
        let xml = self.session.get_text(&url).await?;
        let status = parse::parse_player_status(&xml)?;
        let segments = parse::extract_segments(&status.que);

        if segments.is_empty() {
            warn!(live_id, "Player status lists no segments");
        }
        info!(
            live_id,
            rtmp_url = %status.rtmp_url,
            segments = segments.len(),
            ticket_len = status.ticket.len(),
            "Resolved timeshift"
        );

        Ok(ResolvedLiveMedia {
            segments,
            ticket: status.ticket,
            rtmp_url: status.rtmp_url,
        })
    }

    /// Title of a live watch page. Empty when the heading is missing.
    pub async fn live_title(&self, live_id: &str) -> Result<String, ExtractorError> {
        let url = self.session.endpoints().live_watch_url(live_id);
        let html = self.session.get_text(&url).await?;
        Ok(parse::extract_live_title(&html).unwrap_or_else(|| {
            warn!(live_id, "Live watch page has no title heading");
            String::new()
        }))
    }
}

#[async_trait]
impl VideoResolver for ApiResolver {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn resolve(&self, video_id: &str) -> Result<VideoInfo, ExtractorError> {
        let url = self.video_url(video_id).await?;
        let title = self.video_title(video_id).await?;
        Ok(VideoInfo { url, title })
    }
}
