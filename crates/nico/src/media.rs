//! Values produced by the resolvers and consumed by the acquisition engine.

/// A single video: where to fetch it and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub url: String,
    pub title: String,
}

impl VideoInfo {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// A timeshift recording delivered as RTMP segments.
///
/// `segments` is in playback order; every segment must be fetched with the
/// same `ticket`.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedLiveMedia {
    pub segments: Vec<String>,
    pub ticket: String,
    pub rtmp_url: String,
}

impl ResolvedLiveMedia {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

// The ticket authorizes playback, keep it out of logs.
impl std::fmt::Debug for ResolvedLiveMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedLiveMedia")
            .field("segments", &self.segments)
            .field("ticket", &format_args!("<{} bytes>", self.ticket.len()))
            .field("rtmp_url", &self.rtmp_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_ticket() {
        let media = ResolvedLiveMedia {
            segments: vec!["/content/1/lv1.f4v".to_owned()],
            ticket: "secret-ticket".to_owned(),
            rtmp_url: "rtmp://example.com/app".to_owned(),
        };
        let rendered = format!("{media:?}");
        assert!(!rendered.contains("secret-ticket"));
        assert!(rendered.contains("<13 bytes>"));
        assert_eq!(media.len(), 1);
    }
}
