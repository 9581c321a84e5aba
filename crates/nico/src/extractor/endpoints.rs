/// URL prefixes for every site endpoint the resolvers talk to.
///
/// Identifiers are appended verbatim, so each prefix ends where the id
/// starts. Tests swap these for a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub flat_info: String,
    pub watch: String,
    pub live_status: String,
    pub live_watch: String,
    /// Login page driven through the browser.
    pub account_login: String,
}

impl Endpoints {
    const LOGIN_URL: &str = "https://secure.nicovideo.jp/secure/login";
    const FLAT_INFO_URL: &str = "http://flapi.nicovideo.jp/api/getflv/";
    const WATCH_URL: &str = "http://www.nicovideo.jp/watch/";
    const LIVE_STATUS_URL: &str = "http://watch.live.nicovideo.jp/api/getplayerstatus/lv";
    const LIVE_WATCH_URL: &str = "http://live.nicovideo.jp/watch/lv";
    const ACCOUNT_LOGIN_URL: &str = "https://account.nicovideo.jp/login";

    /// Endpoints rooted at `base` (no trailing slash), mirroring the real
    /// site's paths. Used to target a local mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            login: format!("{base}/secure/login"),
            flat_info: format!("{base}/api/getflv/"),
            watch: format!("{base}/watch/"),
            live_status: format!("{base}/api/getplayerstatus/lv"),
            live_watch: format!("{base}/live/watch/lv"),
            account_login: format!("{base}/login"),
        }
    }

    pub fn flat_info_url(&self, video_id: &str) -> String {
        format!("{}{}", self.flat_info, video_id)
    }

    pub fn watch_url(&self, video_id: &str) -> String {
        format!("{}{}", self.watch, video_id)
    }

    pub fn live_status_url(&self, live_id: &str) -> String {
        format!("{}{}", self.live_status, strip_live_prefix(live_id))
    }

    pub fn live_watch_url(&self, live_id: &str) -> String {
        format!("{}{}", self.live_watch, strip_live_prefix(live_id))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: Self::LOGIN_URL.to_owned(),
            flat_info: Self::FLAT_INFO_URL.to_owned(),
            watch: Self::WATCH_URL.to_owned(),
            live_status: Self::LIVE_STATUS_URL.to_owned(),
            live_watch: Self::LIVE_WATCH_URL.to_owned(),
            account_login: Self::ACCOUNT_LOGIN_URL.to_owned(),
        }
    }
}

/// Live ids are accepted both as `lv123` and `123`; the endpoints carry the prefix.
fn strip_live_prefix(live_id: &str) -> &str {
    live_id.strip_prefix("lv").unwrap_or(live_id)
}
