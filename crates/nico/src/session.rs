use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Url};
use tracing::{debug, info, warn};

use crate::extractor::endpoints::Endpoints;
use crate::extractor::error::ExtractorError;

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Cookie the site sets once a login actually succeeded.
const SESSION_COOKIE: &str = "user_session";

/// Account identifier (mail address or phone number) and password.
#[derive(Clone)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Authenticated HTTP session.
///
/// Owns one reqwest client bound to one cookie jar. Every cookie received
/// from any response is kept for the lifetime of the session and attached
/// to later requests (domain, path and expiry are honoured by the jar).
///
/// # Login verification
///
/// [`Session::login`] only checks that the request went through. A wrong
/// password is not detected here and shows up later as a parse or driver
/// error on a page that redirected to the login wall.
/// [`Session::has_session_cookie`] is the only hint available.
#[derive(Debug)]
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    endpoints: Endpoints,
    credentials: Option<Credentials>,
    authenticated: bool,
}

impl Session {
    /// Session against the real site with an empty cookie jar.
    pub fn new() -> Self {
        Self::with_endpoints(Endpoints::default())
    }

    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialised.
    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self::with_client_builder(endpoints, Client::builder())
            .expect("Failed to create HTTP client")
    }

    /// Build a session from a caller-supplied client builder.
    ///
    /// The cookie jar and default headers are installed on top of whatever
    /// the builder already carries (proxy, timeouts, ...).
    pub fn with_client_builder(
        endpoints: Endpoints,
        builder: ClientBuilder,
    ) -> Result<Self, ExtractorError> {
        let jar = Arc::new(Jar::default());
        let client = builder
            .cookie_provider(Arc::clone(&jar))
            .default_headers(default_headers())
            .build()?;

        Ok(Self {
            client,
            jar,
            endpoints,
            credentials: None,
            authenticated: false,
        })
    }

    pub fn set_credentials(&mut self, identifier: impl Into<String>, secret: impl Into<String>) {
        self.credentials = Some(Credentials::new(identifier, secret));
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The underlying client. Clones share the cookie jar.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Whether [`Session::login`] has completed without a transport error.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Submit the stored credentials to the login endpoint.
    ///
    /// Success means a response arrived; status and body are not inspected.
    pub async fn login(&mut self) -> Result<(), ExtractorError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ExtractorError::MissingCredentials)?;

        info!(identifier = %credentials.identifier(), "Logging in");
        let form = [
            ("mail_tel", credentials.identifier()),
            ("password", credentials.secret()),
        ];
        let response = self
            .client
            .post(&self.endpoints.login)
            .form(&form)
            .send()
            .await?;
        debug!(status = %response.status(), url = %response.url(), "Login request completed");

        self.authenticated = true;
        if !self.has_session_cookie() {
            warn!("Login response carried no {SESSION_COOKIE} cookie, the credentials may be wrong");
        }
        Ok(())
    }

    /// GET `url` with the session cookies and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, ExtractorError> {
        debug!(url = %url, "GET");
        let response = self.client.get(url).send().await?;
        debug!(status = %response.status(), url = %url, "Response received");
        Ok(response.text().await?)
    }

    /// Cookie header the jar would send to `url`.
    pub fn cookie_header(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        self.jar
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(ToOwned::to_owned))
    }

    /// Whether the jar holds the site's login cookie.
    ///
    /// Checked against the login endpoint's origin, which is https on the
    /// real site, so a `Secure` cookie is still seen.
    pub fn has_session_cookie(&self) -> bool {
        let Some(origin) = Url::parse(&self.endpoints.login)
            .and_then(|login| login.join("/"))
            .ok()
        else {
            return false;
        };
        self.cookie_header(origin.as_str())
            .is_some_and(|cookies| {
                cookies
                    .split(';')
                    .filter_map(|pair| pair.trim().split_once('='))
                    .any(|(name, _)| name == SESSION_COOKIE)
            })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(DEFAULT_UA));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("ja,en-US;q=0.7,en;q=0.3"),
    );
    headers
}
