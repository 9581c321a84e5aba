use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use nico_fetch::FetchConfig;
use nico_parser::{Credentials, DomConfig};
use serde::Deserialize;

use crate::cli::{Args, ResolverKind};

/// Settings from the TOML file, overridden by command line flags.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    pub resolver: Option<ResolverKind>,
    pub rtmpdump_path: Option<String>,
    pub ffmpeg_path: Option<String>,
    /// Appended to every rtmpdump invocation.
    pub rtmpdump_args: Vec<String>,
    /// Placed before ffmpeg's `-i`.
    pub ffmpeg_input_args: Vec<String>,
    pub browser_path: Option<PathBuf>,
    pub headless: Option<bool>,
    pub render_wait_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("resolver", &self.resolver)
            .field("rtmpdump_path", &self.rtmpdump_path)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("rtmpdump_args", &self.rtmpdump_args)
            .field("ffmpeg_input_args", &self.ffmpeg_input_args)
            .field("browser_path", &self.browser_path)
            .field("headless", &self.headless)
            .field("render_wait_secs", &self.render_wait_secs)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nicodl").join("config.toml"))
    }

    /// Load `explicit`, or the default file when it exists.
    ///
    /// A missing default file yields the empty configuration; a missing
    /// explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Flags (and their environment variables) win over the file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(email) = &args.email {
            self.email = Some(email.clone());
        }
        if let Some(password) = &args.password {
            self.password = Some(password.clone());
        }
        if let Some(resolver) = args.resolver {
            self.resolver = Some(resolver);
        }
    }

    pub fn resolver(&self) -> ResolverKind {
        self.resolver.unwrap_or(ResolverKind::Dom)
    }

    pub fn credentials(&self) -> Result<Credentials> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Ok(Credentials::new(email, password))
            }
            _ => bail!("You must set email address and password (-e/-p, NICO_EMAIL/NICO_PASSWORD or the config file)"),
        }
    }

    pub fn dom_config(&self) -> DomConfig {
        let mut config = DomConfig {
            executable: self.browser_path.clone(),
            ..DomConfig::default()
        };
        if let Some(headless) = self.headless {
            config.headless = headless;
        }
        if let Some(secs) = self.render_wait_secs {
            config.render_wait = Duration::from_secs(secs);
        }
        config
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            rtmpdump_path: self.rtmpdump_path.clone(),
            ffmpeg_path: self.ffmpeg_path.clone(),
            rtmpdump_args: self.rtmpdump_args.clone(),
            ffmpeg_input_args: self.ffmpeg_input_args.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const FULL: &str = r#"
email = "me@example.com"
password = "hunter2"
resolver = "api"
rtmpdump_path = "/opt/bin/rtmpdump"
ffmpeg_path = "/opt/bin/ffmpeg"
rtmpdump_args = ["--timeout", "30"]
ffmpeg_input_args = ["-headers", "Referer: https://www.nicovideo.jp/"]
browser_path = "/usr/bin/chromium"
headless = false
render_wait_secs = 30
output_dir = "/srv/nico"
"#;

    #[test]
    fn parses_every_key() {
        let config: AppConfig = toml::from_str(FULL).unwrap();
        assert_eq!(config.resolver(), ResolverKind::Api);
        assert_eq!(config.output_dir.as_deref(), Some(Path::new("/srv/nico")));

        let dom = config.dom_config();
        assert!(!dom.headless);
        assert_eq!(dom.render_wait, Duration::from_secs(30));
        assert_eq!(dom.executable.as_deref(), Some(Path::new("/usr/bin/chromium")));

        let fetch = config.fetch_config();
        assert_eq!(fetch.rtmpdump_program(), "/opt/bin/rtmpdump");
        assert_eq!(fetch.ffmpeg_program(), "/opt/bin/ffmpeg");
        assert_eq!(fetch.rtmpdump_args, ["--timeout", "30"]);
        assert_eq!(
            fetch.ffmpeg_input_args,
            ["-headers", "Referer: https://www.nicovideo.jp/"]
        );
    }

    #[test]
    fn extra_args_default_to_empty() {
        let config: AppConfig = toml::from_str("headless = true").unwrap();
        let fetch = config.fetch_config();
        assert!(fetch.rtmpdump_args.is_empty());
        assert!(fetch.ffmpeg_input_args.is_empty());
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<AppConfig>("mail = \"x\"").is_err());
    }

    #[test]
    fn flags_override_file() {
        let mut config: AppConfig = toml::from_str(FULL).unwrap();
        let args = Args::parse_from(["nicodl", "sm9", "-p", "other", "--resolver", "dom"]);
        config.apply_args(&args);
        assert_eq!(config.password.as_deref(), Some("other"));
        assert_eq!(config.email.as_deref(), Some("me@example.com"));
        assert_eq!(config.resolver(), ResolverKind::Dom);
    }

    #[test]
    fn credentials_are_required() {
        let config = AppConfig {
            email: Some("me@example.com".into()),
            password: Some(String::new()),
            ..AppConfig::default()
        };
        assert!(config.credentials().is_err());
        assert!(AppConfig::default().credentials().is_err());
    }

    #[test]
    fn debug_hides_password() {
        let config: AppConfig = toml::from_str(FULL).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("missing.toml"))).is_err());

        let path = dir.path().join("config.toml");
        std::fs::write(&path, "headless = true\n").unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.headless, Some(true));
        assert_eq!(config.resolver(), ResolverKind::Dom);
    }
}
