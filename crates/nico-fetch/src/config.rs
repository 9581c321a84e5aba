use std::env;

use tracing::debug;

pub const RTMPDUMP_ENV: &str = "RTMPDUMP_PATH";
pub const FFMPEG_ENV: &str = "FFMPEG_PATH";

/// External tool locations and extra arguments.
///
/// Binary lookup order: explicit path, then the environment variable, then
/// the bare program name on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct FetchConfig {
    pub rtmpdump_path: Option<String>,
    pub ffmpeg_path: Option<String>,
    /// Appended after the generated rtmpdump arguments.
    pub rtmpdump_args: Vec<String>,
    /// Inserted before ffmpeg's `-i`.
    pub ffmpeg_input_args: Vec<String>,
}

impl FetchConfig {
    pub fn with_rtmpdump_path(mut self, path: impl Into<String>) -> Self {
        self.rtmpdump_path = Some(path.into());
        self
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    pub fn rtmpdump_program(&self) -> String {
        resolve_binary(self.rtmpdump_path.as_deref(), RTMPDUMP_ENV, "rtmpdump")
    }

    pub fn ffmpeg_program(&self) -> String {
        resolve_binary(self.ffmpeg_path.as_deref(), FFMPEG_ENV, "ffmpeg")
    }

    /// First banner line of rtmpdump, `None` when it cannot be started.
    pub fn rtmpdump_version(&self) -> Option<String> {
        process_utils::probe(self.rtmpdump_program(), &["--help"])
    }

    /// First line of `ffmpeg -version`, `None` when it cannot be started.
    pub fn ffmpeg_version(&self) -> Option<String> {
        process_utils::probe(self.ffmpeg_program(), &["-version"])
    }
}

fn resolve_binary(explicit: Option<&str>, env_key: &str, default: &str) -> String {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return path.to_owned();
    }
    if let Ok(path) = env::var(env_key)
        && !path.is_empty()
    {
        debug!(env = env_key, path = %path, "Using binary from environment");
        return path;
    }
    default.to_owned()
}
