use std::path::PathBuf;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("failed to create `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("copy into `{}` stopped after {written} bytes: {reason}", .path.display())]
    Copy {
        path: PathBuf,
        written: u64,
        reason: String,
    },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` failed on {target} ({}){}", exit_label(.code), segment_label(.segment))]
    Subprocess {
        program: String,
        /// Zero-based segment position for multi-segment downloads.
        segment: Option<usize>,
        target: String,
        code: Option<i32>,
        output: String,
    },

    #[error("no segments to download")]
    EmptyPlaylist,
}

impl DownloadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn copy(path: impl Into<PathBuf>, written: u64, reason: impl std::fmt::Display) -> Self {
        Self::Copy {
            path: path.into(),
            written,
            reason: reason.to_string(),
        }
    }

    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Failed segment, if this error came from a segmented download.
    pub fn segment(&self) -> Option<usize> {
        match self {
            Self::Subprocess { segment, .. } => *segment,
            _ => None,
        }
    }

    /// Network-class failures: transport errors and non-success statuses.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}

fn segment_label(segment: &Option<usize>) -> String {
    segment
        .map(|index| format!(" at segment {index}"))
        .unwrap_or_default()
}
