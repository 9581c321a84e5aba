//! Acquisition engine: turns resolved media descriptions into files.
//!
//! - [`HttpDownloader`] streams a single URL into a file.
//! - [`RtmpDownloader`] runs one `rtmpdump` per timeshift segment, strictly
//!   in order, and stops at the first failure.
//! - [`RemuxDownloader`] hands a URL to `ffmpeg` and copies the streams
//!   into a container.

pub mod config;
pub mod error;
pub mod http;
pub mod output;
pub mod remux;
pub mod rtmp;

pub use config::FetchConfig;
pub use error::DownloadError;
pub use http::HttpDownloader;
pub use output::OutputSpec;
pub use remux::RemuxDownloader;
pub use rtmp::{CommandRunner, ProcessRunner, RtmpDownloader, SegmentOutcome};
