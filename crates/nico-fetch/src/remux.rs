//! Container copy through ffmpeg, used for URLs read from the rendered page.

use std::path::Path;

use tracing::{error, info};

use crate::config::FetchConfig;
use crate::error::DownloadError;
use crate::rtmp::{CommandRunner, ProcessRunner};

pub struct RemuxDownloader<R = ProcessRunner> {
    runner: R,
    config: FetchConfig,
}

impl RemuxDownloader<ProcessRunner> {
    pub fn new(config: FetchConfig) -> Self {
        Self::with_runner(ProcessRunner, config)
    }
}

impl<R: CommandRunner> RemuxDownloader<R> {
    pub fn with_runner(runner: R, config: FetchConfig) -> Self {
        Self { runner, config }
    }

    /// Copy the audio and video streams of `url` into `output` without
    /// re-encoding. Returns the tool's combined output.
    pub async fn download(&self, url: &str, output: &Path) -> Result<String, DownloadError> {
        let program = self.config.ffmpeg_program();
        let args = self.args(url, output);
        info!(url = %url, path = %output.display(), "Remuxing with ffmpeg");

        let captured = self
            .runner
            .run(&program, &args)
            .await
            .map_err(|e| DownloadError::spawn(&program, e))?;

        let text = captured.combined.trim_end();
        if !text.is_empty() {
            info!("{text}");
        }
        if !captured.success() {
            error!(code = ?captured.code, "ffmpeg failed");
            return Err(DownloadError::Subprocess {
                program,
                segment: None,
                target: url.to_owned(),
                code: captured.code,
                output: captured.combined,
            });
        }
        Ok(captured.combined)
    }

    fn args(&self, url: &str, output: &Path) -> Vec<String> {
        let mut args = vec!["-y".to_owned(), "-hide_banner".to_owned()];
        args.extend(self.config.ffmpeg_input_args.iter().cloned());
        args.extend([
            "-i".to_owned(),
            url.to_owned(),
            "-vcodec".to_owned(),
            "copy".to_owned(),
            "-acodec".to_owned(),
            "copy".to_owned(),
            output.to_string_lossy().into_owned(),
        ]);
        args
    }
}
