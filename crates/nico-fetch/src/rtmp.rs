//! Timeshift acquisition: one rtmpdump invocation per segment.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nico_parser::ResolvedLiveMedia;
use process_utils::CapturedOutput;
use tracing::{debug, error, info};

use crate::config::FetchConfig;
use crate::error::DownloadError;
use crate::output::OutputSpec;

/// Runs an external program to completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CapturedOutput>;
}

/// [`CommandRunner`] that spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CapturedOutput> {
        let mut cmd = process_utils::tokio_command(program);
        cmd.args(args);
        process_utils::run_captured(&mut cmd).await
    }
}

/// Result of one finished segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentOutcome {
    pub index: usize,
    pub path: PathBuf,
    /// Combined stdout and stderr of the tool.
    pub output: String,
}

/// Downloads timeshift segments with rtmpdump, one after another.
pub struct RtmpDownloader<R = ProcessRunner> {
    runner: R,
    config: FetchConfig,
}

impl RtmpDownloader<ProcessRunner> {
    pub fn new(config: FetchConfig) -> Self {
        Self::with_runner(ProcessRunner, config)
    }
}

impl<R: CommandRunner> RtmpDownloader<R> {
    pub fn with_runner(runner: R, config: FetchConfig) -> Self {
        Self { runner, config }
    }

    /// Download every segment of `media` into the paths of `output`.
    ///
    /// Segment `i` is started only after segment `i - 1` exited
    /// successfully. The first failure ends the run; segments after it are
    /// never started and files already written stay on disk.
    pub async fn download(
        &self,
        media: ResolvedLiveMedia,
        output: &OutputSpec,
    ) -> Result<Vec<SegmentOutcome>, DownloadError> {
        if media.is_empty() {
            return Err(DownloadError::EmptyPlaylist);
        }

        let program = self.config.rtmpdump_program();
        let total = media.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, locator) in media.segments.iter().enumerate() {
            let path = output.segment_path(index);
            info!(
                segment = index,
                total,
                locator = %locator,
                path = %path.display(),
                "Saving segment"
            );

            let args = self.segment_args(&media, locator, &path);
            debug!(program = %program, ticket_len = media.ticket.len(), "Spawning rtmpdump");
            let captured = self
                .runner
                .run(&program, &args)
                .await
                .map_err(|e| DownloadError::spawn(&program, e))?;

            let text = captured.combined.trim_end();
            if !text.is_empty() {
                info!(segment = index, "{text}");
            }

            if !captured.success() {
                error!(segment = index, code = ?captured.code, "rtmpdump failed");
                return Err(DownloadError::Subprocess {
                    program,
                    segment: Some(index),
                    target: locator.clone(),
                    code: captured.code,
                    output: captured.combined,
                });
            }

            outcomes.push(SegmentOutcome {
                index,
                path,
                output: captured.combined,
            });
        }

        info!(segments = outcomes.len(), "All segments saved");
        Ok(outcomes)
    }

    fn segment_args(&self, media: &ResolvedLiveMedia, locator: &str, path: &Path) -> Vec<String> {
        let mut args = vec![
            "-r".to_owned(),
            media.rtmp_url.clone(),
            "--live".to_owned(),
            "-y".to_owned(),
            format!("mp4:{locator}"),
            "-C".to_owned(),
            format!("S:{}", media.ticket),
            "-o".to_owned(),
            path.to_string_lossy().into_owned(),
        ];
        args.extend(self.config.rtmpdump_args.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn media(segments: &[&str]) -> ResolvedLiveMedia {
        ResolvedLiveMedia {
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
            ticket: "T123".to_owned(),
            rtmp_url: "rtmp://example.com/fileorigin/01".to_owned(),
        }
    }

    fn config() -> FetchConfig {
        FetchConfig::default().with_rtmpdump_path("rtmpdump")
    }

    #[tokio::test]
    async fn runs_segments_in_list_order() {
        let mut runner = MockCommandRunner::new();
        let mut seq = Sequence::new();
        for (locator, out) in [("/content/1/lv7_b.f4v", "show.mp4"), ("/content/1/lv7_a.f4v", "show_1.mp4")] {
            let expected_target = format!("mp4:{locator}");
            runner
                .expect_run()
                .withf(move |program, args| {
                    program == "rtmpdump"
                        && args.contains(&expected_target)
                        && args.last().map(String::as_str) == Some(out)
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(CapturedOutput::new(Some(0), "ok\n")));
        }

        let outcomes = RtmpDownloader::with_runner(runner, config())
            .download(
                media(&["/content/1/lv7_b.f4v", "/content/1/lv7_a.f4v"]),
                &OutputSpec::from_path("show.mp4"),
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].index, 1);
        assert_eq!(outcomes[1].path, PathBuf::from("show_1.mp4"));
        assert_eq!(outcomes[0].output, "ok\n");
    }

    #[tokio::test]
    async fn passes_url_ticket_and_live_flag() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|_, args| {
                args == [
                    "-r",
                    "rtmp://example.com/fileorigin/01",
                    "--live",
                    "-y",
                    "mp4:/content/1/lv7_a.f4v",
                    "-C",
                    "S:T123",
                    "-o",
                    "show.mp4",
                ]
            })
            .times(1)
            .returning(|_, _| Ok(CapturedOutput::new(Some(0), "")));

        RtmpDownloader::with_runner(runner, config())
            .download(media(&["/content/1/lv7_a.f4v"]), &OutputSpec::from_path("show.mp4"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn appends_configured_extra_args() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|_, args| {
                args.len() == 11
                    && args[7..] == ["-o", "show.mp4", "--timeout", "30"]
            })
            .times(1)
            .returning(|_, _| Ok(CapturedOutput::new(Some(0), "")));

        let mut config = config();
        config.rtmpdump_args = vec!["--timeout".to_owned(), "30".to_owned()];
        RtmpDownloader::with_runner(runner, config)
            .download(media(&["/content/1/lv7_a.f4v"]), &OutputSpec::from_path("show.mp4"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stops_at_first_failing_segment() {
        let mut runner = MockCommandRunner::new();
        let mut seq = Sequence::new();
        runner
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(CapturedOutput::new(Some(0), "")));
        runner
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(CapturedOutput::new(Some(1), "ERROR: Connect failed\n")));

        let err = RtmpDownloader::with_runner(runner, config())
            .download(
                media(&["/content/1/a.f4v", "/content/1/b.f4v", "/content/1/c.f4v"]),
                &OutputSpec::from_path("show.mp4"),
            )
            .await
            .unwrap_err();

        match err {
            DownloadError::Subprocess {
                segment,
                target,
                code,
                output,
                ..
            } => {
                assert_eq!(segment, Some(1));
                assert_eq!(target, "/content/1/b.f4v");
                assert_eq!(code, Some(1));
                assert!(output.contains("Connect failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_playlist_spawns_nothing() {
        let runner = MockCommandRunner::new();
        let err = RtmpDownloader::with_runner(runner, config())
            .download(media(&[]), &OutputSpec::from_path("show.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::EmptyPlaylist));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|_, _| {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"))
        });

        let err = RtmpDownloader::with_runner(runner, config())
            .download(media(&["/content/1/a.f4v"]), &OutputSpec::from_path("show.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Spawn { ref program, .. } if program == "rtmpdump"));
    }

    /// Fails the test if two runs ever overlap.
    #[derive(Default)]
    struct OverlapCheck {
        in_flight: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for OverlapCheck {
        async fn run(&self, _program: &str, args: &[String]) -> std::io::Result<CapturedOutput> {
            assert_eq!(self.in_flight.fetch_add(1, Ordering::SeqCst), 0);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.seen.lock().unwrap().push(args[4].clone());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(CapturedOutput::new(Some(0), ""))
        }
    }

    #[tokio::test]
    async fn never_runs_two_segments_at_once() {
        let downloader = RtmpDownloader::with_runner(OverlapCheck::default(), config());
        downloader
            .download(
                media(&["/content/1/a.f4v", "/content/1/b.f4v", "/content/1/c.f4v"]),
                &OutputSpec::from_path("show.mp4"),
            )
            .await
            .unwrap();
        assert_eq!(
            *downloader.runner.seen.lock().unwrap(),
            ["mp4:/content/1/a.f4v", "mp4:/content/1/b.f4v", "mp4:/content/1/c.f4v"]
        );
    }
}
