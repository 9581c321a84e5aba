//! Download flows selected by the command line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use nico_fetch::{HttpDownloader, OutputSpec, RemuxDownloader, RtmpDownloader};
use nico_parser::{ApiResolver, Credentials, DomResolver, Session, VideoInfo, VideoResolver};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::naming;

pub struct Downloader {
    config: AppConfig,
    credentials: Credentials,
}

impl Downloader {
    pub fn new(config: AppConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Timeshift of a live broadcast: player status, then one rtmpdump run
    /// per segment.
    pub async fn timeshift(&self, live_id: &str, output: Option<&str>) -> Result<()> {
        let resolver = ApiResolver::new(self.login().await?);
        let media = resolver
            .resolve_live(live_id)
            .await
            .with_context(|| format!("Failed to resolve timeshift {live_id}"))?;

        let path = match output {
            Some(output) => naming::expand_home(output),
            None => {
                let title = resolver
                    .live_title(live_id)
                    .await
                    .with_context(|| format!("Failed to read title of {live_id}"))?;
                naming::default_output(&title, live_id, self.config.output_dir.as_deref())
            }
        };

        let fetch = self.config.fetch_config();
        probe_tool("rtmpdump", fetch.rtmpdump_version());
        let outcomes = RtmpDownloader::new(fetch)
            .download(media, &OutputSpec::from_path(&path))
            .await
            .context("Timeshift download failed")?;

        for outcome in &outcomes {
            info!(segment = outcome.index, path = %outcome.path.display(), "Saved segment");
        }
        Ok(())
    }

    /// Video through the flat-info endpoint, fetched with the session's
    /// cookies.
    pub async fn video_api(&self, video_id: &str, output: Option<&str>) -> Result<()> {
        let resolver = ApiResolver::new(self.login().await?);
        let info = resolve(&resolver, video_id).await?;
        let path = self.output_path(output, &info, video_id);

        let written = HttpDownloader::new(resolver.session().client().clone())
            .download(&info.url, &path)
            .await
            .with_context(|| format!("Failed to download {video_id}"))?;
        info!(path = %path.display(), bytes = written, "Saved video");
        Ok(())
    }

    /// Video read from the rendered watch page and copied with ffmpeg.
    ///
    /// The browser is shut down before the download starts, on success and
    /// on failure alike.
    pub async fn video_dom(&self, video_id: &str, output: Option<&str>) -> Result<()> {
        let mut resolver = DomResolver::launch(self.credentials.clone(), self.config.dom_config())
            .await
            .context("Failed to start the browser")?;
        let resolved = resolve(&resolver, video_id).await;
        resolver.close().await;
        let info = resolved?;

        let path = self.output_path(output, &info, video_id);
        let fetch = self.config.fetch_config();
        probe_tool("ffmpeg", fetch.ffmpeg_version());
        RemuxDownloader::new(fetch)
            .download(&info.url, &path)
            .await
            .with_context(|| format!("Failed to download {video_id}"))?;
        info!(path = %path.display(), "Saved video");
        Ok(())
    }

    async fn login(&self) -> Result<Session> {
        let mut session = Session::new();
        session.set_credentials(self.credentials.identifier(), self.credentials.secret());
        session.login().await.context("Login failed")?;
        Ok(session)
    }

    fn output_path(&self, output: Option<&str>, info: &VideoInfo, id: &str) -> PathBuf {
        match output {
            Some(output) => naming::expand_home(output),
            None => naming::default_output(&info.title, id, self.config.output_dir.as_deref()),
        }
    }
}

async fn resolve(resolver: &dyn VideoResolver, video_id: &str) -> Result<VideoInfo> {
    info!(resolver = resolver.name(), video_id, "Resolving video");
    let info = resolver
        .resolve(video_id)
        .await
        .with_context(|| format!("Failed to resolve {video_id}"))?;
    debug!(title = %info.title, url = %info.url, "Resolved video");
    Ok(info)
}

fn probe_tool(name: &str, version: Option<String>) {
    match version {
        Some(version) => debug!(tool = name, version = %version, "Found tool"),
        None => warn!(tool = name, "Tool did not respond, the download will likely fail"),
    }
}
