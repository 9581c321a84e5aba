use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

/// How a plain video ID is turned into a downloadable URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Legacy flat-info endpoint, downloaded directly over HTTP
    Api,
    /// Rendered watch page in a browser, copied with ffmpeg
    Dom,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Download niconico videos and timeshift recordings", long_about = None)]
pub struct Args {
    /// Video ID (sm12345) or, with --timeshift, live ID (lv12345)
    pub id: String,

    /// Download the timeshift recording of a live broadcast
    #[arg(short, long)]
    pub timeshift: bool,

    /// Output file (default: the title with an .mp4 extension)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Account mail address or phone number
    #[arg(short, long, env = "NICO_EMAIL")]
    pub email: Option<String>,

    /// Account password
    #[arg(short, long, env = "NICO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Resolver used for videos [default: dom]
    #[arg(long, value_enum)]
    pub resolver: Option<ResolverKind>,

    /// Configuration file (default: <config dir>/nicodl/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_short_flags() {
        let args = Args::parse_from([
            "nicodl", "lv123", "-t", "-o", "~/rec.mp4", "-e", "me@example.com", "-p", "pw",
        ]);
        assert_eq!(args.id, "lv123");
        assert!(args.timeshift);
        assert_eq!(args.output.as_deref(), Some("~/rec.mp4"));
        assert_eq!(args.email.as_deref(), Some("me@example.com"));
        assert_eq!(args.password.as_deref(), Some("pw"));
        assert_eq!(args.resolver, None);
    }

    #[test]
    fn resolver_is_selectable() {
        let args = Args::parse_from(["nicodl", "sm9", "--resolver", "api"]);
        assert_eq!(args.resolver, Some(ResolverKind::Api));
        assert!(Args::try_parse_from(["nicodl", "sm9", "--resolver", "curl"]).is_err());
    }
}
