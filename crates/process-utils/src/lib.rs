//! Process helpers for the acquisition crate.
//!
//! rtmpdump and ffmpeg are started through [`tokio_command`] so that the
//! child is killed when its handle is dropped, whichever path the caller
//! leaves on. The browser is not started here; chromiumoxide spawns it.

use std::ffi::OsStr;
use std::process::Stdio;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

impl NoWindowExt for std::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `std::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
pub fn std_command(program: impl AsRef<OsStr>) -> std::process::Command {
    let mut cmd = std::process::Command::new(program);
    cmd.no_window();
    cmd
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` that is killed on drop.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd.kill_on_drop(true);
    cmd
}

/// Exit code plus everything the child wrote, stdout first then stderr.
///
/// `code` is `None` when the child was terminated by a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub code: Option<i32>,
    pub combined: String,
}

impl CapturedOutput {
    pub fn new(code: Option<i32>, combined: impl Into<String>) -> Self {
        Self {
            code,
            combined: combined.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run `cmd` to completion and capture its combined output.
///
/// stdin is closed so tools that prompt (ffmpeg overwrite questions, for
/// instance) cannot block forever.
#[cfg(feature = "tokio")]
pub async fn run_captured(
    cmd: &mut tokio::process::Command,
) -> std::io::Result<CapturedOutput> {
    let out = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&out.stderr);
    if !combined.is_empty() && !stderr.is_empty() && !combined.ends_with('\n') {
        combined.push('\n');
    }
    combined.push_str(&stderr);

    Ok(CapturedOutput {
        code: out.status.code(),
        combined,
    })
}

/// Return the first output line of `program <args>`, or `None` if the
/// program cannot be started.
///
/// Some tools (rtmpdump) print their banner on stderr and exit non-zero
/// for `--help`, so neither the stream nor the exit code is trusted.
pub fn probe(program: impl AsRef<OsStr>, args: &[&str]) -> Option<String> {
    let out = std_command(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .ok()?;
    let text = if out.stdout.is_empty() {
        out.stderr
    } else {
        out.stdout
    };
    String::from_utf8_lossy(&text)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(all(test, unix, feature = "tokio"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_both_streams() {
        let mut cmd = tokio_command("sh");
        cmd.arg("-c").arg("echo out; echo err 1>&2");
        let out = run_captured(&mut cmd).await.unwrap();
        assert!(out.success());
        assert_eq!(out.combined, "out\nerr\n");
    }

    #[tokio::test]
    async fn reports_non_zero_exit() {
        let mut cmd = tokio_command("sh");
        cmd.arg("-c").arg("echo broken 1>&2; exit 3");
        let out = run_captured(&mut cmd).await.unwrap();
        assert!(!out.success());
        assert_eq!(out.code, Some(3));
        assert_eq!(out.combined.trim(), "broken");
    }

    #[tokio::test]
    async fn missing_program_is_an_io_error() {
        let mut cmd = tokio_command("definitely-not-a-real-binary-nicodl");
        assert!(run_captured(&mut cmd).await.is_err());
    }

    #[test]
    fn probe_reads_first_line() {
        assert_eq!(
            probe("sh", &["-c", "echo; echo tool 1.0; echo more"]).as_deref(),
            Some("tool 1.0")
        );
        assert!(probe("definitely-not-a-real-binary-nicodl", &[]).is_none());
    }
}
