//! Output filename rules.

use std::path::{Path, PathBuf};

const EXTENSION: &str = ".mp4";

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(path),
    }
}

/// Make `title` safe to use as a single file name component.
pub fn sanitize_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.trim().trim_end_matches('.').trim_end().to_owned()
}

/// `<title>.mp4`, or `<id>.mp4` when the title is empty, under `output_dir`.
pub fn default_output(title: &str, id: &str, output_dir: Option<&Path>) -> PathBuf {
    let mut stem = sanitize_file_name(title);
    if stem.is_empty() {
        stem = sanitize_file_name(id);
    }
    let name = format!("{stem}{EXTENSION}");
    match output_dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
