use std::path::{Path, PathBuf};

/// Output filename split into base and extension.
///
/// Segment 0 keeps the original name; segment `i > 0` is written to
/// `<base>_<i><ext>`, so `show.mp4` becomes `show.mp4`, `show_1.mp4`,
/// `show_2.mp4`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    base: String,
    /// Includes the leading dot, empty when the name has none.
    extension: String,
}

impl OutputSpec {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_string_lossy();
        let name_start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
        match path[name_start..].rfind('.') {
            Some(dot) => {
                let dot = name_start + dot;
                Self {
                    base: path[..dot].to_owned(),
                    extension: path[dot..].to_owned(),
                }
            }
            None => Self {
                base: path.into_owned(),
                extension: String::new(),
            },
        }
    }

    pub fn segment_path(&self, index: usize) -> PathBuf {
        if index == 0 {
            PathBuf::from(format!("{}{}", self.base, self.extension))
        } else {
            PathBuf::from(format!("{}_{}{}", self.base, index, self.extension))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_segments_after_the_first() {
        let spec = OutputSpec::from_path("show.mp4");
        assert_eq!(spec.segment_path(0), PathBuf::from("show.mp4"));
        assert_eq!(spec.segment_path(1), PathBuf::from("show_1.mp4"));
        assert_eq!(spec.segment_path(2), PathBuf::from("show_2.mp4"));
    }

    #[test]
    fn splits_on_the_last_dot_of_the_file_name() {
        let spec = OutputSpec::from_path("out/v1.2/night.show.flv");
        assert_eq!(spec.segment_path(1), PathBuf::from("out/v1.2/night.show_1.flv"));

        let spec = OutputSpec::from_path("out/v1.2/raw");
        assert_eq!(spec.segment_path(0), PathBuf::from("out/v1.2/raw"));
        assert_eq!(spec.segment_path(3), PathBuf::from("out/v1.2/raw_3"));
    }
}
