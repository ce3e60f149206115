use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CrawlError;

pub const OUTPUT_EXTENSION: &str = ".txt";

/// `/` becomes `_` and `.txt` is appended. Nothing else is rewritten.
pub fn sanitize_filename(title: &str) -> String {
    let mut name = title.replace('/', "_");
    name.push_str(OUTPUT_EXTENSION);
    name
}

pub fn output_path(output_dir: &Path, title: &str) -> PathBuf {
    output_dir.join(sanitize_filename(title))
}

/// Create or truncate the title's file and write `text` in one call.
pub fn write_page_text(output_dir: &Path, title: &str, text: &str) -> Result<PathBuf, CrawlError> {
    let path = output_path(output_dir, title);
    fs::write(&path, text).map_err(|source| CrawlError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

pub fn ensure_output_dir(output_dir: &Path) -> Result<(), CrawlError> {
    if output_dir.as_os_str().is_empty() || output_dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(output_dir).map_err(|source| CrawlError::Io {
        path: output_dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{ensure_output_dir, output_path, sanitize_filename, write_page_text};
    use crate::error::CrawlError;

    #[test]
    fn sanitize_replaces_every_slash() {
        assert_eq!(sanitize_filename("Rapi"), "Rapi.txt");
        assert_eq!(sanitize_filename("Anis/Sparkling Summer"), "Anis_Sparkling Summer.txt");
        assert_eq!(sanitize_filename("a/b/c/"), "a_b_c_.txt");
    }

    #[test]
    fn sanitize_leaves_other_characters_alone() {
        assert_eq!(sanitize_filename("Who: Rapi?"), "Who: Rapi?.txt");
        assert_eq!(sanitize_filename("Modernia.txt"), "Modernia.txt.txt");
    }

    #[test]
    fn write_creates_then_truncates() {
        let temp = tempdir().expect("tempdir");
        let path = write_page_text(temp.path(), "Skill/Burst", "first version, longer")
            .expect("first write");
        assert_eq!(path, temp.path().join("Skill_Burst.txt"));
        assert_eq!(path, output_path(temp.path(), "Skill/Burst"));

        write_page_text(temp.path(), "Skill/Burst", "second").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
    }

    #[test]
    fn write_failure_reports_path() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("missing");
        match write_page_text(&missing, "Rapi", "text") {
            Err(CrawlError::Io { path, .. }) => assert_eq!(path, missing.join("Rapi.txt")),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn ensure_output_dir_creates_nested_dirs() {
        let temp = tempdir().expect("tempdir");
        let nested = temp.path().join("pages").join("nikke");
        ensure_output_dir(&nested).expect("create");
        assert!(nested.is_dir());
        ensure_output_dir(&nested).expect("existing dir is fine");
    }
}
