use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Capability for retrieving a remote image. The pipeline does not care how
/// the bytes travel; any transport that deposits a file named after the
/// remote resource into `dest_dir` will do.
pub trait ImageFetcher {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Move a file into place, idempotently.
///
/// A missing source with an existing destination means a prior run already
/// completed this move and is treated as success. A missing source with a
/// missing destination is a genuine failure: the document references a file
/// that cannot be located anywhere.
pub fn move_local(src: &Path, dest: &Path) -> Result<()> {
    if !src.exists() {
        if dest.exists() {
            return Ok(());
        }
        bail!(
            "image source not found: {} (destination {} is also absent)",
            src.display(),
            dest.display()
        );
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::copy(src, dest).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dest.display())
    })?;
    fs::remove_file(src).with_context(|| format!("failed to remove {}", src.display()))?;
    Ok(())
}

/// Fetch `url` into `dest_dir`, expecting the deposited file to be named
/// `expected_name`. A destination that already exists is a no-op, so
/// re-runs after a partial prior execution are safe.
pub fn fetch_remote(
    fetcher: &dyn ImageFetcher,
    url: &str,
    dest_dir: &Path,
    expected_name: &str,
) -> Result<()> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("failed to create {}", dest_dir.display()))?;
    let expected = dest_dir.join(expected_name);
    if expected.exists() {
        return Ok(());
    }

    let written = fetcher
        .fetch(url, dest_dir)
        .with_context(|| format!("failed to fetch {url}"))?;
    let written_name = written
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");
    if written_name != expected_name {
        bail!(
            "fetched {url} as {written_name} but the document expects {expected_name}"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;
    use std::path::{Path, PathBuf};

    use anyhow::Result;
    use tempfile::tempdir;

    use super::{ImageFetcher, fetch_remote, move_local};

    struct StubFetcher {
        filename: &'static str,
        calls: Cell<usize>,
    }

    impl StubFetcher {
        fn new(filename: &'static str) -> Self {
            Self {
                filename,
                calls: Cell::new(0),
            }
        }
    }

    impl ImageFetcher for StubFetcher {
        fn fetch(&self, _url: &str, dest_dir: &Path) -> Result<PathBuf> {
            self.calls.set(self.calls.get() + 1);
            let path = dest_dir.join(self.filename);
            fs::write(&path, b"png bytes")?;
            Ok(path)
        }
    }

    #[test]
    fn move_local_relocates_and_removes_source() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("staging").join("pic.png");
        let dest = temp.path().join("post").join("images").join("pic.png");
        fs::create_dir_all(src.parent().unwrap()).expect("staging dir");
        fs::write(&src, b"bytes").expect("write source");

        move_local(&src, &dest).expect("move");
        assert!(!src.exists());
        assert_eq!(fs::read(&dest).expect("read dest"), b"bytes");
    }

    #[test]
    fn move_local_tolerates_already_completed_move() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("gone.png");
        let dest = temp.path().join("images").join("gone.png");
        fs::create_dir_all(dest.parent().unwrap()).expect("images dir");
        fs::write(&dest, b"bytes").expect("write dest");

        move_local(&src, &dest).expect("second run is a no-op");
        assert!(dest.exists());
    }

    #[test]
    fn move_local_fails_when_neither_side_exists() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("missing.png");
        let dest = temp.path().join("images").join("missing.png");

        let error = move_local(&src, &dest).expect_err("must fail");
        assert!(error.to_string().contains("image source not found"));
    }

    #[test]
    fn fetch_remote_deposits_expected_file() {
        let temp = tempdir().expect("tempdir");
        let dest_dir = temp.path().join("images");
        let fetcher = StubFetcher::new("cat.png");

        fetch_remote(&fetcher, "http://x/cat.png", &dest_dir, "cat.png").expect("fetch");
        assert!(dest_dir.join("cat.png").exists());
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn fetch_remote_skips_existing_destination() {
        let temp = tempdir().expect("tempdir");
        let dest_dir = temp.path().join("images");
        fs::create_dir_all(&dest_dir).expect("images dir");
        fs::write(dest_dir.join("cat.png"), b"already here").expect("write dest");
        let fetcher = StubFetcher::new("cat.png");

        fetch_remote(&fetcher, "http://x/cat.png", &dest_dir, "cat.png").expect("fetch");
        assert_eq!(fetcher.calls.get(), 0);
        assert_eq!(
            fs::read(dest_dir.join("cat.png")).expect("read"),
            b"already here"
        );
    }

    #[test]
    fn fetch_remote_rejects_naming_mismatch() {
        let temp = tempdir().expect("tempdir");
        let dest_dir = temp.path().join("images");
        let fetcher = StubFetcher::new("renamed.png");

        let error = fetch_remote(&fetcher, "http://x/cat.png", &dest_dir, "cat.png")
            .expect_err("must fail");
        assert!(error.to_string().contains("expects cat.png"));
    }
}
