use std::path::{Path, PathBuf};

pub const IMAGES_DIR: &str = "images";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationAction {
    Skip,
    Fetch,
    Move,
}

impl RelocationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Fetch => "fetch",
            Self::Move => "move",
        }
    }
}

/// The resolver's decision for one reference: what to do, the locator the
/// document should carry afterwards, and where the image lands on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationPlan {
    pub action: RelocationAction,
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

/// Classify a source locator and decide the relocation.
///
/// Locators already under `images/` are skipped and never relocated twice.
/// Locators starting with `http` (prefix match only, no URL validation) are
/// fetched. Everything else is moved: relative locators resolve against the
/// staging root, a directory distinct from the document's own, where loose
/// images are expected to live; absolute locators are used as-is.
pub fn plan_relocation(locator: &str, document_dir: &Path) -> RelocationPlan {
    let name = basename(locator);
    let relative_path = format!("{IMAGES_DIR}/{name}");
    let absolute_path = document_dir.join(IMAGES_DIR).join(&name);
    let action = if locator.starts_with(&format!("{IMAGES_DIR}/")) {
        RelocationAction::Skip
    } else if locator.starts_with("http") {
        RelocationAction::Fetch
    } else {
        RelocationAction::Move
    };

    RelocationPlan {
        action,
        relative_path,
        absolute_path,
    }
}

/// Resolve a `Move` locator to the file it names: absolute locators stand
/// alone, relative ones are joined to the staging root as written.
pub fn move_source_path(locator: &str, staging_root: &Path) -> PathBuf {
    let path = Path::new(locator);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        staging_root.join(path)
    }
}

/// Final path segment of a locator, with any URL query or fragment
/// stripped. Collisions between different locators sharing a basename are
/// not detected.
pub fn basename(locator: &str) -> &str {
    let trimmed = locator
        .split(['?', '#'])
        .next()
        .unwrap_or(locator);
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{RelocationAction, basename, move_source_path, plan_relocation};

    #[test]
    fn colocated_locator_is_skipped() {
        let plan = plan_relocation("images/cat.png", Path::new("/blog/post"));
        assert_eq!(plan.action, RelocationAction::Skip);
        assert_eq!(plan.relative_path, "images/cat.png");
    }

    #[test]
    fn http_locator_is_fetched() {
        let plan = plan_relocation("http://x/y/cat.png", Path::new("/blog/post"));
        assert_eq!(plan.action, RelocationAction::Fetch);
        assert_eq!(plan.relative_path, "images/cat.png");
        assert_eq!(plan.absolute_path, PathBuf::from("/blog/post/images/cat.png"));
    }

    #[test]
    fn https_locator_is_fetched_by_prefix() {
        let plan = plan_relocation("https://x/cat.png", Path::new("/blog/post"));
        assert_eq!(plan.action, RelocationAction::Fetch);
    }

    #[test]
    fn foreign_locator_is_moved() {
        let plan = plan_relocation("../shared/pic.png", Path::new("/blog/post"));
        assert_eq!(plan.action, RelocationAction::Move);
        assert_eq!(plan.relative_path, "images/pic.png");
    }

    #[test]
    fn basename_strips_path_query_and_fragment() {
        assert_eq!(basename("a/b/c.png"), "c.png");
        assert_eq!(basename("http://x/y/cat.png?v=2"), "cat.png");
        assert_eq!(basename("pic.png#top"), "pic.png");
        assert_eq!(basename("flat.png"), "flat.png");
    }

    #[test]
    fn move_source_joins_staging_root_for_relative_locators() {
        let staging = Path::new("/intake/staging");
        assert_eq!(
            move_source_path("shared/pic.png", staging),
            PathBuf::from("/intake/staging/shared/pic.png")
        );
        assert_eq!(
            move_source_path("/elsewhere/pic.png", staging),
            PathBuf::from("/elsewhere/pic.png")
        );
    }
}
