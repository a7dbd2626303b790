use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use crate::runtime::STATE_DIR_NAME;

/// Recursively collect the documents to process: every file under the
/// search root whose extension matches one of the configured markdown
/// extensions, sorted by path so processing order is deterministic. The
/// tool's own state directory is never a candidate.
pub fn discover_documents(search_root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !search_root.is_dir() {
        bail!(
            "search root does not exist or is not a directory: {}",
            search_root.display()
        );
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(search_root).follow_links(false) {
        let entry =
            entry.with_context(|| format!("failed to walk {}", search_root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path
            .components()
            .any(|component| component.as_os_str() == STATE_DIR_NAME)
        {
            continue;
        }
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        if !extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(extension))
        {
            continue;
        }
        documents.push(path.to_path_buf());
    }
    documents.sort();
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::discover_documents;

    fn markdown_extensions() -> Vec<String> {
        vec!["md".to_string(), "markdown".to_string()]
    }

    #[test]
    fn finds_markdown_files_recursively_in_order() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("nested/deeper")).expect("dirs");
        fs::write(temp.path().join("b.md"), "b").expect("write");
        fs::write(temp.path().join("a.markdown"), "a").expect("write");
        fs::write(temp.path().join("nested/deeper/c.md"), "c").expect("write");
        fs::write(temp.path().join("notes.txt"), "not a document").expect("write");
        fs::write(temp.path().join("image.png"), "binary").expect("write");

        let documents =
            discover_documents(temp.path(), &markdown_extensions()).expect("discover");
        assert_eq!(
            documents,
            vec![
                temp.path().join("a.markdown"),
                temp.path().join("b.md"),
                temp.path().join("nested/deeper/c.md"),
            ]
        );
    }

    #[test]
    fn skips_the_state_directory() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join(".imgtool")).expect("state dir");
        fs::write(temp.path().join(".imgtool/readme.md"), "internal").expect("write");
        fs::write(temp.path().join("post.md"), "post").expect("write");

        let documents =
            discover_documents(temp.path(), &markdown_extensions()).expect("discover");
        assert_eq!(documents, vec![temp.path().join("post.md")]);
    }

    #[test]
    fn missing_search_root_fails() {
        let temp = tempdir().expect("tempdir");
        let error = discover_documents(&temp.path().join("absent"), &markdown_extensions())
            .expect_err("must fail");
        assert!(error.to_string().contains("search root does not exist"));
    }

    #[test]
    fn honors_custom_extensions() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("post.mdown"), "post").expect("write");
        fs::write(temp.path().join("other.md"), "other").expect("write");

        let documents =
            discover_documents(temp.path(), &["mdown".to_string()]).expect("discover");
        assert_eq!(documents, vec![temp.path().join("post.mdown")]);
    }
}
