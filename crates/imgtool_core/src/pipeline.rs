use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::discover::discover_documents;
use crate::extract::{ImageReference, extract_references, render_reference};
use crate::relocate::{ImageFetcher, fetch_remote, move_local};
use crate::resolve::{
    IMAGES_DIR, RelocationAction, basename, move_source_path, plan_relocation,
};

/// Suffix of the sibling temporary file a document is rewritten into. An
/// orphaned temporary whose original is gone is adopted as the real content
/// on the next run.
pub const TMP_SUFFIX: &str = ".imgtool-tmp";

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub changed: bool,
    pub moved: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub malformed: usize,
}

impl DocumentReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            changed: false,
            moved: 0,
            fetched: 0,
            skipped: 0,
            malformed: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub changed: usize,
    pub documents: Vec<DocumentReport>,
    pub failures: Vec<DocumentFailure>,
}

/// One planned relocation from a dry run; nothing on disk has moved.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedReference {
    pub document: PathBuf,
    pub line: usize,
    pub syntax: &'static str,
    pub locator: Option<String>,
    pub action: &'static str,
    pub destination: Option<String>,
}

/// Process every discovered document strictly sequentially. A failing
/// document is recorded and does not halt the batch; re-runs are safe
/// because relocation is idempotent.
pub fn process_tree(
    search_root: &Path,
    staging_root: &Path,
    extensions: &[String],
    fetcher: &dyn ImageFetcher,
) -> Result<BatchReport> {
    let documents = discover_documents(search_root, extensions)?;
    let mut report = BatchReport::default();
    for document in documents {
        report.processed += 1;
        match process_document(&document, staging_root, fetcher) {
            Ok(document_report) => {
                if document_report.changed {
                    report.changed += 1;
                }
                report.documents.push(document_report);
            }
            Err(error) => report.failures.push(DocumentFailure {
                path: document,
                message: format!("{error:#}"),
            }),
        }
    }
    Ok(report)
}

/// Rewrite one document: stream it line by line into a sibling temporary
/// file, relocating each referenced image and substituting the new relative
/// path, then commit atomically if anything changed.
///
/// On error the temporary file is left in place for inspection and the
/// original document is untouched.
pub fn process_document(
    path: &Path,
    staging_root: &Path,
    fetcher: &dyn ImageFetcher,
) -> Result<DocumentReport> {
    let document_dir = document_dir(path);
    let tmp_path = tmp_path_for(path);
    adopt_orphaned_tmp(path, &tmp_path)?;

    let input =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let output = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    let mut writer = BufWriter::new(output);
    let mut report = DocumentReport::new(path);

    // Lines are processed in document order; a later reference sharing a
    // basename with an earlier one must land deterministically.
    for line in BufReader::new(input).lines() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        let rewritten = rewrite_line(&line, &document_dir, staging_root, fetcher, &mut report)
            .with_context(|| format!("while processing {}", path.display()))?;
        write!(writer, "{rewritten}{LINE_ENDING}")
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", tmp_path.display()))?;
    drop(writer);

    if report.changed {
        fs::remove_file(path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        move_local(&tmp_path, path)?;
    } else {
        fs::remove_file(&tmp_path)
            .with_context(|| format!("failed to discard {}", tmp_path.display()))?;
    }
    Ok(report)
}

/// Dry run over one document: extract and plan, touch nothing.
pub fn scan_document(path: &Path, document_dir: &Path) -> Result<Vec<PlannedReference>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut planned = Vec::new();
    for (index, line) in content.lines().enumerate() {
        for reference in extract_references(line) {
            let entry = match &reference.source_locator {
                Some(locator) => {
                    let plan = plan_relocation(locator, document_dir);
                    PlannedReference {
                        document: path.to_path_buf(),
                        line: index + 1,
                        syntax: reference.syntax.as_str(),
                        locator: Some(locator.clone()),
                        action: plan.action.as_str(),
                        destination: Some(plan.relative_path),
                    }
                }
                None => PlannedReference {
                    document: path.to_path_buf(),
                    line: index + 1,
                    syntax: reference.syntax.as_str(),
                    locator: None,
                    action: "malformed",
                    destination: None,
                },
            };
            planned.push(entry);
        }
    }
    Ok(planned)
}

/// Dry run over the whole tree.
pub fn scan_tree(search_root: &Path, extensions: &[String]) -> Result<Vec<PlannedReference>> {
    let mut planned = Vec::new();
    for document in discover_documents(search_root, extensions)? {
        let dir = document_dir(&document);
        planned.extend(scan_document(&document, &dir)?);
    }
    Ok(planned)
}

fn rewrite_line(
    line: &str,
    document_dir: &Path,
    staging_root: &Path,
    fetcher: &dyn ImageFetcher,
    report: &mut DocumentReport,
) -> Result<String> {
    let mut rewritten = line.to_string();
    // Both syntaxes are matched against the original line content; an HTML
    // rewrite does not preempt a markdown match later on the same line.
    for reference in extract_references(line) {
        let Some(locator) = reference.source_locator.clone() else {
            // An image tag with no src is a pre-existing document defect;
            // leave the line alone for that syntax.
            report.malformed += 1;
            continue;
        };
        let plan = plan_relocation(&locator, document_dir);
        match plan.action {
            RelocationAction::Skip => {
                report.skipped += 1;
            }
            RelocationAction::Fetch => {
                let dest_dir = document_dir.join(IMAGES_DIR);
                fetch_remote(fetcher, &locator, &dest_dir, basename(&locator))?;
                report.fetched += 1;
                substitute(&mut rewritten, &reference, &plan.relative_path, report);
            }
            RelocationAction::Move => {
                let source = move_source_path(&locator, staging_root);
                move_local(&source, &plan.absolute_path).with_context(|| {
                    format!("cannot relocate {locator}")
                })?;
                report.moved += 1;
                substitute(&mut rewritten, &reference, &plan.relative_path, report);
            }
        }
    }
    Ok(rewritten)
}

fn substitute(
    line: &mut String,
    reference: &ImageReference,
    relative_path: &str,
    report: &mut DocumentReport,
) {
    let markup = render_reference(reference, relative_path);
    *line = line.replacen(&reference.raw_match, &markup, 1);
    report.changed = true;
}

fn document_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(TMP_SUFFIX);
    PathBuf::from(os)
}

/// Recovery for a crash between the two commit steps: the original is gone
/// but the temporary holds the full rewritten content.
fn adopt_orphaned_tmp(path: &Path, tmp_path: &Path) -> Result<()> {
    if !path.exists() && tmp_path.exists() {
        move_local(tmp_path, path)?;
    }
    Ok(())
}
