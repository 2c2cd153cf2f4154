//! Loading plain-text corpus files into documents.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use medibot_rag::Document;
use tracing::{debug, warn};
use walkdir::WalkDir;

const EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// Form feed, the page separator emitted by `pdftotext` and similar tools.
const PAGE_BREAK: char = '\x0c';

/// Collect corpus files under `paths`, sorted so builds are reproducible.
///
/// A path that does not exist or cannot be read is an error.
pub fn list_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root) {
            let entry =
                entry.with_context(|| format!("failed to read corpus path {}", root.display()))?;
            if entry.file_type().is_file() && is_corpus_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_corpus_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Read one file into documents.
///
/// A file without page breaks becomes one document whose id is its path. A
/// file with form feeds becomes one document per non-empty page, with ids
/// `{path}#page={n}` and `page` metadata (1-based).
pub fn load_file(path: &Path) -> Result<Vec<Document>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let source = path.display().to_string();

    if !text.contains(PAGE_BREAK) {
        return Ok(vec![Document::new(source.clone(), text).with_metadata("source", source)]);
    }

    let documents: Vec<Document> = text
        .split(PAGE_BREAK)
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| {
            let number = i + 1;
            Document::new(format!("{source}#page={number}"), page)
                .with_metadata("source", source.clone())
                .with_metadata("page", number.to_string())
        })
        .collect();
    debug!(path = %source, pages = documents.len(), "split file into pages");
    Ok(documents)
}

/// Load every corpus file under `paths`.
pub fn load(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let files = list_files(paths)?;
    if files.is_empty() {
        warn!(?paths, "no .txt or .md files found");
    }
    let mut documents = Vec::new();
    for file in &files {
        documents.extend(load_file(file)?);
    }
    Ok(documents)
}
