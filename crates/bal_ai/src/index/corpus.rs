use std::fs;
use std::path::Path;

use bal_core::error::AppError;

use super::model::CorpusDocument;

/// Read every `*.txt` file directly inside `dir`, ordered by file name.
pub fn load_corpus(dir: &Path) -> Result<Vec<CorpusDocument>, AppError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::new("INDEX_CORPUS_FAILED", "Failed to read corpus directory")
            .with_details(format!("path={}; err={}", dir.display(), e))
    })?;

    let mut paths = Vec::new();
    for ent in entries {
        let ent = ent.map_err(|e| {
            AppError::new("INDEX_CORPUS_FAILED", "Failed to list corpus directory")
                .with_details(format!("path={}; err={}", dir.display(), e))
        })?;
        let path = ent.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("txt") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|e| {
            AppError::new("INDEX_CORPUS_FAILED", "Failed to read corpus document")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        docs.push(CorpusDocument { source, text });
    }

    tracing::info!(path = %dir.display(), documents = docs.len(), "loaded corpus");
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_only_txt_files_in_name_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("a.txt"), "first").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let docs = load_corpus(dir.path()).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(docs[0].text, "first");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_corpus(&dir.path().join("absent")).unwrap_err();
        assert_eq!(err.code, "INDEX_CORPUS_FAILED");
    }
}
