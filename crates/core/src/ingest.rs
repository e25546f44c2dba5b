use crate::chunking::{build_chunks, make_chunk, ChunkingConfig};
use crate::extractor::{DocumentExtractor, DocxExtractor, LoadedDocument};
use crate::{DocumentChunk, IngestError, IngestionOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestSource {
    DocxDirectory(PathBuf),
    DelimitedFile(PathBuf),
}

pub fn load_chunks(
    source: &IngestSource,
    options: &IngestionOptions,
) -> Result<Vec<DocumentChunk>, IngestError> {
    match source {
        IngestSource::DocxDirectory(dir) => load_docx_directory(dir, options),
        IngestSource::DelimitedFile(path) => load_delimited_file(path, &options.delimiter),
    }
}

pub fn discover_docx_files(folder: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if !folder.exists() {
        warn!(path = %folder.display(), "directory does not exist");
        return Err(IngestError::MissingDirectory(folder.display().to_string()));
    }

    if !folder.is_dir() {
        warn!(path = %folder.display(), "the specified path is not a directory");
        return Err(IngestError::NotADirectory(folder.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|error| IngestError::Io(error.into()))?;

        let is_docx = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));

        if !is_docx {
            warn!(file = %entry.path().display(), "non-docx file found");
            return Err(IngestError::UnsupportedFile(entry.path().display().to_string()));
        }

        files.push(entry.path().to_path_buf());
    }

    files.sort_unstable();
    info!(folder = %folder.display(), files = files.len(), "listed docx files");
    Ok(files)
}

pub fn load_docx_directory(
    folder: &Path,
    options: &IngestionOptions,
) -> Result<Vec<DocumentChunk>, IngestError> {
    load_directory_with(&DocxExtractor, folder, options)
}

pub fn load_directory_with<X: DocumentExtractor>(
    extractor: &X,
    folder: &Path,
    options: &IngestionOptions,
) -> Result<Vec<DocumentChunk>, IngestError> {
    let files = discover_docx_files(folder)?;

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no docx files found in {}",
            folder.display()
        )));
    }

    let documents = files
        .iter()
        .map(|path| extractor.extract_text(path))
        .collect::<Result<Vec<LoadedDocument>, _>>()?;

    chunk_documents(&documents, ChunkingConfig::from(options))
}

pub fn chunk_documents(
    documents: &[LoadedDocument],
    config: ChunkingConfig,
) -> Result<Vec<DocumentChunk>, IngestError> {
    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for document in documents {
        let (document_chunks, next_cursor) =
            build_chunks(Some(&document.source_path), &document.text, config, cursor)?;
        cursor = next_cursor;
        chunks.extend(document_chunks);
    }

    Ok(chunks)
}

pub fn load_delimited_file(path: &Path, delimiter: &str) -> Result<Vec<DocumentChunk>, IngestError> {
    if delimiter.is_empty() {
        return Err(IngestError::InvalidArgument(
            "chunk delimiter must not be empty".to_string(),
        ));
    }

    let content = fs::read_to_string(path)?;
    let source = path.to_string_lossy().to_string();
    let chunks = split_delimited(&content, delimiter)
        .into_iter()
        .enumerate()
        .map(|(index, text)| make_chunk(Some(&source), index as u64, text))
        .collect::<Vec<_>>();

    info!(path = %path.display(), chunks = chunks.len(), "split delimited file");
    Ok(chunks)
}

pub fn split_delimited(content: &str, delimiter: &str) -> Vec<String> {
    content
        .replace('\n', "")
        .split(delimiter)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}
