//! Overlapping text chunking, document reading (plain text and PDF), and file discovery.

use rag_types::PipelineError;
use std::path::{Path, PathBuf};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 100;

/// Split `text` into chunks of at most `chunk_size` characters, consecutive chunks
/// sharing `overlap` characters.
///
/// A chunk that does not reach the end of the text is cut right after the last `.`
/// inside its trailing `overlap` window, when there is one. Chunks are trimmed and
/// blank ones dropped.
///
/// Chunking stops at the first chunk that reaches the end, so there is no trailing
/// chunk made only of the previous chunk's overlap (25 chars at size 10, overlap 2
/// gives 3 chunks, not 4).
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, PipelineError> {
    if chunk_size <= overlap {
        return Err(PipelineError::BadRequest(format!(
            "chunk size ({}) must be larger than overlap ({})",
            chunk_size, overlap
        )));
    }
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < len {
        let mut end = start + chunk_size;
        if end < len {
            if let Some(p) = chars[end - overlap..end].iter().rposition(|c| *c == '.') {
                end = end - overlap + p + 1;
            }
        }
        let piece: String = chars[start..end.min(len)].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        if end >= len {
            break;
        }
        // An early period can pull `end` back far enough that the overlap would not advance.
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }
    Ok(chunks)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Text of a document: PDFs through `pdf-extract`, anything else read as UTF-8.
pub async fn read_document(path: &Path) -> Result<String, PipelineError> {
    if !is_pdf(path) {
        return Ok(tokio::fs::read_to_string(path).await?);
    }
    let bytes = tokio::fs::read(path).await?;
    // The parser is synchronous and can panic on malformed files; a panic surfaces as a join error.
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| PipelineError::Other(format!("{}: {}", path.display(), e)))?
    .map_err(|e| PipelineError::Other(format!("{}: {}", path.display(), e)))
}

/// Read a document and chunk it with the default sizes.
pub async fn read_and_chunk_file(path: &Path) -> Result<Vec<String>, PipelineError> {
    let text = read_document(path).await?;
    chunk_text(&text, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP)
}

/// Files directly under `dir` with one of `extensions`, sorted by path.
pub async fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, PipelineError> {
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Err(PipelineError::Config(format!(
            "Text files directory not found at {}",
            dir.display()
        )));
    }
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if matches && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Outcome of ingesting a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// `(file, chunks added)` for every file that produced content.
    pub files: Vec<(PathBuf, usize)>,
    /// Files that could not be read or yielded nothing.
    pub skipped: Vec<PathBuf>,
}

impl IngestReport {
    pub fn chunks(&self) -> usize {
        self.files.iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.skipped.is_empty()
    }
}

/// Single-page PDF showing `text` in Helvetica.
#[cfg(test)]
pub(crate) fn pdf_with_text(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, obj).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}
