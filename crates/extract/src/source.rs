use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplies the raw text of a document given its identifier.
pub trait DocumentSource: Send + Sync {
    fn fetch(&self, id: &str) -> Result<String, DocumentError>;

    /// Identifiers of every document the source can supply.
    fn list(&self) -> Result<Vec<String>, DocumentError>;
}

const PAYSTUB_ID_FORMAT: &str = "NFC_Paystub_%Y_%m_%d";

/// `2024-02-09` → `NFC_Paystub_2024_02_09`
pub fn paystub_identifier(pay_date: NaiveDate) -> String {
    pay_date.format(PAYSTUB_ID_FORMAT).to_string()
}

pub fn parse_paystub_identifier(id: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(id, PAYSTUB_ID_FORMAT).ok()
}

// ── In-memory source (tests, piping) ──────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockDocumentSource {
    pub documents: BTreeMap<String, String>,
}

impl MockDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.documents.insert(id.into(), text.into());
        self
    }
}

impl DocumentSource for MockDocumentSource {
    fn fetch(&self, id: &str) -> Result<String, DocumentError> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<String>, DocumentError> {
        Ok(self.documents.keys().cloned().collect())
    }
}

// ── Directory of text exports ─────────────────────────────────────────────────

/// Documents are files `<dir>/<id>.<extension>` holding extracted text.
#[derive(Debug, Clone)]
pub struct DirectoryDocumentSource {
    dir: PathBuf,
    extension: String,
}

impl DirectoryDocumentSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: "txt".to_string(),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{}", self.extension))
    }
}

impl DocumentSource for DirectoryDocumentSource {
    fn fetch(&self, id: &str) -> Result<String, DocumentError> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(DocumentError::NotFound(path.display().to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    fn list(&self) -> Result<Vec<String>, DocumentError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
