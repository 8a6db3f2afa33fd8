//! Knowledge Base Loader
//!
//! Loads question/answer entries from YAML/JSON files.
//!
//! ```yaml
//! version: "1.0"
//! entries:
//!   - id: biblioteca_horario
//!     questions: ["¿Cuál es el horario de la biblioteca?", "horario biblioteca"]
//!     answer: "La biblioteca abre de lunes a viernes de 8:00 a 21:00."
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::RagError;

/// One answer and the questions that lead to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeEntry {
    /// Unique entry ID
    pub id: String,
    /// Alternative phrasings of the question
    pub questions: Vec<String>,
    /// Answer text (may start with a control marker)
    pub answer: String,
    /// Category (e.g. "horarios", "servicios")
    #[serde(default)]
    pub category: Option<String>,
}

/// Knowledge base file format
#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeFile {
    /// Version for format compatibility
    #[serde(default)]
    pub version: Option<String>,
    /// List of entries
    pub entries: Vec<KnowledgeEntry>,
}

/// Knowledge file loader
pub struct KnowledgeLoader;

impl KnowledgeLoader {
    /// Load every YAML/JSON file in a directory
    ///
    /// Files that fail to parse are logged and skipped.
    pub fn load_directory(knowledge_dir: &Path) -> Result<Vec<KnowledgeEntry>, RagError> {
        if !knowledge_dir.exists() {
            tracing::warn!(
                path = %knowledge_dir.display(),
                "Knowledge directory does not exist"
            );
            return Ok(Vec::new());
        }

        let mut paths: Vec<_> = std::fs::read_dir(knowledge_dir)
            .map_err(|e| RagError::Index(format!("Failed to read directory: {}", e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml" | "yml" | "json")
                )
            })
            .collect();
        paths.sort();

        let mut entries = Vec::new();
        for path in paths {
            match Self::load_file(&path) {
                Ok(loaded) => {
                    tracing::info!(
                        file = %path.display(),
                        entries = loaded.len(),
                        "Loaded knowledge file"
                    );
                    entries.extend(loaded);
                },
                Err(e) => {
                    tracing::error!(
                        file = %path.display(),
                        error = %e,
                        "Failed to load knowledge file"
                    );
                },
            }
        }

        Ok(entries)
    }

    /// Load a single knowledge file
    pub fn load_file(path: &Path) -> Result<Vec<KnowledgeEntry>, RagError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Index(format!("Failed to read {}: {}", path.display(), e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let knowledge: KnowledgeFile = match extension {
            "json" => serde_json::from_str(&content)
                .map_err(|e| RagError::Index(format!("JSON parse error: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| RagError::Index(format!("YAML parse error: {}", e)))?,
            _ => {
                return Err(RagError::Index(format!(
                    "Unsupported file type: {}",
                    extension
                )))
            },
        };

        if let Some(entry) = knowledge.entries.iter().find(|e| e.questions.is_empty()) {
            return Err(RagError::Index(format!(
                "Entry '{}' has no questions",
                entry.id
            )));
        }

        Ok(knowledge.entries)
    }

    /// Load a file or every file in a directory
    pub fn load_path(path: &Path) -> Result<Vec<KnowledgeEntry>, RagError> {
        if path.is_dir() {
            Self::load_directory(path)
        } else {
            Self::load_file(path)
        }
    }
}
