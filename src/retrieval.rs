// src/retrieval.rs — Knowledge-base lookup used by the LLM-backed agents
//
// The workflow never calls this itself. Failures cross the boundary as
// plain strings so a broken knowledge base degrades a prompt instead of
// failing a run.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One retrieved passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub source: Option<String>,
}

pub trait Retriever: Send + Sync {
    /// Passages relevant to `query`, best first.
    fn retrieve(&self, query: &str) -> Result<Vec<Document>, String>;

    /// A short textual answer assembled from the knowledge base.
    fn search(&self, query: &str) -> Result<String, String>;
}

/// Term-overlap retriever over documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRetriever {
    documents: Vec<Document>,
    top_k: usize,
}

impl InMemoryRetriever {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            top_k: 3,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Load every `.md` / `.txt` file directly under `dir`.
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut documents = Vec::new();
        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("md") | Some("txt")
                )
            })
            .collect();
        entries.sort();
        for path in entries {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                continue;
            }
            documents.push(Document {
                content,
                source: Some(path.display().to_string()),
            });
        }
        tracing::debug!("Loaded {} reference document(s) from {}", documents.len(), dir.display());
        Ok(Self::new(documents))
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(|t| t.to_lowercase())
        .collect()
}

impl Retriever for InMemoryRetriever {
    fn retrieve(&self, query: &str) -> Result<Vec<Document>, String> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Err("query has no searchable terms".into());
        }

        let mut scored: Vec<(usize, usize)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(idx, doc)| (idx, terms(&doc.content).intersection(&query_terms).count()))
            .filter(|(_, hits)| *hits > 0)
            .collect();
        // Stable sort keeps load order among equal hits
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(idx, _)| self.documents[idx].clone())
            .collect())
    }

    fn search(&self, query: &str) -> Result<String, String> {
        let docs = self.retrieve(query)?;
        if docs.is_empty() {
            return Ok("No relevant documents found.".into());
        }
        Ok(docs
            .iter()
            .enumerate()
            .map(|(i, d)| match &d.source {
                Some(src) => format!("[{}] {} (source: {})", i + 1, d.content.trim(), src),
                None => format!("[{}] {}", i + 1, d.content.trim()),
            })
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
