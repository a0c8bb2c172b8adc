//! # Session store
//!
//! Persistent conversation state: a flat JSON document holding prior
//! question/answer pairs plus one knowledge scalar. The document is read
//! once at startup, appended to in memory after each exchange, and
//! rewritten wholesale on save. On-disk field names (`sessions`,
//! `global_knowledge`, `q`, `a`) are part of the file format.

use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Fixed amount the knowledge scalar advances per completed run
pub const KNOWLEDGE_STEP: f64 = 0.1;

/// Knowledge scalar of a fresh store
pub const INITIAL_KNOWLEDGE: f64 = 1.0;

/// One question/answer pair. Duplicates and empty fields are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    #[serde(rename = "q")]
    pub question: String,
    #[serde(rename = "a")]
    pub answer: String,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// The whole persisted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub sessions: Vec<Exchange>,
    pub global_knowledge: f64,
}

impl Default for SessionLog {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            global_knowledge: INITIAL_KNOWLEDGE,
        }
    }
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one exchange
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.sessions.push(Exchange::new(question, answer));
    }

    /// Advance the knowledge scalar by the fixed step, returning the new value.
    /// Monotonically increasing; no upper bound.
    pub fn advance_knowledge(&mut self) -> f64 {
        self.global_knowledge += KNOWLEDGE_STEP;
        self.global_knowledge
    }

    /// The last `n` exchanges, oldest first
    pub fn recent(&self, n: usize) -> &[Exchange] {
        let start = self.sessions.len().saturating_sub(n);
        &self.sessions[start..]
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Format the last `n` exchanges for use as planning context
    pub fn context_snippet(&self, n: usize) -> Option<String> {
        let recent = self.recent(n);
        if recent.is_empty() {
            return None;
        }
        let lines: Vec<String> = recent
            .iter()
            .map(|e| format!("Q: {}\nA: {}", e.question, e.answer))
            .collect();
        Some(lines.join("\n\n"))
    }
}

// =============================================================================
// Session Backend Trait
// =============================================================================

/// Trait for session storage backends
pub trait SessionBackend: Send + Sync {
    /// Load the whole document; a missing store yields a fresh log
    fn load(&self) -> Result<SessionLog>;

    /// Rewrite the whole document
    fn save(&self, log: &SessionLog) -> Result<()>;

    /// Get backend name for debugging
    fn backend_name(&self) -> &'static str;
}

// =============================================================================
// File-based Backend (single JSON document)
// =============================================================================

/// File-backed session storage: one JSON document, rewritten wholesale
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionBackend for FileBackend {
    fn load(&self) -> Result<SessionLog> {
        if !self.path.exists() {
            return Ok(SessionLog::default());
        }

        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            error::io_error(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        serde_json::from_str(&json).map_err(|e| {
            error::parse_error(format!(
                "failed to parse session store {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, log: &SessionLog) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    error::io_error(format!("failed to create session dir: {}", e))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(log)
            .map_err(|e| error::serialization_error(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| {
            error::io_error(format!("failed to write {}: {}", self.path.display(), e))
        })?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

// =============================================================================
// In-Memory Backend (for testing)
// =============================================================================

/// In-memory session storage (useful for testing)
#[derive(Default)]
pub struct MemoryBackend {
    log: RwLock<SessionLog>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionBackend for MemoryBackend {
    fn load(&self) -> Result<SessionLog> {
        Ok(self.log.read().unwrap().clone())
    }

    fn save(&self, log: &SessionLog) -> Result<()> {
        *self.log.write().unwrap() = log.clone();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// =============================================================================
// SessionStore (wrapper with backend)
// =============================================================================

/// Owns the in-memory log plus the backend it round-trips through
pub struct SessionStore {
    backend: Box<dyn SessionBackend>,
    log: SessionLog,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("backend", &self.backend.backend_name())
            .field("log", &self.log)
            .finish()
    }
}

impl SessionStore {
    /// Open a store with the given backend, loading the current document
    pub fn with_backend(backend: impl SessionBackend + 'static) -> Result<Self> {
        let log = backend.load()?;
        Ok(Self {
            backend: Box::new(backend),
            log,
        })
    }

    /// Open a file-backed store (the default)
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_backend(FileBackend::new(path))
    }

    /// Open an in-memory store
    pub fn in_memory() -> Self {
        Self::with_backend(MemoryBackend::new()).expect("memory backend load cannot fail")
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn knowledge(&self) -> f64 {
        self.log.global_knowledge
    }

    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.log.record(question, answer);
    }

    pub fn advance_knowledge(&mut self) -> f64 {
        self.log.advance_knowledge()
    }

    pub fn context_snippet(&self, n: usize) -> Option<String> {
        self.log.context_snippet(n)
    }

    /// Rewrite the backing document with the current in-memory log
    pub fn save(&self) -> Result<()> {
        self.backend.save(&self.log)
    }
}
