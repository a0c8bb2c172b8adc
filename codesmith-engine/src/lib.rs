//! # codesmith engine
//!
//! Infrastructure for the staged coding pipeline:
//! - **Provider**: trait-based client for the hosted chat-completions endpoint
//! - **Plan**: best-effort parsing of the architect's JSON roadmap
//! - **Sandbox**: child-process execution with captured output and a timeout
//! - **Session**: flat JSON store of prior exchanges plus a knowledge scalar
//! - **Evolution log**: append-only advice file, one timestamped line per run

pub mod error;
pub mod evolve;
pub mod plan;
pub mod provider;
pub mod sandbox;
pub mod session;

pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use evolve::EvolutionLog;
pub use plan::{Plan, FALLBACK_CONSTRAINT};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, GitHubModelsProvider, LlmProvider,
    ProviderConfig, ProviderError, Role, Usage, UsageTracker, DEFAULT_ENDPOINT, TOKEN_ENV_VAR,
};
pub use sandbox::{
    ExecMode, Sandbox, SandboxConfig, SandboxRun, Verdict, DEFAULT_TIMEOUT,
};
pub use session::{
    Exchange, FileBackend, MemoryBackend, SessionBackend, SessionLog, SessionStore,
    INITIAL_KNOWLEDGE, KNOWLEDGE_STEP,
};
