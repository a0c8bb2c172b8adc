//! Pipeline orchestrator - drives the stages in a fixed sequence
//!
//! One pass per invocation: Planning -> Auditing -> (early exit on audit
//! failure) -> Coding -> Sandboxing -> Evolving -> Done. No retries; no
//! state is revisited. The only state carried across runs lives in the
//! session store and the evolution log.

use crate::agents::{AuditReport, StageAgents, StageModels};
use codesmith_engine::evolve::EvolutionLog;
use codesmith_engine::plan::Plan;
use codesmith_engine::provider::LlmProvider;
use codesmith_engine::sandbox::{Sandbox, SandboxConfig, Verdict};
use codesmith_engine::session::SessionStore;
use codesmith_error::Result;
use std::path::PathBuf;

/// The orchestrator's states, in running order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    Auditing,
    Coding,
    Sandboxing,
    Evolving,
    Done,
}

impl Stage {
    /// The agent persona narrating this stage
    pub fn agent_label(&self) -> &'static str {
        match self {
            Stage::Planning => "architect",
            Stage::Auditing => "auditor",
            Stage::Coding => "coder",
            Stage::Sandboxing => "sandbox",
            Stage::Evolving => "researcher",
            Stage::Done => "pipeline",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Planning => "planning",
            Stage::Auditing => "auditing",
            Stage::Coding => "coding",
            Stage::Sandboxing => "sandboxing",
            Stage::Evolving => "evolving",
            Stage::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// Configuration for one pipeline instance
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path of the JSON session store
    pub session_file: PathBuf,
    /// Path of the append-only evolution log
    pub evolution_file: PathBuf,
    /// How many prior exchanges the architect sees as context
    pub context_exchanges: usize,
    /// Per-stage model identifiers
    pub models: StageModels,
    /// Sandbox runner settings
    pub sandbox: SandboxConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            session_file: PathBuf::from("memory_db.json"),
            evolution_file: PathBuf::from("evolution_log.txt"),
            context_exchanges: 3,
            models: StageModels::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

/// Everything one run produced, for the caller to narrate
#[derive(Debug)]
pub struct RunReport {
    /// Last state the machine reached
    pub stage_reached: Stage,
    pub plan: Plan,
    pub audit: AuditReport,
    pub code: Option<String>,
    pub verdict: Option<Verdict>,
    pub advice: Option<String>,
    /// Knowledge scalar after this run
    pub knowledge: f64,
}

impl RunReport {
    /// True iff the machine finished and the generated code exited 0
    pub fn succeeded(&self) -> bool {
        self.stage_reached == Stage::Done
            && self.verdict.as_ref().map(Verdict::is_success).unwrap_or(false)
    }
}

/// Callback invoked as each stage starts, for live narration
pub type StageHook = Box<dyn Fn(Stage, &str) + Send + Sync>;

/// The sequential five-stage state machine
pub struct Pipeline<P: LlmProvider> {
    agents: StageAgents<P>,
    sandbox: Sandbox,
    session: SessionStore,
    evolution: EvolutionLog,
    config: PipelineConfig,
    hook: Option<StageHook>,
}

impl<P: LlmProvider> Pipeline<P> {
    /// Pipeline with a file-backed session store at the configured path
    pub fn new(provider: P, config: PipelineConfig) -> Result<Self> {
        let session = SessionStore::open_file(&config.session_file)?;
        Ok(Self::with_store(provider, config, session))
    }

    /// Pipeline with a caller-supplied session store
    pub fn with_store(provider: P, config: PipelineConfig, session: SessionStore) -> Self {
        Self {
            agents: StageAgents::new(provider, config.models.clone()),
            sandbox: Sandbox::new(config.sandbox.clone()),
            evolution: EvolutionLog::new(&config.evolution_file),
            session,
            config,
            hook: None,
        }
    }

    /// Install a stage callback for live narration
    pub fn on_stage(mut self, hook: impl Fn(Stage, &str) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn knowledge(&self) -> f64 {
        self.session.knowledge()
    }

    fn notify(&self, stage: Stage, message: &str) {
        if let Some(hook) = &self.hook {
            hook(stage, message);
        }
    }

    /// Run the whole machine once for the given task.
    ///
    /// Inference and storage errors propagate to the caller; sandbox
    /// outcomes (including timeouts and launch failures) do not - they are
    /// classified in the report and routed into the researcher's input.
    pub async fn run(&mut self, task: &str) -> Result<RunReport> {
        self.notify(Stage::Planning, "breaking the task into steps and constraints");
        let context = self.session.context_snippet(self.config.context_exchanges);
        let plan = self.agents.plan(task, context.as_deref()).await?;

        self.notify(Stage::Auditing, "checking the plan's constraints");
        let audit = self.agents.audit(&plan);
        if !audit.passed {
            self.notify(Stage::Done, "audit rejected the plan");
            return Ok(RunReport {
                stage_reached: Stage::Auditing,
                plan,
                audit,
                code: None,
                verdict: None,
                advice: None,
                knowledge: self.session.knowledge(),
            });
        }

        self.notify(Stage::Coding, "turning the plan into source code");
        let code = self.agents.generate(&plan).await?;

        self.notify(Stage::Sandboxing, "executing the generated code");
        let sandbox_run = self.sandbox.run(&code).await?;

        self.notify(Stage::Evolving, "reviewing the outcome");
        let outcome = describe_outcome(&sandbox_run.verdict);
        let advice = self.agents.evolve(&outcome).await?;

        let knowledge = self.session.advance_knowledge();
        self.evolution.append(knowledge, &advice)?;
        self.session.record(task, &code);
        self.session.save()?;

        self.notify(Stage::Done, sandbox_run.verdict.label());
        Ok(RunReport {
            stage_reached: Stage::Done,
            plan,
            audit,
            code: Some(code),
            verdict: Some(sandbox_run.verdict),
            advice: Some(advice),
            knowledge,
        })
    }
}

/// Textual outcome description handed to the researcher stage
fn describe_outcome(verdict: &Verdict) -> String {
    match verdict {
        Verdict::Success { stdout } => {
            format!("Success: the generated program ran cleanly.\nStdout:\n{}", stdout)
        }
        other => format!("Failure ({}): {}", other.label(), other.detail()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use codesmith_engine::provider::ProviderError;
    use std::time::Duration;
    use tempfile::TempDir;

    const PLAN_REPLY: &str = r#"{"logic": "print hello", "math_constraints": "x > 0"}"#;

    fn test_config(dir: &TempDir) -> PipelineConfig {
        PipelineConfig {
            session_file: dir.path().join("memory_db.json"),
            evolution_file: dir.path().join("evolution_log.txt"),
            context_exchanges: 3,
            models: StageModels::default(),
            sandbox: SandboxConfig::default()
                .with_interpreter("sh")
                .with_extension("sh")
                .with_work_dir(dir.path()),
        }
    }

    fn pipeline(dir: &TempDir, replies: Vec<&str>) -> Pipeline<ScriptedProvider> {
        let config = test_config(dir);
        let session = SessionStore::in_memory();
        Pipeline::with_store(ScriptedProvider::new(replies), config, session)
    }

    #[tokio::test]
    async fn test_end_to_end_success() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(
            &dir,
            vec![PLAN_REPLY, "echo hello", "tighten the coder prompt"],
        );

        let report = pipeline.run("print hello").await.unwrap();

        assert!(report.succeeded());
        assert_eq!(report.stage_reached, Stage::Done);
        assert_eq!(report.plan.logic, "print hello");
        assert!(report.audit.passed);
        assert_eq!(
            report.verdict,
            Some(Verdict::Success { stdout: "hello\n".into() })
        );
        assert_eq!(report.advice.as_deref(), Some("tighten the coder prompt"));
        assert!((report.knowledge - 1.1).abs() < 1e-9);

        // One evolution line with the incremented version
        let log = std::fs::read_to_string(dir.path().join("evolution_log.txt")).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("v1.1: tighten the coder prompt"));

        // The exchange was recorded with the generated code as the answer
        assert_eq!(pipeline.session().log().len(), 1);
        assert_eq!(pipeline.session().log().sessions[0].question, "print hello");
        assert_eq!(pipeline.session().log().sessions[0].answer, "echo hello");
    }

    #[tokio::test]
    async fn test_end_to_end_failure_still_evolves() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(
            &dir,
            vec![PLAN_REPLY, "echo boom >&2; exit 7", "check the stderr"],
        );

        let report = pipeline.run("break things").await.unwrap();

        assert!(!report.succeeded());
        assert_eq!(report.stage_reached, Stage::Done);
        match report.verdict {
            Some(Verdict::NonZeroExit { code, ref stderr }) => {
                assert_eq!(code, Some(7));
                assert_eq!(stderr, "boom\n");
            }
            ref other => panic!("expected NonZeroExit, got {:?}", other),
        }

        // The researcher saw the failure, not a success
        let log = std::fs::read_to_string(dir.path().join("evolution_log.txt")).unwrap();
        assert!(log.contains("v1.1: check the stderr"));
    }

    #[tokio::test]
    async fn test_researcher_input_describes_the_verdict() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(&dir, vec![PLAN_REPLY, "exit 1", "advice"]);

        pipeline.run("task").await.unwrap();

        let calls = pipeline.agents.provider().calls();
        assert_eq!(calls.len(), 3);
        let researcher_input = &calls[2].messages[1].content;
        assert!(researcher_input.contains("Failure (non-zero exit)"));
        assert!(researcher_input.contains("exit code 1"));
    }

    #[tokio::test]
    async fn test_prose_plan_falls_back_and_still_runs() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(
            &dir,
            vec!["could not write json, sorry", "echo ok", "advice"],
        );

        let report = pipeline.run("task").await.unwrap();

        assert_eq!(report.plan.logic, "could not write json, sorry");
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn test_timeout_routes_into_failure_branch() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.sandbox.timeout = Duration::from_millis(200);
        let mut pipeline = Pipeline::with_store(
            ScriptedProvider::new(vec![PLAN_REPLY, "sleep 5", "advice"]),
            config,
            SessionStore::in_memory(),
        );

        let report = pipeline.run("task").await.unwrap();

        assert!(!report.succeeded());
        assert!(matches!(report.verdict, Some(Verdict::TimedOut { .. })));

        let calls = pipeline.agents.provider().calls();
        assert!(calls[2].messages[1].content.contains("Failure (timeout)"));
    }

    #[tokio::test]
    async fn test_inference_error_propagates_typed() {
        use codesmith_error::ErrorKind;

        let dir = TempDir::new().unwrap();
        let pipeline_config = test_config(&dir);
        let mut pipeline = Pipeline::with_store(
            ScriptedProvider::erroring(ProviderError::MissingToken),
            pipeline_config,
            SessionStore::in_memory(),
        );

        let err = pipeline.run("task").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenMissing);

        // Nothing was persisted: the session never advanced
        assert_eq!(pipeline.knowledge(), 1.0);
        assert!(!dir.path().join("evolution_log.txt").exists());
    }

    #[tokio::test]
    async fn test_stage_hook_sees_every_stage() {
        use std::sync::{Arc, Mutex};

        let dir = TempDir::new().unwrap();
        let stages: Arc<Mutex<Vec<Stage>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = stages.clone();

        let mut pipeline = pipeline(&dir, vec![PLAN_REPLY, "echo hi", "advice"])
            .on_stage(move |stage, _| seen.lock().unwrap().push(stage));

        pipeline.run("task").await.unwrap();

        let stages = stages.lock().unwrap();
        assert_eq!(
            *stages,
            vec![
                Stage::Planning,
                Stage::Auditing,
                Stage::Coding,
                Stage::Sandboxing,
                Stage::Evolving,
                Stage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_second_run_gets_session_context() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(
            &dir,
            vec![
                PLAN_REPLY, "echo one", "advice one",
                PLAN_REPLY, "echo two", "advice two",
            ],
        );

        pipeline.run("first task").await.unwrap();
        pipeline.run("second task").await.unwrap();

        let calls = pipeline.agents.provider().calls();
        // First architect call has no context, the second carries the first exchange
        assert!(!calls[0].messages[1].content.contains("Earlier exchanges:"));
        let second_plan_input = &calls[3].messages[1].content;
        assert!(second_plan_input.contains("Earlier exchanges:"));
        assert!(second_plan_input.contains("Q: first task"));
        assert!(second_plan_input.contains("A: echo one"));

        assert!((pipeline.knowledge() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::Planning.agent_label(), "architect");
        assert_eq!(Stage::Evolving.agent_label(), "researcher");
        assert_eq!(Stage::Sandboxing.to_string(), "sandboxing");
    }
}
