//! Stage agents - thin parameterized callers of the inference provider
//!
//! Each agent supplies its own system prompt and model name. The architect
//! plans, the auditor checks, the coder writes, the researcher advises.

use codesmith_engine::plan::Plan;
use codesmith_engine::provider::{CompletionRequest, LlmProvider};
use codesmith_error::{Error, Result};

/// Model identifiers for the stages that call the provider
#[derive(Debug, Clone)]
pub struct StageModels {
    pub architect: String,
    pub coder: String,
    pub researcher: String,
    /// Shared sampling temperature for all stages
    pub temperature: f32,
}

impl Default for StageModels {
    fn default() -> Self {
        Self {
            architect: "deepseek-r1".to_string(),
            coder: "gpt-4o".to_string(),
            researcher: "mistral-large".to_string(),
            temperature: 0.1,
        }
    }
}

const ARCHITECT_SYSTEM_PROMPT: &str = "\
You are a deep-thinking software architect. Break the user's request into:
1. Solid logical steps.
2. Mathematical constraints that pin down correctness.
Reply ONLY with JSON: {\"logic\": \"...\", \"math_constraints\": \"...\"}";

const CODER_SYSTEM_PROMPT: &str = "\
You are a senior developer. Write clean, complete Python code based on the \
attached plan. Do not explain the code and do not wrap it in markdown \
fences. Return only the source text.";

const RESEARCHER_SYSTEM_PROMPT: &str = "\
You are an AI researcher reviewing a coding pipeline's latest run. Suggest \
exactly one concrete improvement to the pipeline's prompts or stages.";

/// Outcome of the audit stage
#[derive(Debug, Clone, PartialEq)]
pub struct AuditReport {
    pub passed: bool,
    pub summary: String,
}

/// The four stage agents, sharing one provider
pub struct StageAgents<P: LlmProvider> {
    provider: P,
    models: StageModels,
}

impl<P: LlmProvider> StageAgents<P> {
    pub fn new(provider: P, models: StageModels) -> Self {
        Self { provider, models }
    }

    pub fn models(&self) -> &StageModels {
        &self.models
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Architect: ask for a JSON roadmap and parse it best-effort.
    ///
    /// Prior session exchanges, when present, are prefixed to the task so
    /// the roadmap can build on earlier runs. One attempt, no retry.
    pub async fn plan(&self, task: &str, context: Option<&str>) -> Result<Plan> {
        let user = match context {
            Some(ctx) => format!("Earlier exchanges:\n{}\n\nTask: {}", ctx, task),
            None => task.to_string(),
        };

        let request = CompletionRequest::staged(ARCHITECT_SYSTEM_PROMPT, user)
            .with_model(&self.models.architect)
            .with_temperature(self.models.temperature);

        let reply = self.stage_reply(request, "architect").await?;
        Ok(Plan::parse(&reply))
    }

    /// Auditor: fixed satisfiability check of a placeholder constraint.
    ///
    /// The check never looks at `plan.math_constraints`, so it passes for
    /// every input. That disconnect is preserved deliberately as the
    /// observable behavior of this stage.
    // TODO: evaluate plan.math_constraints here instead of the placeholder.
    pub fn audit(&self, plan: &Plan) -> AuditReport {
        let _ = plan;

        // Placeholder probe: `x > 0` has the witness x = 1.
        let witness = 1i64;
        let satisfiable = witness > 0;

        if satisfiable {
            AuditReport {
                passed: true,
                summary: "constraints satisfiable (witness x = 1)".to_string(),
            }
        } else {
            AuditReport {
                passed: false,
                summary: "placeholder constraint unsatisfiable".to_string(),
            }
        }
    }

    /// Coder: plan in, raw source text out. The reply is passed through
    /// verbatim - stray fences or prose are not stripped here.
    pub async fn generate(&self, plan: &Plan) -> Result<String> {
        let request = CompletionRequest::staged(CODER_SYSTEM_PROMPT, plan.to_prompt_text())
            .with_model(&self.models.coder)
            .with_temperature(self.models.temperature);

        self.stage_reply(request, "coder").await
    }

    /// Researcher: one piece of advice from the run outcome. The reply is
    /// only ever appended to the evolution log, never read back.
    pub async fn evolve(&self, outcome: &str) -> Result<String> {
        let user = format!(
            "Based on this outcome: {}\nHow should the pipeline improve?",
            outcome
        );

        let request = CompletionRequest::staged(RESEARCHER_SYSTEM_PROMPT, user)
            .with_model(&self.models.researcher)
            .with_temperature(self.models.temperature);

        self.stage_reply(request, "researcher").await
    }

    async fn stage_reply(&self, request: CompletionRequest, stage: &'static str) -> Result<String> {
        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| Error::from(e).with_operation("agents::stage_reply").with_context("stage", stage))?;

        response.content.ok_or_else(|| {
            Error::inference_failed("endpoint returned no content")
                .with_operation("agents::stage_reply")
                .with_context("stage", stage)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use codesmith_engine::plan::FALLBACK_CONSTRAINT;
    use codesmith_engine::provider::Role;

    #[tokio::test]
    async fn test_architect_parses_roadmap() {
        let provider = ScriptedProvider::new(vec![
            r#"Here you go: {"logic": "print hello", "math_constraints": "x > 0"}"#,
        ]);
        let agents = StageAgents::new(provider, StageModels::default());

        let plan = agents.plan("print hello", None).await.unwrap();
        assert_eq!(plan.logic, "print hello");
        assert_eq!(plan.math_constraints, "x > 0");

        let calls = agents.provider().calls();
        assert_eq!(calls[0].model.as_deref(), Some("deepseek-r1"));
        assert_eq!(calls[0].messages[0].role, Role::System);
        assert_eq!(calls[0].messages[1].content, "print hello");
    }

    #[tokio::test]
    async fn test_architect_includes_context() {
        let provider = ScriptedProvider::new(vec![r#"{"logic": "x"}"#]);
        let agents = StageAgents::new(provider, StageModels::default());

        agents
            .plan("new task", Some("Q: old\nA: answer"))
            .await
            .unwrap();

        let calls = agents.provider().calls();
        let user = &calls[0].messages[1].content;
        assert!(user.contains("Earlier exchanges:"));
        assert!(user.contains("Q: old"));
        assert!(user.contains("Task: new task"));
    }

    #[tokio::test]
    async fn test_architect_falls_back_on_prose() {
        let provider = ScriptedProvider::new(vec!["no json here"]);
        let agents = StageAgents::new(provider, StageModels::default());

        let plan = agents.plan("task", None).await.unwrap();
        assert_eq!(plan.logic, "no json here");
        assert_eq!(plan.math_constraints, FALLBACK_CONSTRAINT);
    }

    #[test]
    fn test_audit_passes_for_any_input() {
        let provider = ScriptedProvider::new(vec![]);
        let agents = StageAgents::new(provider, StageModels::default());

        let sensible = Plan {
            logic: "print hello".into(),
            math_constraints: "x > 0".into(),
        };
        let nonsense = Plan {
            logic: "".into(),
            math_constraints: "1 > 2 and false".into(),
        };

        assert!(agents.audit(&sensible).passed);
        assert!(agents.audit(&nonsense).passed);
    }

    #[tokio::test]
    async fn test_coder_reply_is_verbatim() {
        let fenced = "```python\nprint(\"hello\")\n```";
        let provider = ScriptedProvider::new(vec![fenced]);
        let agents = StageAgents::new(provider, StageModels::default());

        let plan = Plan {
            logic: "print hello".into(),
            math_constraints: "x > 0".into(),
        };
        let code = agents.generate(&plan).await.unwrap();

        // Stray fences are not stripped; the sandbox sees exactly this text
        assert_eq!(code, fenced);

        let calls = agents.provider().calls();
        assert_eq!(calls[0].model.as_deref(), Some("gpt-4o"));
        assert!(calls[0].messages[1].content.contains("print hello"));
    }

    #[tokio::test]
    async fn test_researcher_receives_outcome() {
        let provider = ScriptedProvider::new(vec!["tighten the coder prompt"]);
        let agents = StageAgents::new(provider, StageModels::default());

        let advice = agents.evolve("Failure (timeout): slept too long").await.unwrap();
        assert_eq!(advice, "tighten the coder prompt");

        let calls = agents.provider().calls();
        assert_eq!(calls[0].model.as_deref(), Some("mistral-large"));
        assert!(calls[0].messages[1].content.contains("Failure (timeout)"));
    }

    #[tokio::test]
    async fn test_provider_error_carries_stage() {
        use codesmith_engine::provider::ProviderError;
        use codesmith_error::ErrorKind;

        let provider = ScriptedProvider::erroring(ProviderError::MissingToken);
        let agents = StageAgents::new(provider, StageModels::default());

        let err = agents.plan("task", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenMissing);
        assert_eq!(err.context()[1], ("stage", "architect".to_string()));
    }
}
