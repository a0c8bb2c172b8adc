//! # Plan parsing
//!
//! The architect stage replies with free-form text that should contain one
//! JSON object. Salvaging it follows a brace-window rule: take the substring
//! from the first `{` to the last `}` and parse that. Anything unparseable
//! falls back to a default structure carrying the raw reply, so the pipeline
//! always has a plan to hand to the next stage.

use serde::{Deserialize, Serialize};

/// Placeholder constraint used when the architect's reply has no usable JSON
pub const FALLBACK_CONSTRAINT: &str = "x > 0";

/// The structured output of the planning stage.
///
/// Field aliases accept both observed spellings of the roadmap
/// (`logic`/`plan`) and of the constraints (`constraints`/`z3_logic`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Logical steps for solving the task
    #[serde(alias = "plan")]
    pub logic: String,

    /// Mathematical constraints the solution should satisfy
    #[serde(
        alias = "constraints",
        alias = "z3_logic",
        default = "default_constraint"
    )]
    pub math_constraints: String,
}

fn default_constraint() -> String {
    FALLBACK_CONSTRAINT.to_string()
}

impl Plan {
    /// Parse a plan from a raw model reply.
    ///
    /// One attempt, no retry: either the brace window parses, or the raw
    /// reply becomes the plan's logic with the placeholder constraint.
    pub fn parse(raw: &str) -> Self {
        extract_object(raw)
            .and_then(|json| serde_json::from_str::<Plan>(json).ok())
            .unwrap_or_else(|| Self::fallback(raw))
    }

    /// The fallback plan wrapping an unparseable reply
    pub fn fallback(raw: &str) -> Self {
        Self {
            logic: raw.trim().to_string(),
            math_constraints: default_constraint(),
        }
    }

    /// Coerce the plan to the text handed to the coder stage
    pub fn to_prompt_text(&self) -> String {
        format!(
            "Plan:\n{}\n\nConstraints:\n{}",
            self.logic, self.math_constraints
        )
    }
}

/// Substring from the first `{` to the last `}`, if both exist in order
fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_object() {
        let plan = Plan::parse(r#"{"logic": "print hello", "math_constraints": "x > 0"}"#);
        assert_eq!(plan.logic, "print hello");
        assert_eq!(plan.math_constraints, "x > 0");
    }

    #[test]
    fn test_parse_object_with_surrounding_prose() {
        let raw = "Sure! Here is the roadmap you asked for:\n\
                   {\"logic\": \"sum the list\", \"constraints\": \"n >= 0\"}\n\
                   Let me know if you need anything else.";
        let plan = Plan::parse(raw);
        assert_eq!(plan.logic, "sum the list");
        assert_eq!(plan.math_constraints, "n >= 0");
    }

    #[test]
    fn test_parse_accepts_alias_fields() {
        let plan = Plan::parse(r#"{"plan": "steps here", "z3_logic": "y < 10"}"#);
        assert_eq!(plan.logic, "steps here");
        assert_eq!(plan.math_constraints, "y < 10");
    }

    #[test]
    fn test_parse_defaults_missing_constraints() {
        let plan = Plan::parse(r#"{"logic": "just do it"}"#);
        assert_eq!(plan.logic, "just do it");
        assert_eq!(plan.math_constraints, FALLBACK_CONSTRAINT);
    }

    #[test]
    fn test_no_braces_falls_back() {
        let plan = Plan::parse("I could not produce JSON, sorry.");
        assert_eq!(plan.logic, "I could not produce JSON, sorry.");
        assert_eq!(plan.math_constraints, FALLBACK_CONSTRAINT);
    }

    #[test]
    fn test_reversed_braces_fall_back() {
        let plan = Plan::parse("} not an object {");
        assert_eq!(plan.logic, "} not an object {");
        assert_eq!(plan.math_constraints, FALLBACK_CONSTRAINT);
    }

    #[test]
    fn test_unparseable_window_falls_back() {
        let raw = "prefix {\"logic\": unquoted} suffix";
        let plan = Plan::parse(raw);
        assert_eq!(plan.logic, raw.trim());
        assert_eq!(plan.math_constraints, FALLBACK_CONSTRAINT);
    }

    #[test]
    fn test_window_is_first_to_last_brace() {
        // Two objects in one reply: the window spans both, which does not
        // parse, so the whole reply becomes the fallback logic.
        let raw = r#"{"logic": "a"} and {"logic": "b"}"#;
        let plan = Plan::parse(raw);
        assert_eq!(plan.logic, raw);
    }

    #[test]
    fn test_prompt_text_contains_both_parts() {
        let plan = Plan {
            logic: "step 1".into(),
            math_constraints: "x > 0".into(),
        };
        let text = plan.to_prompt_text();
        assert!(text.contains("step 1"));
        assert!(text.contains("x > 0"));
    }
}
