//! Prompt templates rendered with Tera

use serde::Serialize;
use tera::{Context, Tera};

use crate::agents::error::AgentResult;

const ORCHESTRATOR_TEMPLATE: &str = r#"You are an assistant that answers the user question.
You can use the FACTS that follow to answer the question.
If the FACTS do not contain the data you need, call one of the available functions to get more FACTS.
{% for fragment in injected %}
{{ fragment }}
{% endfor %}
FACTS:
{% for fact in facts %}- {{ fact }}
{% endfor %}"#;

/// Values rendered into the orchestrator system prompt
#[derive(Debug, Default, Serialize)]
pub struct PromptSections {
    pub injected: Vec<String>,
    pub facts: Vec<String>,
}

/// Render a template against serializable values
pub fn render<T: Serialize>(template: &str, values: &T) -> AgentResult<String> {
    let context = Context::from_serialize(values)?;
    Ok(Tera::one_off(template, &context, false)?)
}

/// System prompt for an orchestration round
pub fn orchestrator_prompt(sections: &PromptSections) -> AgentResult<String> {
    render(ORCHESTRATOR_TEMPLATE, sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_fragments_and_facts() {
        let prompt = orchestrator_prompt(&PromptSections {
            injected: vec!["Call EvaluateExpression for math.".to_string()],
            facts: vec!["Result of 2+2 is in property expression1 and it is equal to 4".to_string()],
        })
        .unwrap();

        assert!(prompt.contains("Call EvaluateExpression for math."));
        assert!(prompt.contains("FACTS:\n- Result of 2+2 is in property expression1"));
    }

    #[test]
    fn test_prompt_does_not_escape_html() {
        let prompt = orchestrator_prompt(&PromptSections {
            injected: Vec::new(),
            facts: vec!["a < b && c > d".to_string()],
        })
        .unwrap();
        assert!(prompt.contains("a < b && c > d"));
    }
}
