//! Prompt composition: language directive, task template, context, question.

use tutor_core::Language;

pub const GENERAL_TEMPLATE: &str = r#"You are a helpful school tutor assistant.
You answer questions based on the provided context from school textbooks.
Format your response as structured JSON.

Context: {context}

Question: {question}

INSTRUCTIONS:
1. Read the context carefully and extract relevant information to answer the question
2. Write a DETAILED SUMMARY with 2-3 complete sentences that explain the topic thoroughly based on the context
3. Extract key bullet points with specific facts, definitions, and properties (at least 3-5 points)
4. ALWAYS create a table with relevant properties, facts, or comparisons from the context

CRITICAL RULES:
- The "summary" field MUST contain 2-3 complete sentences with comprehensive explanation
- The "table" field MUST contain at least one table with properties and values from the context
- Do NOT leave the table empty - extract relevant data from context

Respond ONLY with valid JSON in this format:
{
    "summary": "Write 2-3 complete sentences here that thoroughly explain the answer. Include specific details from the context.",
    "caption": "Short Title",
    "bullet_points": [{"point": "specific fact 1"}, {"point": "specific fact 2"}, {"point": "specific fact 3"}],
    "table": [{"header": "Topic Information", "rows": [{"property": "Key Property 1", "value": "Value 1"}, {"property": "Key Property 2", "value": "Value 2"}]}]
}
"#;

pub const MATH_TEMPLATE: &str = r#"You are a helpful math tutor assistant.
You solve math problems step by step with detailed explanations.
You MUST solve the problem yourself - do not just describe the problem.

Context: {context}

Problem: {question}

IMPORTANT INSTRUCTIONS:
1. Actually SOLVE the math problem step by step
2. For percentage problems: use the formula (part / percentage) x 100 = whole
3. For each step, show the calculation and result
4. Write the response in the SAME language as the problem (Tamil or English)

Solve this problem step by step. For each step:
1. State what action you're taking
2. Explain WHY you're doing it (this helps students understand)
3. Show the mathematical expression
4. Give the intermediate result

Respond ONLY with valid JSON in this format:
{
    "problem": "restate the original problem here",
    "caption": "title describing the problem type",
    "steps": [
        {
            "step_number": 1,
            "action": "what you're doing",
            "explanation": "why you're doing this step",
            "expression": "the mathematical expression",
            "result": "intermediate result"
        }
    ],
    "final_answer": "the final numerical answer with units",
    "concept_used": ["concept 1", "concept 2"],
    "tips": ["helpful tip for solving similar problems"]
}

CRITICAL: You MUST include at least 2-3 steps and provide the final numerical answer. DO NOT leave fields empty.
"#;

pub fn language_directive(language: Language) -> &'static str {
    match language {
        Language::Tamil => {
            "CRITICAL LANGUAGE REQUIREMENT: You MUST respond ONLY in Tamil language. All text in your JSON response must be in Tamil."
        }
        Language::English => {
            "CRITICAL LANGUAGE REQUIREMENT: You MUST respond ONLY in English language. Do NOT use Tamil or any other language. All text in your JSON response must be in English only."
        }
    }
}

/// Full prompt with the language directive at the start and repeated as a
/// closing reminder.
pub fn compose_prompt(question: &str, context: &str, is_computational: bool, language: Language) -> String {
    let template = if is_computational { MATH_TEMPLATE } else { GENERAL_TEMPLATE };
    let directive = language_directive(language);
    format!("{directive}\n\n{}\n\nREMINDER: {directive}", render(template, context, question))
}

/// Single-pass placeholder substitution, so text inside the context is never
/// itself treated as a placeholder.
fn render(template: &str, context: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{question}") {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_wraps_the_template() {
        let prompt = compose_prompt("Why is the sky blue?", "[Source: a - b]\nlight", false, Language::Tamil);
        let directive = language_directive(Language::Tamil);
        assert!(prompt.starts_with(directive));
        assert!(prompt.ends_with(&format!("REMINDER: {directive}")));
        assert!(prompt.contains("Question: Why is the sky blue?"));
        assert!(prompt.contains("Context: [Source: a - b]\nlight"));
    }

    #[test]
    fn math_template_used_for_computation() {
        let prompt = compose_prompt("2 + 2", "", true, Language::English);
        assert!(prompt.contains("Problem: 2 + 2"));
        assert!(prompt.contains("\"final_answer\""));
    }

    #[test]
    fn context_text_is_not_rescanned() {
        let out = render("C={context} Q={question}", "{question}", "q");
        assert_eq!(out, "C={question} Q=q");
    }
}
