pub const SYSTEM_PROMPT: &str = r#"Annotate the text according to the prompt. Input and output use the same JSON schema.

SCHEMA:
{
  "text": "the input text",
  "denotations": [
    {"id": "T1", "span": {"begin": 0, "end": 5}, "obj": "Label"}
  ],
  "relations": [
    {"pred": "predicate", "subj": "T1", "obj": "T2"}
  ]
}

RULES:
- Return "text" exactly as given, character for character
- Offsets count characters (not bytes), "end" is exclusive
- Keep existing denotations and relations unless the prompt says otherwise
- Use sequential IDs: T1, T2, T3, etc.
- Relations may only refer to denotation IDs in the same output
- If you cannot understand the prompt, return the input unchanged
- Output ONLY the JSON object, no markdown, no explanations"#;

/// User message for one chunk. `part` is the 1-based chunk number, given
/// only when the text was split.
pub fn build_user_content(chunk_json: &str, prompt: &str, part: Option<usize>) -> String {
    let mut content = format!("{}\n\nPrompt:\n{}", chunk_json, prompt);
    if let Some(part) = part {
        content.push_str(&format!(
            "\n\n(This is part {}. Please annotate this part only.)",
            part
        ));
    }
    content
}

pub fn build_repair_prompt(invalid_output: &str, error: &str) -> String {
    format!(
        r#"The following output does not match the annotation schema:

{}

Problem: {}

Fix it. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_output, error
    )
}
