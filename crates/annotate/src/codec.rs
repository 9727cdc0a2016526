use annotation::Annotation;
use anyhow::{Context, Result};

pub fn encode_chunk(chunk: &Annotation) -> Result<String> {
    serde_json::to_string(chunk).context("Failed to serialize chunk")
}

/// Parse a model answer for the chunk with text `source` and check it.
///
/// Code fences and prose around the JSON object are ignored. Output that
/// only parses once backslashes are removed is accepted too. The returned
/// text must equal `source`, spans must lie within it and relations must
/// refer to returned denotations.
pub fn decode_chunk(output: &str, source: &str) -> Result<Annotation> {
    let json = json_object(output).context("No JSON object in model output")?;

    let annotation: Annotation = match serde_json::from_str(json) {
        Ok(annotation) => annotation,
        Err(e) => serde_json::from_str(&json.replace('\\', ""))
            .map_err(|_| e)
            .context("Model output is not an annotation")?,
    };

    if annotation.text != source {
        anyhow::bail!(
            "model changed the chunk text ({} characters returned for {})",
            annotation.char_len(),
            source.chars().count()
        );
    }
    check_spans(&annotation)?;
    annotation.validate()?;
    Ok(annotation)
}

fn json_object(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (start < end).then(|| &output[start..=end])
}

fn check_spans(annotation: &Annotation) -> Result<()> {
    let len = annotation.char_len();
    for denotation in &annotation.denotations {
        let span = denotation.span;
        if span.begin > span.end || span.end > len {
            anyhow::bail!(
                "denotation {} {} is outside the text of length {}",
                denotation.id,
                span,
                len
            );
        }
    }
    Ok(())
}
