//! Pure extraction and decoding of model output

use crate::error::AnalyzerError;
use crate::models::AnalysisResult;

/// Slice the JSON object out of free-form model output
///
/// Takes the span from the first `{` to the last `}` of the trimmed content.
pub fn extract_json_object(content: &str) -> Result<&str, AnalyzerError> {
    let content = content.trim();

    let span = match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => content,
    };

    if span.starts_with('{') && span.ends_with('}') {
        Ok(span)
    } else {
        Err(AnalyzerError::MalformedResponse {
            content: content.to_string(),
        })
    }
}

/// Decode an extracted JSON object into an analysis result
pub fn decode_analysis(json: &str) -> Result<AnalysisResult, AnalyzerError> {
    serde_json::from_str(json).map_err(|e| AnalyzerError::SchemaMismatch {
        content: json.to_string(),
        reason: e.to_string(),
    })
}

/// Extract then decode model output
pub fn parse_analysis(content: &str) -> Result<AnalysisResult, AnalyzerError> {
    decode_analysis(extract_json_object(content)?)
}
