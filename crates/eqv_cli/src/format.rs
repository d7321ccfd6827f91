use clap::ValueEnum;
use eqv_api_models::AnswerCheckResponse;
use eqv_engine::EquivalenceVerdict;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn to_response(verdict: EquivalenceVerdict) -> AnswerCheckResponse {
    AnswerCheckResponse {
        is_correct: verdict.is_correct,
        confidence: verdict.confidence,
        explanation: verdict.explanation,
        error_message: verdict.error_message,
        recognized_latex: verdict.recognized_latex,
        strategy: verdict.strategy.map(|kind| kind.name().to_string()),
    }
}

pub fn render_text(response: &AnswerCheckResponse) -> String {
    let mut lines = vec![
        format!(
            "{} (confidence {:.2})",
            if response.is_correct { "correct" } else { "incorrect" },
            response.confidence
        ),
        response.explanation.clone(),
    ];
    if let Some(latex) = &response.recognized_latex {
        lines.push(format!("recognized: {latex}"));
    }
    if let Some(error) = &response.error_message {
        lines.push(format!("error: {error}"));
    }
    lines.join("\n")
}

pub fn print_pretty_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("JSON serialization error: {}", e);
            println!("{{\"is_correct\":false,\"confidence\":0.0,\"explanation\":\"Validation error\",\"error_message\":\"JSON_SERIALIZATION_FAILED\"}}");
        }
    }
}

pub fn emit(response: &AnswerCheckResponse, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", render_text(response)),
        OutputFormat::Json => print_pretty_json(response),
    }
}
