//! `check`, `mc` and `recognized` subcommands.

use clap::Args;
use eqv_engine::{check_answer, check_recognized_answer, AnswerRequest, CheckOptions};

use crate::format::{emit, to_response, OutputFormat};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Student answer
    pub candidate: String,

    /// Reference answer
    pub reference: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct MultipleChoiceArgs {
    /// Zero-based index of the selected option
    #[arg(allow_negative_numbers = true)]
    pub selected: i64,

    /// Zero-based index of the correct option
    pub reference: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct RecognizedArgs {
    /// Text returned by the handwriting recognizer, e.g. `\(x^2\)`
    pub recognized: String,

    /// Reference answer
    pub reference: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run(args: CheckArgs, options: &CheckOptions) {
    let request = AnswerRequest::short_answer(args.candidate, args.reference);
    emit(&to_response(check_answer(&request, options)), args.format);
}

pub fn run_multiple_choice(args: MultipleChoiceArgs, options: &CheckOptions) {
    let request = AnswerRequest::multiple_choice(Some(args.selected), args.reference);
    emit(&to_response(check_answer(&request, options)), args.format);
}

pub fn run_recognized(args: RecognizedArgs, options: &CheckOptions) {
    let request = AnswerRequest::short_answer(String::new(), args.reference);
    let verdict = check_recognized_answer(&args.recognized, &request, options);
    emit(&to_response(verdict), args.format);
}
