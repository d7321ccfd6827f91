//! Typeset-math normalization
//!
//! Turns a raw answer string (possibly wrapped in `$...$` / `$$...$$` and
//! sprinkled with a bounded set of macros) into the flat algebraic syntax
//! accepted by [`crate::parser::parse`].

use regex::Regex;
use std::sync::LazyLock;

static RE_DELIMITED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\${1,2}(.*?)\${1,2}").expect("valid regex literal"));

/// Ordered macro rewrites. Fractions and roots come first so that their
/// operands are already flat when the function macros run.
static MACRO_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\\frac\{([^}]+)\}\{([^}]+)\}", "(${1})/(${2})"),
        (r"\\sqrt\{([^}]+)\}", "sqrt(${1})"),
        (r"\\sqrt\[([^\]]+)\]\{([^}]+)\}", "(${2})**(1/(${1}))"),
        (r"\\sin\{([^}]+)\}", "sin(${1})"),
        (r"\\cos\{([^}]+)\}", "cos(${1})"),
        (r"\\tan\{([^}]+)\}", "tan(${1})"),
        (r"\\log\{([^}]+)\}", "log(${1})"),
        (r"\\ln\{([^}]+)\}", "log(${1})"),
        (r"\\pi", "pi"),
        (r"\\theta", "theta"),
        (r"\\infty", "oo"),
        (r"\\mathrm\{e\}", "E"),
        (r"\\cdot", "*"),
        (r"\\div", "/"),
        (r"\\pm", "+/-"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex literal"), replacement))
    .collect()
});

/// Content of the first `$`-delimited span, trimmed; otherwise the whole input trimmed.
pub fn extract_math_expr(raw: &str) -> String {
    match RE_DELIMITED.captures(raw) {
        Some(caps) => caps
            .get(1)
            .map_or("", |m| m.as_str())
            .trim()
            .to_string(),
        None => raw.trim().to_string(),
    }
}

/// Removes all whitespace, then any `$` left at either end.
///
/// Every leading/trailing `$` is removed rather than just one, which keeps
/// `clean_latex(clean_latex(s)) == clean_latex(s)` for inputs like `$$x$$`.
pub fn clean_latex(expr: &str) -> String {
    let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    compact.trim_matches('$').to_string()
}

/// Rewrites the supported macros into flat syntax.
///
/// The rule list is applied repeatedly until a pass changes nothing, so
/// `\frac{\sqrt{4}}{2}` resolves once its inner root has been flattened.
/// Every rule removes a backslash, so the loop terminates.
pub fn translate_macros(latex: &str) -> String {
    let mut result = latex.to_string();
    let mut changed = true;

    while changed {
        let before = result.clone();
        for (re, replacement) in MACRO_RULES.iter() {
            result = re.replace_all(&result, *replacement).into_owned();
        }
        changed = before != result;
    }

    result
}

/// Strips one surrounding `\(...\)` pair, else one surrounding `$...$` pair,
/// from text produced by an external recognizer.
pub fn strip_recognized_delimiters(recognized: &str) -> String {
    let text = recognized.trim();
    let inner = if text.starts_with("\\(") && text.ends_with("\\)") {
        text.get(2..text.len().saturating_sub(2)).unwrap_or("")
    } else if text.starts_with('$') && text.ends_with('$') {
        text.get(1..text.len().saturating_sub(1)).unwrap_or("")
    } else {
        text
    };
    inner.trim().to_string()
}
