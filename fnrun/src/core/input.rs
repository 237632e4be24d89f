//! Conversion of structured invocation input into the text fed to stdin.

use serde_json::Value;

/// Render a JSON input payload as stdin text.
///
/// Strings pass through verbatim so plain text reaches the function unquoted.
/// Every other value is written as compact JSON. A missing payload renders as
/// `{}`.
pub fn render_input(input: Option<&Value>) -> String {
    match input {
        None => "{}".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
