//! Tool-call detection
//!
//! Models asked to reply with `{"tool": "...", "input": "..."}` rarely do so
//! cleanly. Detection runs a prioritized list of strategies over the reply
//! and takes the first payload any of them recovers:
//!
//! 1. [`strict_json`]: a JSON object anywhere in the text
//! 2. [`fenced_block`]: a JSON object inside a ```` ``` ```` fence
//! 3. [`escaped_quotes`]: `{\"tool\":\"..\",\"input\":\"..\"}`
//! 4. [`key_reversed`]: `input` before `tool`, escaped or not

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::tool::ToolCall;

/// A single extraction strategy
pub type Strategy = fn(&str) -> Option<ToolCall>;

/// Strategies in the order they are tried
pub const STRATEGIES: [(&str, Strategy); 4] = [
    ("strict_json", strict_json),
    ("fenced_block", fenced_block),
    ("escaped_quotes", escaped_quotes),
    ("key_reversed", key_reversed),
];

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[A-Za-z]*\s*([\s\S]*?)```").expect("fence pattern is valid")
});

static ESCAPED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{\s*\\"tool\\"\s*:\s*\\"([^\\"]+)\\"\s*,\s*\\"input\\"\s*:\s*\\"([\s\S]*?)\\"\s*\}"#,
    )
    .expect("escaped-quote pattern is valid")
});

static REVERSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{\s*\\?"input\\?"\s*:\s*\\?"([\s\S]*?)\\?"\s*,\s*\\?"tool\\?"\s*:\s*\\?"([^\\"]+)\\?"\s*\}"#,
    )
    .expect("key-reversed pattern is valid")
});

/// Run every strategy in order and return the first recovered payload.
pub fn extract_tool_call(text: &str) -> Option<ToolCall> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let call = strategy(text)?;
        tracing::debug!(strategy = name, tool = %call.name, "tool call detected");
        Some(call)
    })
}

/// Detect a tool call and accept it only if `allowed` declares the tool.
pub fn detect_tool_call<S: AsRef<str>>(text: &str, allowed: &[S]) -> Option<ToolCall> {
    let call = extract_tool_call(text)?;
    if allowed.iter().any(|name| name.as_ref() == call.name) {
        Some(call)
    } else {
        tracing::debug!(tool = %call.name, "ignoring call to undeclared tool");
        None
    }
}

/// Any JSON object in the text carrying `tool` and `input`.
pub fn strict_json(text: &str) -> Option<ToolCall> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => call_from_value(&value),
            _ => None,
        }
    })
}

/// A JSON object inside a fenced code block.
pub fn fenced_block(text: &str) -> Option<ToolCall> {
    FENCE_RE
        .captures_iter(text)
        .find_map(|caps| caps.get(1).and_then(|body| strict_json(body.as_str())))
}

/// The payload written with backslash-escaped quotes.
pub fn escaped_quotes(text: &str) -> Option<ToolCall> {
    let caps = ESCAPED_RE.captures(text)?;
    build_call(caps.get(1)?.as_str(), caps.get(2)?.as_str())
}

/// The payload with `input` ahead of `tool`.
pub fn key_reversed(text: &str) -> Option<ToolCall> {
    let caps = REVERSED_RE.captures(text)?;
    build_call(caps.get(2)?.as_str(), caps.get(1)?.as_str())
}

fn call_from_value(value: &Value) -> Option<ToolCall> {
    let object = value.as_object()?;
    let name = object.get("tool")?.as_str()?;
    let input = match object.get("input")? {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    build_call(name, &input)
}

fn build_call(name: &str, input: &str) -> Option<ToolCall> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(ToolCall::new(name, input.trim()))
}
