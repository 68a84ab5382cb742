//! Tool System
//!
//! A fixed mapping from tool name to callable. Tools take one input string and
//! return text; the registry never lets a tool failure escape as an error.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;

/// Tool call request extracted from model output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Raw input string for the tool
    pub input: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
        }
    }
}

/// Per-invocation context handed to tools
#[derive(Clone, Debug, Default)]
pub struct ToolContext {
    /// Id of the calling agent, for tools scoped to an agent's corpus
    pub agent_id: Option<String>,
}

impl ToolContext {
    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
        }
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool identifier
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Execute the tool with the given input
    async fn execute(&self, input: &str, ctx: &ToolContext) -> Result<String>;
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Sorted tool names
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name. Unknown names and tool failures come back as
    /// descriptive text.
    pub async fn invoke(&self, name: &str, input: &str, ctx: &ToolContext) -> String {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = name, "unknown tool requested");
            return format!("Unknown tool: {name}");
        };

        tracing::debug!(tool = name, "executing tool");
        match tool.execute(input, ctx).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool failed");
                format!("Tool {name} failed: {e}")
            }
        }
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

/// Calculator tool - evaluates arithmetic expressions
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression, e.g. '12*7' or '(2 + 3) ** 2'"
    }

    async fn execute(&self, input: &str, _ctx: &ToolContext) -> Result<String> {
        let expr = input.trim();
        Ok(match evaluate_expression(expr) {
            Ok(value) => format!("{expr} = {value}"),
            Err(e) => format!("Calculator error: {e}"),
        })
    }
}

/// Evaluate `+ - * / // % ** ^`, unary signs and parentheses.
pub fn evaluate_expression(expr: &str) -> std::result::Result<f64, String> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err("empty expression".into());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("unexpected token at position {}", parser.pos));
    }
    if value.is_finite() {
        Ok(value)
    } else {
        Err("result is not a finite number".into())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    FloorDiv,
    Percent,
    Pow,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            ' ' | '\t' | '\n' | '\r' => {}
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' if next == Some('*') => {
                tokens.push(Token::Pow);
                i += 1;
            }
            '*' => tokens.push(Token::Star),
            '/' if next == Some('/') => {
                tokens.push(Token::FloorDiv);
                i += 1;
            }
            '/' => tokens.push(Token::Slash),
            '%' => tokens.push(Token::Percent),
            '^' => tokens.push(Token::Pow),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            d if d.is_ascii_digit() || d == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{literal}'"))?;
                tokens.push(Token::Num(value));
                continue;
            }
            other => return Err(format!("unsupported character '{other}'")),
        }
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::FloorDiv | Token::Percent)) =
            self.peek()
        {
            self.pos += 1;
            let rhs = self.unary()?;
            if op != Token::Star && rhs == 0.0 {
                return Err("division by zero".into());
            }
            value = match op {
                Token::Star => value * rhs,
                Token::Slash => value / rhs,
                Token::FloorDiv => (value / rhs).floor(),
                _ => value - rhs * (value / rhs).floor(),
            };
        }
        Ok(value)
    }

    // Unary signs bind looser than `**`, so `-2 ** 2` is -4.
    fn unary(&mut self) -> std::result::Result<f64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> std::result::Result<f64, String> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> std::result::Result<f64, String> {
        match self.bump() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("missing closing parenthesis".into()),
                }
            }
            Some(token) => Err(format!("unexpected {token:?}")),
            None => Err("unexpected end of expression".into()),
        }
    }
}
