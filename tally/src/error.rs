use crate::span::Span;
use std::fmt;
use std::sync::Arc;

/// Detailed error information pointing into a formula
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub message: String,
    pub span: Span,
    pub formula: Arc<str>,
    pub suggestion: Option<String>,
}

/// Error types for the Tally engine
#[derive(Debug, Clone)]
pub enum TallyError {
    /// Malformed formula: bad character, unbalanced parentheses, unknown function
    Syntax(Box<ErrorDetails>),

    /// Formula failed while executing: division by zero, arity, non-scalar result
    Runtime(Box<ErrorDetails>),

    /// Engine error without a formula location
    Engine(String),

    /// Circular dependency between categories or objects
    CircularDependency(String),

    /// A configured resource limit was exceeded
    ResourceLimitExceeded {
        limit_name: String,
        limit_value: String,
        actual_value: String,
        suggestion: String,
    },

    /// Multiple errors collected together
    MultipleErrors(Vec<TallyError>),
}

impl TallyError {
    /// Create a syntax error for a span of the formula
    pub fn syntax(message: impl Into<String>, span: Span, formula: &str) -> Self {
        Self::Syntax(Box::new(ErrorDetails {
            message: message.into(),
            span,
            formula: Arc::from(formula),
            suggestion: None,
        }))
    }

    /// Create a syntax error with a suggestion
    pub fn syntax_with_suggestion(
        message: impl Into<String>,
        span: Span,
        formula: &str,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Syntax(Box::new(ErrorDetails {
            message: message.into(),
            span,
            formula: Arc::from(formula),
            suggestion: Some(suggestion.into()),
        }))
    }

    /// Create a runtime error for a span of the formula
    pub fn runtime(message: impl Into<String>, span: Span, formula: &str) -> Self {
        Self::Runtime(Box::new(ErrorDetails {
            message: message.into(),
            span,
            formula: Arc::from(formula),
            suggestion: None,
        }))
    }

    /// The bare message, without the error category prefix
    pub fn message(&self) -> String {
        match self {
            TallyError::Syntax(details) | TallyError::Runtime(details) => details.message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, TallyError::Syntax(_))
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, TallyError::Runtime(_))
    }
}

impl fmt::Display for TallyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TallyError::Syntax(details) => {
                write!(f, "Syntax error: {}", details.message)?;
                if let Some(suggestion) = &details.suggestion {
                    write!(f, " (suggestion: {})", suggestion)?;
                }
                write!(f, " at position {}", details.span.start)
            }
            TallyError::Runtime(details) => {
                write!(f, "Runtime error: {}", details.message)?;
                if let Some(suggestion) = &details.suggestion {
                    write!(f, " (suggestion: {})", suggestion)?;
                }
                write!(f, " at position {}", details.span.start)
            }
            TallyError::Engine(msg) => write!(f, "Engine error: {}", msg),
            TallyError::CircularDependency(msg) => write!(f, "Circular dependency: {}", msg),
            TallyError::ResourceLimitExceeded {
                limit_name,
                limit_value,
                actual_value,
                suggestion,
            } => write!(
                f,
                "Resource limit exceeded: {} (limit {}, actual {}). {}",
                limit_name, limit_value, actual_value, suggestion
            ),
            TallyError::MultipleErrors(errors) => {
                writeln!(f, "Multiple errors:")?;
                for (i, error) in errors.iter().enumerate() {
                    write!(f, "  {}. {}", i + 1, error)?;
                    if i < errors.len() - 1 {
                        writeln!(f)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for TallyError {}

impl From<serde_json::Error> for TallyError {
    fn from(err: serde_json::Error) -> Self {
        TallyError::Engine(format!("Invalid state JSON: {}", err))
    }
}
