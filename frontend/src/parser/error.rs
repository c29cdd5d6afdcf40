use crate::ast::SourceLocation;

#[derive(Debug, Clone, PartialEq)]
pub enum ParserErrorKind {
    UnexpectedToken { expected: String, found: String },
    InvalidToken { lexeme: String },
    MissingName { what: String },
    GenericError { message: String },
    IoError { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub location: SourceLocation,
    /// Lexeme of the token the error was reported at, if any.
    pub at: Option<String>,
}

impl ParserError {
    pub fn unexpected_token(location: SourceLocation, expected: String, found: String, at: Option<String>) -> Self {
        Self {
            kind: ParserErrorKind::UnexpectedToken { expected, found },
            location,
            at,
        }
    }

    pub fn invalid_token(location: SourceLocation, lexeme: String) -> Self {
        Self {
            kind: ParserErrorKind::InvalidToken { lexeme: lexeme.clone() },
            location,
            at: Some(lexeme),
        }
    }

    pub fn missing_name(location: SourceLocation, what: &str, at: Option<String>) -> Self {
        Self {
            kind: ParserErrorKind::MissingName { what: what.to_string() },
            location,
            at,
        }
    }

    pub fn generic_error(location: SourceLocation, message: String, at: Option<String>) -> Self {
        Self {
            kind: ParserErrorKind::GenericError { message },
            location,
            at,
        }
    }

    pub fn io_error(location: SourceLocation, message: String) -> Self {
        Self {
            kind: ParserErrorKind::IoError { message },
            location,
            at: None,
        }
    }
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Line {}, Column {}] Error", self.location.line, self.location.column)?;
        if let Some(at) = &self.at {
            write!(f, " at '{}'", at)?;
        }
        let message = match &self.kind {
            ParserErrorKind::UnexpectedToken { expected, found } => {
                format!("Expected {}, got {}", expected, found)
            }
            ParserErrorKind::InvalidToken { .. } => "Invalid token".to_string(),
            ParserErrorKind::MissingName { what } => format!("Expected {} name", what),
            ParserErrorKind::GenericError { message } => message.clone(),
            ParserErrorKind::IoError { message } => message.clone(),
        };
        write!(f, ": {}", message)
    }
}

impl std::error::Error for ParserError {}

pub type ParserResult<T> = Result<T, ParserError>;

/// Outcome of a parse that keeps going after errors: a (possibly partial)
/// value plus everything that was reported along the way.
#[derive(Debug)]
pub struct MultipleParserResult<T> {
    pub result: Option<T>,
    pub errors: Vec<ParserError>,
}

impl<T> MultipleParserResult<T> {
    pub fn success(value: T) -> Self {
        Self { result: Some(value), errors: Vec::new() }
    }

    pub fn failure(errors: Vec<ParserError>) -> Self {
        Self { result: None, errors }
    }

    pub fn with_errors(value: T, errors: Vec<ParserError>) -> Self {
        Self { result: Some(value), errors }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
