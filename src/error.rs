//! Error types for lexing and parsing

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::ast::Span;
use crate::parser::lexer::{LexError, Token};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unrecognized input at {span:?}: '{text}'")]
    Lexical { span: Span, text: String },

    #[error("Integer out of range at {span:?}: {text}")]
    IntegerOutOfRange { span: Span, text: String },

    #[error("Nesting deeper than {limit} levels at {span:?}")]
    TooDeep { span: Span, limit: usize },

    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    pub fn lexical(error: LexError, text: impl Into<String>, span: Span) -> Self {
        let text = text.into();
        match error {
            LexError::UnexpectedInput => Self::Lexical { span, text },
            LexError::IntegerOutOfRange => Self::IntegerOutOfRange { span, text },
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            ParseError::Lexical { span, .. }
            | ParseError::IntegerOutOfRange { span, .. }
            | ParseError::TooDeep { span, .. }
            | ParseError::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            ParseError::Lexical { span, text } => report(
                source,
                filename,
                span,
                "Unrecognized input",
                &format!("'{}' is not part of the template language", text),
            ),
            ParseError::IntegerOutOfRange { span, text } => report(
                source,
                filename,
                span,
                "Integer out of range",
                &format!("{} does not fit in a 64-bit integer", text),
            ),
            ParseError::TooDeep { span, limit } => report(
                source,
                filename,
                span,
                "Nesting too deep",
                &format!("blocks and lists may nest at most {} levels", limit),
            ),
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };
                report(
                    source,
                    filename,
                    span,
                    message,
                    &format!("{}{}", message, expected_str),
                )
            }
        }
    }
}

/// Render a single-label ariadne report into a string
pub(crate) fn report(
    source: &str,
    filename: &str,
    span: &Span,
    message: &str,
    label: &str,
) -> String {
    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(message)
        .with_label(
            Label::new((filename, span.clone()))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf);

    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{}: {}", filename, message),
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of input".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        // Format expected tokens nicely
        let mut expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();
        expected.sort();
        expected.dedup();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Symbol(s) => format!("symbol ':{}'", s),
        Token::String(s) => format!("string \"{}\"", s),
        Token::Integer(n) => format!("integer {}", n),
        Token::System => "keyword 'system'".to_string(),
        Token::Server => "keyword 'server'".to_string(),
        Token::Aka => "keyword 'aka'".to_string(),
        Token::Override => "keyword 'override'".to_string(),
        Token::Do => "keyword 'do'".to_string(),
        Token::End => "keyword 'end'".to_string(),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::FatArrow => "'=>'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Comment => "comment".to_string(),
    }
}
