//! Lexer for the system template language using logos

use logos::Logos;

use crate::parser::ast::Span;

/// Why a stretch of input could not be turned into a token
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexError {
    #[default]
    UnexpectedInput,
    IntegerOutOfRange,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(error = LexError)]
pub enum Token {
    // Declaration keywords
    #[token("system")]
    System,
    #[token("server")]
    Server,
    #[token("aka")]
    Aka,
    #[token("override")]
    Override,

    // Block keywords
    #[token("do")]
    Do,
    #[token("end")]
    End,

    // Boolean literals
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Key/value separator (`:image => "ami-1"`)
    #[token("=>")]
    FatArrow,

    #[token("-")]
    Minus,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r":[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Symbol(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    String(String),

    #[regex(r"[0-9][0-9_]*", |lex| {
        lex.slice()
            .replace('_', "")
            .parse::<i64>()
            .map_err(|_| LexError::IntegerOutOfRange)
    })]
    Integer(i64),

    // Comments (skip)
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,
}

/// Strip the surrounding quotes of a string literal and resolve escapes
fn unescape(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Lex input string into tokens with spans.
///
/// Unrecognized input is yielded as an error so the caller can report it
/// rather than silently dropping characters.
pub fn lex(input: &str) -> impl Iterator<Item = (Result<Token, LexError>, Span)> + '_ {
    Token::lexer(input).spanned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input).filter_map(|(t, _)| t.ok()).collect()
    }

    #[test]
    fn test_declaration_keywords() {
        assert_eq!(
            tokens("system server aka override"),
            vec![Token::System, Token::Server, Token::Aka, Token::Override]
        );
    }

    #[test]
    fn test_block_keywords() {
        assert_eq!(tokens("do end"), vec![Token::Do, Token::End]);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(
            tokens("systems ending"),
            vec![
                Token::Ident("systems".to_string()),
                Token::Ident("ending".to_string())
            ]
        );
    }

    #[test]
    fn test_symbol_and_fat_arrow() {
        assert_eq!(
            tokens(r#":image => "ami-f8b35e91""#),
            vec![
                Token::Symbol("image".to_string()),
                Token::FatArrow,
                Token::String("ami-f8b35e91".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_style_key() {
        assert_eq!(
            tokens("count: 8"),
            vec![
                Token::Ident("count".to_string()),
                Token::Colon,
                Token::Integer(8)
            ]
        );
    }

    #[test]
    fn test_strings_keep_colons() {
        assert_eq!(
            tokens(r#""chef:gepo-2.7" 'galaxy:load-balancer-9.3'"#),
            vec![
                Token::String("chef:gepo-2.7".to_string()),
                Token::String("galaxy:load-balancer-9.3".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#""say \"hi\"\n""#),
            vec![Token::String("say \"hi\"\n".to_string())]
        );
    }

    #[test]
    fn test_integers() {
        assert_eq!(
            tokens("8 1_000 -2"),
            vec![
                Token::Integer(8),
                Token::Integer(1000),
                Token::Minus,
                Token::Integer(2)
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            tokens("# aka \"a\", \"b\"\nsystem # trailing\n"),
            vec![Token::System]
        );
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            tokens("( ) [ ] { } , :"),
            vec![
                Token::ParenOpen,
                Token::ParenClose,
                Token::BracketOpen,
                Token::BracketClose,
                Token::BraceOpen,
                Token::BraceClose,
                Token::Comma,
                Token::Colon,
            ]
        );
    }

    #[test]
    fn test_invalid_character_is_reported() {
        let results: Vec<_> = lex("system @").collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, Ok(Token::System));
        assert_eq!(results[1].0, Err(LexError::UnexpectedInput));
        assert_eq!(results[1].1, 7..8);
    }

    #[test]
    fn test_integer_out_of_range() {
        let results: Vec<_> = lex("99999999999999999999 9223372036854775807").collect();
        assert_eq!(results[0].0, Err(LexError::IntegerOutOfRange));
        assert_eq!(results[0].1, 0..20);
        assert_eq!(results[1].0, Ok(Token::Integer(i64::MAX)));
    }

    #[test]
    fn test_complete_declaration() {
        let input = r#"
            server "resolver", :image => "ami-f8b35e91",
                               :install => ["chef:galaxy"],
                               :count => 8
        "#;
        assert_eq!(
            tokens(input),
            vec![
                Token::Server,
                Token::String("resolver".to_string()),
                Token::Comma,
                Token::Symbol("image".to_string()),
                Token::FatArrow,
                Token::String("ami-f8b35e91".to_string()),
                Token::Comma,
                Token::Symbol("install".to_string()),
                Token::FatArrow,
                Token::BracketOpen,
                Token::String("chef:galaxy".to_string()),
                Token::BracketClose,
                Token::Comma,
                Token::Symbol("count".to_string()),
                Token::FatArrow,
                Token::Integer(8),
            ]
        );
    }
}
