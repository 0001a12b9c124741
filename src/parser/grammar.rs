//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::{self, Token};
use crate::ParseError;

/// Deepest block or list nesting accepted. Parsing, building and rendering
/// all recurse once per level.
pub const MAX_NESTING: usize = 128;

/// Parse template source code into an AST
pub fn parse(input: &str) -> Result<Document, Vec<ParseError>> {
    let len = input.len();

    // Lex everything up front so unrecognized characters are reported
    // instead of being skipped
    let mut tokens = Vec::new();
    let mut lex_errors = Vec::new();
    for (result, span) in lexer::lex(input) {
        match result {
            Ok(tok) => tokens.push((tok, SimpleSpan::from(span))),
            Err(error) => {
                lex_errors.push(ParseError::lexical(error, &input[span.clone()], span))
            }
        }
    }
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    check_nesting(&tokens)?;

    let token_stream = Stream::from_iter(tokens).map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn check_nesting(tokens: &[(Token, SimpleSpan)]) -> Result<(), Vec<ParseError>> {
    let mut depth = 0usize;
    for (token, span) in tokens {
        match token {
            Token::Do | Token::BraceOpen | Token::BracketOpen | Token::ParenOpen => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(vec![ParseError::TooDeep {
                        span: span.start..span.end,
                        limit: MAX_NESTING,
                    }]);
                }
            }
            Token::End | Token::BraceClose | Token::BracketClose | Token::ParenClose => {
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Document, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let string_literal = select! {
        Token::String(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    // Values: scalars, negative integers and (nested) lists
    let value = recursive(|value| {
        let list = value
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(OptionValue::List);

        choice((
            select! {
                Token::String(s) => OptionValue::String(s),
                Token::Integer(n) => OptionValue::Integer(n),
                Token::Symbol(s) => OptionValue::Symbol(s),
                Token::True => OptionValue::Boolean(true),
                Token::False => OptionValue::Boolean(false),
            },
            just(Token::Minus)
                .ignore_then(select! { Token::Integer(n) => n })
                .map(|n| OptionValue::Integer(-n)),
            list,
        ))
    });

    let spanned_value = value.map_with(|v, e| Spanned::new(v, span_range(&e.span())));

    // Option keys: `:image =>`, `"image" =>` or `image:`
    let option_key = choice((
        select! {
            Token::Symbol(s) => s,
            Token::String(s) => s,
        }
        .then_ignore(just(Token::FatArrow)),
        select! { Token::Ident(s) => s }.then_ignore(just(Token::Colon)),
    ))
    .map_with(|key, e| Spanned::new(key, span_range(&e.span())));

    let option = option_key
        .then(spanned_value.clone())
        .map(|(key, value)| OptionDecl { key, value });

    // Argument list: the name followed by comma-separated options
    let arglist = string_literal
        .clone()
        .then(
            just(Token::Comma)
                .ignore_then(option)
                .repeated()
                .collect::<Vec<_>>(),
        );

    // Arguments may be wrapped in parentheses: `server("web", :count => 2)`
    let args = choice((
        arglist
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        arglist,
    ));

    let aka_decl = just(Token::Aka)
        .ignore_then(string_literal.clone())
        .then_ignore(just(Token::Comma))
        .then(string_literal.clone())
        .map(|(from, to)| AkaDecl { from, to });

    let override_decl = just(Token::Override)
        .ignore_then(string_literal.clone())
        .then_ignore(just(Token::Comma))
        .then(spanned_value)
        .map(|(path, value)| OverrideDecl { path, value });

    let server_decl = just(Token::Server)
        .ignore_then(args.clone())
        .map(|(name, options)| ServerDecl { name, options });

    // Recursive statement parser
    let statement = recursive(|stmt| {
        // Body: `do ... end` or `{ ... }`
        let body = choice((
            stmt.clone()
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::Do), just(Token::End)),
            stmt.clone()
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::BraceOpen), just(Token::BraceClose)),
        ));

        let system_decl = just(Token::System)
            .ignore_then(args.clone())
            .then(body.or_not())
            .map(|((name, options), body)| SystemDecl {
                name,
                options,
                body,
            });

        choice((
            system_decl.map(Statement::System),
            server_decl.clone().map(Statement::Server),
            aka_decl.clone().map(Statement::Aka),
            override_decl.clone().map(Statement::Override),
        ))
        .map_with(|s, e| Spanned::new(s, span_range(&e.span())))
        .boxed()
    });

    // Document is a list of statements
    statement
        .repeated()
        .collect()
        .then_ignore(end())
        .map(|statements| Document { statements })
}
