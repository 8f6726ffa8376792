//! Tokenizer for formula expressions.

use std::fmt;

use chumsky::error::RichReason;
use chumsky::prelude::*;

use crate::types::{FormulaError, Result};

pub type Span = SimpleSpan;

/// A token and the byte range it covers.
pub type Spanned<T> = (T, Span);

pub type LexError<'src> = Rich<'src, char, Span>;

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(&'src str),
    // Keywords
    And,
    Or,
    Not,
    If,
    Else,
    True,
    False,
    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Ident(name) => f.write_str(name),
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
            Self::Not => f.write_str("not"),
            Self::If => f.write_str("if"),
            Self::Else => f.write_str("else"),
            Self::True => f.write_str("true"),
            Self::False => f.write_str("false"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::DoubleStar => f.write_str("**"),
            Self::Slash => f.write_str("/"),
            Self::Percent => f.write_str("%"),
            Self::EqEq => f.write_str("=="),
            Self::NotEq => f.write_str("!="),
            Self::Less => f.write_str("<"),
            Self::LessEq => f.write_str("<="),
            Self::Greater => f.write_str(">"),
            Self::GreaterEq => f.write_str(">="),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::LBracket => f.write_str("["),
            Self::RBracket => f.write_str("]"),
            Self::Comma => f.write_str(","),
            Self::Dot => f.write_str("."),
        }
    }
}

pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, extra::Err<LexError<'src>>> {
    // `1.5`, `2e3`, `1.5e-2`. A dot not followed by a digit is an attribute access.
    let number = text::digits(10)
        .then(just('.').then(text::digits(10)).or_not())
        .then(one_of("eE").then(one_of("+-").or_not()).then(text::digits(10)).or_not())
        .to_slice()
        .try_map(|text: &str, span| {
            if text.contains(['.', 'e', 'E']) {
                text.parse::<f64>()
                    .map(Token::Float)
                    .map_err(|e| Rich::custom(span, format!("invalid number {text}: {e}")))
            } else {
                text.parse::<i64>().map(Token::Int).map_err(|_| {
                    Rich::custom(span, format!("integer literal out of range: {text}"))
                })
            }
        });

    let escape = just('\\').ignore_then(choice((
        just('n').to('\n'),
        just('t').to('\t'),
        just('\\'),
        just('"'),
        just('\''),
    )));

    let double_quoted = just('"')
        .ignore_then(
            none_of("\\\"")
                .or(escape.clone())
                .repeated()
                .collect::<String>(),
        )
        .then_ignore(just('"'));

    let single_quoted = just('\'')
        .ignore_then(none_of("\\'").or(escape).repeated().collect::<String>())
        .then_ignore(just('\''));

    let word = text::ascii::ident().map(|word: &'src str| match word {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "if" => Token::If,
        "else" => Token::Else,
        "true" | "True" => Token::True,
        "false" | "False" => Token::False,
        _ => Token::Ident(word),
    });

    let operator = choice((
        just("**").to(Token::DoubleStar),
        just("==").to(Token::EqEq),
        just("!=").to(Token::NotEq),
        just("<=").to(Token::LessEq),
        just(">=").to(Token::GreaterEq),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('<').to(Token::Less),
        just('>').to(Token::Greater),
    ));

    let punctuation = choice((
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
    ));

    let token = choice((
        number,
        double_quoted.map(Token::Str),
        single_quoted.map(Token::Str),
        word,
        operator,
        punctuation,
    ));

    token
        .map_with(|token, extra| (token, extra.span()))
        .padded()
        .repeated()
        .collect()
        .padded()
        .then_ignore(end())
}

/// Splits an expression into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token<'_>>>> {
    lexer()
        .parse(source)
        .into_result()
        .map_err(|errors| lex_error(&errors, source.len()))
}

fn lex_error(errors: &[LexError<'_>], end: usize) -> FormulaError {
    let Some(error) = errors.first() else {
        return FormulaError::syntax(end, "invalid expression");
    };
    let message = match (error.reason(), error.found()) {
        (RichReason::Custom(message), _) => message.clone(),
        (_, Some(ch)) => format!("unexpected character {ch:?}"),
        (_, None) => "unexpected end of expression".to_owned(),
    };
    FormulaError::syntax(error.span().start, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(
            tokens("value + trigger_value * 10"),
            vec![
                Token::Ident("value"),
                Token::Plus,
                Token::Ident("trigger_value"),
                Token::Star,
                Token::Int(10),
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(tokens("1 1.5 2e3 1.5e-2"), vec![
            Token::Int(1),
            Token::Float(1.5),
            Token::Float(2000.0),
            Token::Float(0.015),
        ]);
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            tokens("** == != <= >= < >"),
            vec![
                Token::DoubleStar,
                Token::EqEq,
                Token::NotEq,
                Token::LessEq,
                Token::GreaterEq,
                Token::Less,
                Token::Greater,
            ]
        );
    }

    #[test]
    fn spread_list() {
        assert_eq!(
            tokens("[*value, 1]"),
            vec![
                Token::LBracket,
                Token::Star,
                Token::Ident("value"),
                Token::Comma,
                Token::Int(1),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(
            tokens(r#"'it\'s' "a\tb""#),
            vec![Token::Str("it's".into()), Token::Str("a\tb".into())]
        );
    }

    #[test]
    fn keywords() {
        assert_eq!(
            tokens("not a and b or True"),
            vec![
                Token::Not,
                Token::Ident("a"),
                Token::And,
                Token::Ident("b"),
                Token::Or,
                Token::True,
            ]
        );
    }

    #[test]
    fn attribute_chain() {
        assert_eq!(
            tokens("avatar.heart.rate"),
            vec![
                Token::Ident("avatar"),
                Token::Dot,
                Token::Ident("heart"),
                Token::Dot,
                Token::Ident("rate"),
            ]
        );
    }

    #[test]
    fn positions_are_byte_offsets() {
        let spanned = tokenize("a  + b").unwrap();
        assert_eq!(spanned[1].1.start, 3);
        assert_eq!(spanned[2].1.start, 5);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(tokens("  value \n"), vec![Token::Ident("value")]);
        assert!(tokens("   ").is_empty());
    }

    #[test]
    fn unterminated_string() {
        assert!(tokenize("'abc").unwrap_err().is_syntax());
    }

    #[test]
    fn unexpected_character() {
        match tokenize("value ; 1").unwrap_err() {
            FormulaError::Syntax { position, message } => {
                assert_eq!(position, 6);
                assert_eq!(message, "unexpected character ';'");
            }
            other => panic!("expected Syntax, got {:?}", other),
        }
    }

    #[test]
    fn int_literal_out_of_range() {
        assert!(tokenize("99999999999999999999").unwrap_err().is_syntax());
        assert_eq!(tokens("9223372036854775807"), vec![Token::Int(i64::MAX)]);
    }
}
