//! Parser for formula expressions.
//!
//! Precedence, lowest first:
//!
//! | form                     | associativity |
//! |--------------------------|---------------|
//! | `a if cond else b`       | right         |
//! | `or`                     | left          |
//! | `and`                    | left          |
//! | `not`                    | prefix        |
//! | `== != < <= > >=`        | none          |
//! | `+ -`                    | left          |
//! | `* / %`                  | left          |
//! | unary `-` `+`            | prefix        |
//! | `**`                     | right         |
//! | call, index, attribute   | postfix       |
//!
//! Input size is bounded before parsing: at most [`MAX_TOKENS`] tokens and
//! [`MAX_NESTING`] open brackets. The finished tree may be at most
//! [`MAX_DEPTH`] levels deep, so evaluation never recurses further than that.

use avatar_core::value::Value;
use chumsky::error::RichReason;
use chumsky::input::ValueInput;
use chumsky::pratt::*;
use chumsky::prelude::*;

use crate::lexer::{Span, Spanned, Token, tokenize};
use crate::types::{BinaryOp, Expr, FormulaError, ListItem, LogicalOp, Result, UnaryOp};

/// Maximum number of tokens in one expression.
pub const MAX_TOKENS: usize = 256;

/// Maximum nesting of parentheses and brackets.
pub const MAX_NESTING: usize = 32;

/// Maximum height of a parsed expression tree.
pub const MAX_DEPTH: usize = 64;

pub type ParseError<'tokens, 'src> = Rich<'tokens, Token<'src>, Span>;

/// Parses a complete expression.
pub fn parse(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    check_size(&tokens, source.len())?;

    let eoi: Span = (source.len()..source.len()).into();
    let expr = expression()
        .then_ignore(end())
        .parse(tokens.as_slice().map(eoi, |(token, span)| (token, span)))
        .into_result()
        .map_err(|errors| parse_error(&errors, source.len()))?;

    if expr.depth() > MAX_DEPTH {
        return Err(FormulaError::syntax(0, "expression nested too deeply"));
    }
    Ok(expr)
}

fn check_size(tokens: &[Spanned<Token<'_>>], end: usize) -> Result<()> {
    if tokens.is_empty() {
        return Err(FormulaError::syntax(end, "empty expression"));
    }
    if let Some((_, span)) = tokens.get(MAX_TOKENS) {
        return Err(FormulaError::syntax(
            span.start,
            format!("expression too long (more than {MAX_TOKENS} tokens)"),
        ));
    }
    let mut open = 0usize;
    for (token, span) in tokens {
        match token {
            Token::LParen | Token::LBracket => {
                open += 1;
                if open > MAX_NESTING {
                    return Err(FormulaError::syntax(
                        span.start,
                        "expression nested too deeply",
                    ));
                }
            }
            Token::RParen | Token::RBracket => open = open.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn parse_error(errors: &[ParseError<'_, '_>], end: usize) -> FormulaError {
    let Some(error) = errors.first() else {
        return FormulaError::syntax(end, "invalid expression");
    };
    let message = match (error.reason(), error.found()) {
        (RichReason::Custom(message), _) => message.clone(),
        (_, Some(token)) => format!("unexpected {token}"),
        (_, None) => "unexpected end of expression".to_owned(),
    };
    FormulaError::syntax(error.span().start, message)
}

enum Suffix {
    Index(Expr),
    Attribute(String),
}

fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary {
        op,
        operand: Box::new(operand),
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn logical(op: LogicalOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Logical {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

pub fn expression<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Expr, extra::Err<ParseError<'tokens, 'src>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    recursive(|expression| {
        let name = select! { Token::Ident(name) => name };

        let literal = select! {
            Token::Int(i) => Value::Int(i),
            Token::Float(x) => Value::Float(x),
            Token::Str(s) => Value::Str(s),
            Token::True => Value::Bool(true),
            Token::False => Value::Bool(false),
        }
        .map(Expr::Literal);

        let call = name
            .clone()
            .then(
                expression
                    .clone()
                    .separated_by(just(Token::Comma))
                    .allow_trailing()
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|(function, args)| Expr::Call {
                function: String::from(function),
                args,
            });

        let item = just(Token::Star)
            .ignore_then(expression.clone())
            .map(ListItem::Spread)
            .or(expression.clone().map(ListItem::Single));

        let list = item
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(Expr::List);

        let nested = expression
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let atom = choice((
            literal,
            call,
            name.clone().map(|name| Expr::Name(String::from(name))),
            list,
            nested,
        ));

        let postfix = atom.foldl(
            choice((
                expression
                    .clone()
                    .delimited_by(just(Token::LBracket), just(Token::RBracket))
                    .map(Suffix::Index),
                just(Token::Dot)
                    .ignore_then(name)
                    .map(|name| Suffix::Attribute(String::from(name))),
            ))
            .repeated(),
            |target, suffix| match suffix {
                Suffix::Index(index) => Expr::Index {
                    target: Box::new(target),
                    index: Box::new(index),
                },
                Suffix::Attribute(name) => Expr::Attribute {
                    target: Box::new(target),
                    name,
                },
            },
        );

        let arithmetic = postfix
            .pratt((
                infix(right(7), just(Token::DoubleStar), |l, _, r, _| {
                    binary(BinaryOp::Pow, l, r)
                }),
                prefix(6, just(Token::Minus), |_, operand, _| {
                    unary(UnaryOp::Neg, operand)
                }),
                prefix(6, just(Token::Plus), |_, operand, _| {
                    unary(UnaryOp::Pos, operand)
                }),
                infix(left(5), just(Token::Star), |l, _, r, _| {
                    binary(BinaryOp::Mul, l, r)
                }),
                infix(left(5), just(Token::Slash), |l, _, r, _| {
                    binary(BinaryOp::Div, l, r)
                }),
                infix(left(5), just(Token::Percent), |l, _, r, _| {
                    binary(BinaryOp::Rem, l, r)
                }),
                infix(left(4), just(Token::Plus), |l, _, r, _| {
                    binary(BinaryOp::Add, l, r)
                }),
                infix(left(4), just(Token::Minus), |l, _, r, _| {
                    binary(BinaryOp::Sub, l, r)
                }),
            ))
            .boxed();

        // At most one comparison per operand: `1 < 2 < 3` is rejected.
        let comparison_op = select! {
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::Ne,
            Token::Less => BinaryOp::Lt,
            Token::LessEq => BinaryOp::Le,
            Token::Greater => BinaryOp::Gt,
            Token::GreaterEq => BinaryOp::Ge,
        };
        let comparison = arithmetic
            .clone()
            .then(comparison_op.then(arithmetic).or_not())
            .map(|(lhs, rest)| match rest {
                Some((op, rhs)) => binary(op, lhs, rhs),
                None => lhs,
            });

        let boolean = comparison
            .pratt((
                prefix(3, just(Token::Not), |_, operand, _| {
                    unary(UnaryOp::Not, operand)
                }),
                infix(left(2), just(Token::And), |l, _, r, _| {
                    logical(LogicalOp::And, l, r)
                }),
                infix(left(1), just(Token::Or), |l, _, r, _| {
                    logical(LogicalOp::Or, l, r)
                }),
            ))
            .boxed();

        boolean
            .clone()
            .then(
                just(Token::If)
                    .ignore_then(boolean)
                    .then_ignore(just(Token::Else))
                    .then(expression)
                    .or_not(),
            )
            .map(|(then, branch)| match branch {
                Some((condition, otherwise)) => Expr::Conditional {
                    condition: Box::new(condition),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                },
                None => then,
            })
    })
}
