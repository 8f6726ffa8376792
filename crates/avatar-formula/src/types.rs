//! Expression syntax tree and formula errors.

use avatar_core::value::Value;

/// A parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal number, string or boolean.
    Literal(Value),

    /// One of the bound names (`value`, `trigger_value`, `avatar`).
    Name(String),

    /// List display, e.g. `[*value, 1]`.
    List(Vec<ListItem>),

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Short-circuiting `and` / `or`.
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// `then if condition else otherwise`.
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },

    /// Call of a built-in function.
    Call {
        function: String,
        args: Vec<Expr>,
    },

    /// `target[index]`.
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },

    /// `target.name`, used for `avatar.<organ>.<indicator>`.
    Attribute {
        target: Box<Expr>,
        name: String,
    },
}

impl Expr {
    /// Direct subexpressions, in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Self::Literal(_) | Self::Name(_) => Vec::new(),
            Self::List(items) => items.iter().map(ListItem::expr).collect(),
            Self::Unary { operand, .. } => vec![operand.as_ref()],
            Self::Binary { lhs, rhs, .. } | Self::Logical { lhs, rhs, .. } => {
                vec![lhs.as_ref(), rhs.as_ref()]
            }
            Self::Conditional {
                condition,
                then,
                otherwise,
            } => vec![then.as_ref(), condition.as_ref(), otherwise.as_ref()],
            Self::Call { args, .. } => args.iter().collect(),
            Self::Index { target, index } => vec![target.as_ref(), index.as_ref()],
            Self::Attribute { target, .. } => vec![target.as_ref()],
        }
    }

    /// Height of the tree, counted without recursion.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((expr, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(expr.children().into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

/// An element of a list display.
#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    Single(Expr),
    /// `*expr`: splice the elements of a list.
    Spread(Expr),
}

impl ListItem {
    pub fn expr(&self) -> &Expr {
        match self {
            Self::Single(expr) | Self::Spread(expr) => expr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Pow => "**",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Errors raised while parsing or evaluating a formula expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("unknown name: {0}")]
    UnknownName(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{function}() takes {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: &'static str,
        found: usize,
    },

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("integer overflow")]
    Overflow,

    #[error("math domain error: {0}")]
    Domain(String),

    #[error("result too large ({0} elements)")]
    TooLarge(usize),

    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),
}

impl FormulaError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    /// Returns `true` for errors found before evaluation starts.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}

/// Convenience alias used throughout the formula crate.
pub type Result<T> = std::result::Result<T, FormulaError>;
