/// A tag-script expression. Every variant evaluates to a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// A quoted or bare literal.
    Constant(String),
    /// `value`: the text captured by the group the script is attached to.
    ValueEcho,
    /// `timex["key"]`
    ArrayLookup(String),
    /// `lhs + rhs`
    Concat(Box<Expression>, Box<Expression>),
    /// `Sum(lhs, rhs)`
    Sum(Box<Expression>, Box<Expression>),
    /// `Minus(lhs, rhs)`, or `Minus(operand)` for negation.
    Minus(Box<Expression>, Option<Box<Expression>>),
    /// `Mult(lhs, rhs)`
    Mult(Box<Expression>, Box<Expression>),
    /// `Normalize("#table", operand)`; `table` is stored without the `#`.
    Normalize {
        table: String,
        operand: Box<Expression>,
    },
    /// `Substring(operand, start[, length])`
    Substring {
        operand: Box<Expression>,
        start: Box<Expression>,
        length: Option<Box<Expression>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `timex["key"] = expression`
    Assign { key: String, expression: Expression },
}

impl Expression {
    pub fn constant(text: impl Into<String>) -> Self {
        Expression::Constant(text.into())
    }

    pub fn lookup(key: impl Into<String>) -> Self {
        Expression::ArrayLookup(key.into())
    }
}
