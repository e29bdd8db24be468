use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    // Compile time. Scripts are authored data, so every error names the
    // owning rule and the offending source.
    #[error("rule '{rule_id}': unrecognized tag-script statement `{snippet}`")]
    UnrecognizedStatement { rule_id: String, snippet: String },

    #[error("rule '{rule_id}': unrecognized tag-script expression `{snippet}`")]
    UnrecognizedExpression { rule_id: String, snippet: String },

    #[error("rule '{rule_id}': malformed {function}(...) in `{snippet}`: {reason}")]
    MalformedCall {
        rule_id: String,
        function: &'static str,
        snippet: String,
        reason: String,
    },

    #[error("rule '{rule_id}': empty operand in concatenation `{snippet}`")]
    EmptyOperand { rule_id: String, snippet: String },

    // Run time.
    #[error("timex[\"{0}\"] is not defined")]
    UndefinedKey(String),

    #[error("{operator} expects integer operands, got {lhs:?} and {rhs:?}")]
    NonIntegerOperand {
        operator: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("{operator} overflowed on {lhs:?} and {rhs:?}")]
    ArithmeticOverflow {
        operator: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("substring start {start} with length {length} is out of bounds for {input:?}")]
    OutOfBounds {
        input: String,
        start: i64,
        length: i64,
    },

    #[error("normalization table '{0}' is not defined")]
    UnknownTable(String),
}

impl ScriptError {
    /// True for errors raised while compiling a script rather than running it.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            ScriptError::UnrecognizedStatement { .. }
                | ScriptError::UnrecognizedExpression { .. }
                | ScriptError::MalformedCall { .. }
                | ScriptError::EmptyOperand { .. }
        )
    }
}
