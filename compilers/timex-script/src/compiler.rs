//! Tag-script compiler.
//!
//! A script is a sequence of statements separated by `;` or line breaks.
//! Each statement and expression is compiled by probing a fixed, ordered
//! table of shapes; the first shape that recognizes the source wins, so the
//! order of each table is its precedence.

use std::ops::RangeInclusive;

use crate::ast::{Expression, Statement};
use crate::error::ScriptError;
use crate::parser::{assignment_target, call_arguments, split_top_level, whole_literal, whole_lookup};

/// A probe returns `Ok(None)` when the source does not have its shape, and
/// an error when the shape matched but its contents did not compile.
pub type StatementGrammar = fn(&str, &str) -> Result<Option<Statement>, ScriptError>;
pub type ExpressionGrammar = fn(&str, &str) -> Result<Option<Expression>, ScriptError>;

pub const STATEMENT_GRAMMARS: &[(&str, StatementGrammar)] = &[("assignment", assignment)];

/// Concatenation binds loosest and is probed first. Calls are probed before
/// the literal fallback.
pub const EXPRESSION_GRAMMARS: &[(&str, ExpressionGrammar)] = &[
    ("concatenation", concatenation),
    ("Normalize", normalize),
    ("Substring", substring),
    ("Sum", sum),
    ("Minus", minus),
    ("Mult", mult),
    ("lookup", lookup),
    ("value", value_echo),
    ("constant", constant),
];

fn is_statement_separator(c: char) -> bool {
    matches!(c, ';' | '\n' | '\r')
}

/// Compiles a whole script. Blank statements are dropped; order is kept.
pub fn compile_statements(source: &str, rule_id: &str) -> Result<Vec<Statement>, ScriptError> {
    split_top_level(source, is_statement_separator)
        .into_iter()
        .filter(|statement| !statement.trim().is_empty())
        .map(|statement| compile_statement(statement, rule_id))
        .collect()
}

pub fn compile_statement(source: &str, rule_id: &str) -> Result<Statement, ScriptError> {
    let source = source.trim();
    for (_, grammar) in STATEMENT_GRAMMARS {
        if let Some(statement) = grammar(source, rule_id)? {
            return Ok(statement);
        }
    }

    Err(ScriptError::UnrecognizedStatement {
        rule_id: rule_id.to_string(),
        snippet: source.to_string(),
    })
}

pub fn compile_expression(source: &str, rule_id: &str) -> Result<Expression, ScriptError> {
    let source = source.trim();
    if !source.is_empty() {
        for (_, grammar) in EXPRESSION_GRAMMARS {
            if let Some(expression) = grammar(source, rule_id)? {
                return Ok(expression);
            }
        }
    }

    Err(ScriptError::UnrecognizedExpression {
        rule_id: rule_id.to_string(),
        snippet: source.to_string(),
    })
}

// --- statements ---

fn assignment(source: &str, rule_id: &str) -> Result<Option<Statement>, ScriptError> {
    let Ok((rest, key)) = assignment_target(source) else {
        return Ok(None);
    };

    let expression = compile_expression(rest, rule_id)?;
    Ok(Some(Statement::Assign { key, expression }))
}

// --- expressions ---

fn concatenation(source: &str, rule_id: &str) -> Result<Option<Expression>, ScriptError> {
    let operands = split_top_level(source, |c| c == '+');
    if operands.len() < 2 {
        return Ok(None);
    }

    if operands.iter().any(|operand| operand.trim().is_empty()) {
        return Err(ScriptError::EmptyOperand {
            rule_id: rule_id.to_string(),
            snippet: source.to_string(),
        });
    }

    let mut operands = operands.into_iter();
    let mut expression = compile_expression(operands.next().unwrap_or_default(), rule_id)?;
    for operand in operands {
        let rhs = compile_expression(operand, rule_id)?;
        expression = Expression::Concat(Box::new(expression), Box::new(rhs));
    }
    Ok(Some(expression))
}

fn normalize(source: &str, rule_id: &str) -> Result<Option<Expression>, ScriptError> {
    let Some(arguments) = call_arguments(source, "Normalize") else {
        return Ok(None);
    };

    let parts = split_arguments(source, arguments, rule_id, "Normalize", 2..=2)?;
    let table = whole_literal(parts[0]).ok_or_else(|| malformed(source, rule_id, "Normalize", "the table id must be a literal"))?;
    let table = table.trim_start_matches('#').to_string();
    if table.is_empty() {
        return Err(malformed(source, rule_id, "Normalize", "the table id is empty"));
    }

    let operand = Box::new(compile_expression(parts[1], rule_id)?);
    Ok(Some(Expression::Normalize { table, operand }))
}

fn substring(source: &str, rule_id: &str) -> Result<Option<Expression>, ScriptError> {
    let Some(mut arguments) = call(source, rule_id, "Substring", 2..=3)? else {
        return Ok(None);
    };

    let length = (arguments.len() == 3).then(|| arguments.remove(2)).map(Box::new);
    let start = Box::new(arguments.remove(1));
    let operand = Box::new(arguments.remove(0));
    Ok(Some(Expression::Substring { operand, start, length }))
}

fn sum(source: &str, rule_id: &str) -> Result<Option<Expression>, ScriptError> {
    Ok(binary(source, rule_id, "Sum")?.map(|(lhs, rhs)| Expression::Sum(lhs, rhs)))
}

fn mult(source: &str, rule_id: &str) -> Result<Option<Expression>, ScriptError> {
    Ok(binary(source, rule_id, "Mult")?.map(|(lhs, rhs)| Expression::Mult(lhs, rhs)))
}

/// `Minus(a, b)` subtracts; `Minus(a)`, with no top-level comma, negates.
fn minus(source: &str, rule_id: &str) -> Result<Option<Expression>, ScriptError> {
    let Some(mut arguments) = call(source, rule_id, "Minus", 1..=2)? else {
        return Ok(None);
    };

    let rhs = (arguments.len() == 2).then(|| arguments.remove(1)).map(Box::new);
    let lhs = Box::new(arguments.remove(0));
    Ok(Some(Expression::Minus(lhs, rhs)))
}

fn lookup(source: &str, _rule_id: &str) -> Result<Option<Expression>, ScriptError> {
    Ok(whole_lookup(source).map(Expression::ArrayLookup))
}

fn value_echo(source: &str, _rule_id: &str) -> Result<Option<Expression>, ScriptError> {
    Ok((source == "value").then_some(Expression::ValueEcho))
}

fn constant(source: &str, _rule_id: &str) -> Result<Option<Expression>, ScriptError> {
    Ok(whole_literal(source).map(Expression::Constant))
}

// --- helpers ---

type Operands = (Box<Expression>, Box<Expression>);

fn binary(source: &str, rule_id: &str, function: &'static str) -> Result<Option<Operands>, ScriptError> {
    let Some(mut arguments) = call(source, rule_id, function, 2..=2)? else {
        return Ok(None);
    };

    let rhs = Box::new(arguments.remove(1));
    let lhs = Box::new(arguments.remove(0));
    Ok(Some((lhs, rhs)))
}

/// Recognizes `function(...)` and compiles each argument.
fn call(
    source: &str,
    rule_id: &str,
    function: &'static str,
    arity: RangeInclusive<usize>,
) -> Result<Option<Vec<Expression>>, ScriptError> {
    let Some(arguments) = call_arguments(source, function) else {
        return Ok(None);
    };

    split_arguments(source, arguments, rule_id, function, arity)?
        .into_iter()
        .map(|argument| compile_expression(argument, rule_id))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn split_arguments<'a>(
    source: &str,
    arguments: &'a str,
    rule_id: &str,
    function: &'static str,
    arity: RangeInclusive<usize>,
) -> Result<Vec<&'a str>, ScriptError> {
    let parts = if arguments.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(arguments, |c| c == ',')
    };

    if !arity.contains(&parts.len()) {
        let expected = if arity.start() == arity.end() {
            arity.start().to_string()
        } else {
            format!("{} to {}", arity.start(), arity.end())
        };
        return Err(malformed(
            source,
            rule_id,
            function,
            &format!("expected {} argument(s), found {}", expected, parts.len()),
        ));
    }

    if parts.iter().any(|part| part.trim().is_empty()) {
        return Err(malformed(source, rule_id, function, "empty argument"));
    }

    Ok(parts)
}

fn malformed(source: &str, rule_id: &str, function: &'static str, reason: &str) -> ScriptError {
    ScriptError::MalformedCall {
        rule_id: rule_id.to_string(),
        function,
        snippet: source.to_string(),
        reason: reason.to_string(),
    }
}
