use timex_protocol::TimexDictionary;
use timex_resources::NormalizationTables;

use crate::ast::{Expression, Statement};
use crate::error::ScriptError;

impl Expression {
    /// Evaluates against the tables, the dictionary built so far by earlier
    /// statements, and the raw text captured by the group.
    pub fn evaluate(
        &self,
        tables: &NormalizationTables,
        dict: &TimexDictionary,
        raw: &str,
    ) -> Result<String, ScriptError> {
        let eval = |expression: &Expression| expression.evaluate(tables, dict, raw);

        match self {
            Expression::Constant(text) => Ok(text.clone()),
            Expression::ValueEcho => Ok(raw.to_string()),
            Expression::ArrayLookup(key) => dict
                .get(key)
                .cloned()
                .ok_or_else(|| ScriptError::UndefinedKey(key.clone())),
            Expression::Concat(lhs, rhs) => Ok(eval(lhs)? + &eval(rhs)?),
            Expression::Sum(lhs, rhs) => arithmetic("Sum", eval(lhs)?, eval(rhs)?, i64::checked_add),
            Expression::Minus(lhs, Some(rhs)) => arithmetic("Minus", eval(lhs)?, eval(rhs)?, i64::checked_sub),
            Expression::Minus(operand, None) => arithmetic("Minus", "0".to_string(), eval(operand)?, i64::checked_sub),
            Expression::Mult(lhs, rhs) => arithmetic("Mult", eval(lhs)?, eval(rhs)?, i64::checked_mul),
            Expression::Normalize { table, operand } => {
                let table = tables
                    .get(table)
                    .ok_or_else(|| ScriptError::UnknownTable(table.clone()))?;
                let input = eval(operand)?;
                Ok(table.normalize(&input).into_owned())
            }
            Expression::Substring { operand, start, length } => {
                let input = eval(operand)?;
                let start = integer("Substring", &input, eval(start)?)?;
                let length = match length {
                    Some(length) => Some(integer("Substring", &input, eval(length)?)?),
                    None => None,
                };
                substring(input, start, length)
            }
        }
    }
}

impl Statement {
    pub fn execute(
        &self,
        tables: &NormalizationTables,
        dict: &mut TimexDictionary,
        raw: &str,
    ) -> Result<(), ScriptError> {
        match self {
            Statement::Assign { key, expression } => {
                let value = expression.evaluate(tables, dict, raw)?;
                dict.insert(key.clone(), value);
                Ok(())
            }
        }
    }
}

fn arithmetic(
    operator: &'static str,
    lhs: String,
    rhs: String,
    op: fn(i64, i64) -> Option<i64>,
) -> Result<String, ScriptError> {
    let (Ok(a), Ok(b)) = (lhs.trim().parse::<i64>(), rhs.trim().parse::<i64>()) else {
        return Err(ScriptError::NonIntegerOperand { operator, lhs, rhs });
    };

    match op(a, b) {
        Some(result) => Ok(result.to_string()),
        None => Err(ScriptError::ArithmeticOverflow { operator, lhs, rhs }),
    }
}

fn integer(operator: &'static str, input: &str, text: String) -> Result<i64, ScriptError> {
    text.trim().parse().map_err(|_| ScriptError::NonIntegerOperand {
        operator,
        lhs: input.to_string(),
        rhs: text,
    })
}

/// Character-based substring. A missing or negative length reads to the end.
fn substring(input: String, start: i64, length: Option<i64>) -> Result<String, ScriptError> {
    let char_count = input.chars().count() as i64;
    let out_of_bounds = |input: String| ScriptError::OutOfBounds {
        input,
        start,
        length: length.unwrap_or(-1),
    };

    if start < 0 || start > char_count {
        return Err(out_of_bounds(input));
    }

    let take = match length {
        Some(length) if length >= 0 => {
            if start.checked_add(length).map_or(true, |end| end > char_count) {
                return Err(out_of_bounds(input));
            }
            length
        }
        _ => char_count - start,
    };

    Ok(input.chars().skip(start as usize).take(take as usize).collect())
}
