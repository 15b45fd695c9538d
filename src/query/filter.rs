//! Filter DSL compiler
//!
//! Compiles the token stream after `FILTER` into a single predicate over a
//! record's by-name field view.
//!
//! # Supported Syntax
//!
//! ```text
//! -- scalar comparison, one condition per token
//! rating=high   size>10   score<=4.5   state!=done
//!
//! -- set membership / non-membership with a quoted CSV list
//! name=(april,may)   status!=("new","in progress","""quoted""")
//!
//! -- joined conditions
//! name=april AND rating=high
//! name=april OR name=may AND rating=high
//! ```
//!
//! Joining folds each run of one operator into a single node, then combines
//! the runs with AND at the top level: `p1 OR p2 AND p3` compiles to
//! `(p1 OR p2) AND p3`.
//!
//! Conditions compile to a small AST ([`Predicate`]) that is walked per
//! entry; no closure chains are built.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, recognize, rest, value},
    multi::separated_list0,
    sequence::{delimited, pair},
    IResult, Parser,
};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::value::parse_numeric;

// ============================================================================
// Predicate AST
// ============================================================================

/// Comparison operators of the filter grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `=` (equality, not assignment)
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
}

impl CmpOp {
    fn accepts(&self, ord: Ordering) -> bool {
        match self {
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
            CmpOp::Eq | CmpOp::Ne => false,
        }
    }
}

/// Right-hand side of a scalar comparison.
///
/// The numeric interpretation is computed once at compile time; when present,
/// the record field is coerced to a number for the comparison, otherwise both
/// sides compare as strings.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterValue {
    raw: String,
    numeric: Option<f64>,
}

impl FilterValue {
    fn new(raw: String) -> Self {
        let numeric = parse_numeric(&raw);
        Self { raw, numeric }
    }

    fn equals(&self, field: &str) -> bool {
        match self.numeric {
            Some(n) => parse_numeric(field).is_some_and(|x| x == n),
            None => field == self.raw,
        }
    }

    fn compare(&self, field: &str) -> Option<Ordering> {
        match self.numeric {
            Some(n) => parse_numeric(field)?.partial_cmp(&n),
            None => Some(field.cmp(&self.raw)),
        }
    }
}

/// Compiled filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field OP value` scalar comparison
    Cmp {
        /// Field name to test
        field: String,
        /// Comparison operator
        op: CmpOp,
        /// Right-hand side
        value: FilterValue,
    },
    /// `field = (...)` / `field != (...)` set membership
    Contains {
        /// Field name to test
        field: String,
        /// Member values, compared as raw text
        values: Vec<String>,
        /// True for `!=` (non-membership)
        negated: bool,
    },
    /// Conjunction
    All(Vec<Predicate>),
    /// Disjunction
    Any(Vec<Predicate>),
}

impl Predicate {
    /// Evaluate against a by-name field view.
    ///
    /// A missing field fails equality and every ordering comparison, and
    /// satisfies `!=` and non-membership.
    pub fn matches(&self, view: &HashMap<&str, &str>) -> bool {
        match self {
            Predicate::Cmp { field, op, value } => {
                let field_val = view.get(field.as_str()).copied();
                match op {
                    CmpOp::Eq => field_val.is_some_and(|fv| value.equals(fv)),
                    CmpOp::Ne => field_val.map_or(true, |fv| !value.equals(fv)),
                    _ => field_val
                        .and_then(|fv| value.compare(fv))
                        .is_some_and(|ord| op.accepts(ord)),
                }
            }
            Predicate::Contains {
                field,
                values,
                negated,
            } => {
                let held = view
                    .get(field.as_str())
                    .is_some_and(|fv| values.iter().any(|v| v == fv));
                held != *negated
            }
            Predicate::All(children) => children.iter().all(|c| c.matches(view)),
            Predicate::Any(children) => children.iter().any(|c| c.matches(view)),
        }
    }
}

// ============================================================================
// Compiler
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    And,
    Or,
}

fn joiner_of(token: &str) -> Option<Joiner> {
    if token.eq_ignore_ascii_case("and") {
        Some(Joiner::And)
    } else if token.eq_ignore_ascii_case("or") {
        Some(Joiner::Or)
    } else {
        None
    }
}

/// True when a token looks like a condition (used by the option parser to
/// decide where the FILTER payload ends)
pub fn is_condition_token(token: &str) -> bool {
    token.contains(['=', '<', '>'])
}

/// Compile the token stream following `FILTER` into one predicate
pub fn compile(tokens: &[&str]) -> Result<Predicate> {
    if tokens.is_empty() {
        return Err(EngineError::argument(
            "FILTER requires at least one condition",
        ));
    }

    let mut preds = Vec::new();
    let mut joins = Vec::new();
    let mut expect_condition = true;

    for token in tokens {
        if expect_condition {
            if joiner_of(token).is_some() {
                return Err(EngineError::argument(format!(
                    "expected a filter condition, found '{}'",
                    token
                )));
            }
            preds.push(parse_condition(token)?);
            expect_condition = false;
        } else {
            match joiner_of(token) {
                Some(join) => {
                    joins.push(join);
                    expect_condition = true;
                }
                None => {
                    return Err(EngineError::argument(format!(
                        "expected AND or OR before '{}'",
                        token
                    )))
                }
            }
        }
    }

    if expect_condition {
        return Err(EngineError::argument(
            "filter expression ends with a dangling AND/OR",
        ));
    }

    Ok(fold_runs(preds, joins))
}

/// Fold each run of one joiner into a node, then AND the runs together
fn fold_runs(preds: Vec<Predicate>, joins: Vec<Joiner>) -> Predicate {
    let mut iter = preds.into_iter();
    let mut current: Vec<Predicate> = iter.by_ref().take(1).collect();
    let mut current_join: Option<Joiner> = None;
    let mut runs: Vec<Predicate> = Vec::new();

    for (join, pred) in joins.into_iter().zip(iter) {
        match current_join {
            None => {
                current_join = Some(join);
                current.push(pred);
            }
            Some(j) if j == join => current.push(pred),
            Some(j) => {
                runs.push(close_run(j, std::mem::take(&mut current)));
                current_join = Some(join);
                current.push(pred);
            }
        }
    }
    runs.push(close_run(current_join.unwrap_or(Joiner::And), current));

    if runs.len() == 1 {
        runs.remove(0)
    } else {
        Predicate::All(runs)
    }
}

fn close_run(join: Joiner, mut preds: Vec<Predicate>) -> Predicate {
    if preds.len() == 1 {
        return preds.remove(0);
    }
    match join {
        Joiner::And => Predicate::All(preds),
        Joiner::Or => Predicate::Any(preds),
    }
}

// ============================================================================
// Condition Grammar
// ============================================================================

enum ParsedCondition {
    Scalar { field: String, op: CmpOp, raw: String },
    Set { field: String, op: CmpOp, values: Vec<String> },
}

fn parse_condition(token: &str) -> Result<Predicate> {
    let parsed = match all_consuming(condition).parse(token) {
        Ok((_, parsed)) => parsed,
        Err(_) => {
            return Err(EngineError::argument(format!(
                "malformed filter condition '{}'",
                token
            )))
        }
    };

    match parsed {
        ParsedCondition::Scalar { field, op, raw } => Ok(Predicate::Cmp {
            field,
            op,
            value: FilterValue::new(raw),
        }),
        ParsedCondition::Set { field, op, values } => {
            let negated = match op {
                CmpOp::Eq => false,
                CmpOp::Ne => true,
                _ => {
                    return Err(EngineError::argument(format!(
                        "set membership on '{}' supports only = and !=",
                        field
                    )))
                }
            };
            Ok(Predicate::Contains {
                field,
                values,
                negated,
            })
        }
    }
}

fn condition(input: &str) -> IResult<&str, ParsedCondition> {
    let (input, field) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, op) = operator(input)?;
    let (input, _) = multispace0(input)?;

    if input.starts_with('(') {
        let (input, values) = set_values(input)?;
        Ok((
            input,
            ParsedCondition::Set {
                field: field.to_string(),
                op,
                values,
            },
        ))
    } else {
        let (input, raw) = rest(input)?;
        Ok((
            input,
            ParsedCondition::Scalar {
                field: field.to_string(),
                op,
                raw: raw.to_string(),
            },
        ))
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn operator(input: &str) -> IResult<&str, CmpOp> {
    alt((
        value(CmpOp::Ne, tag("!=")),
        value(CmpOp::Le, tag("<=")),
        value(CmpOp::Ge, tag(">=")),
        value(CmpOp::Eq, tag("=")),
        value(CmpOp::Lt, tag("<")),
        value(CmpOp::Gt, tag(">")),
    ))
    .parse(input)
}

/// Parenthesised CSV of members; values may be double-quoted with `""`
/// escaping the quote character
fn set_values(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        pair(char('('), multispace0),
        separated_list0(
            delimited(multispace0, char(','), multispace0),
            set_value,
        ),
        pair(multispace0, char(')')),
    )
    .parse(input)
}

fn set_value(input: &str) -> IResult<&str, String> {
    alt((quoted_value, bare_value)).parse(input)
}

fn bare_value(input: &str) -> IResult<&str, String> {
    let (rest, raw) = take_while1(|c: char| c != ',' && c != ')').parse(input)?;
    Ok((rest, raw.trim().to_string()))
}

fn quoted_value(input: &str) -> IResult<&str, String> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut out = String::new();
    loop {
        match remaining.find('"') {
            Some(idx) => {
                out.push_str(&remaining[..idx]);
                let after = &remaining[idx + 1..];
                if let Some(stripped) = after.strip_prefix('"') {
                    // "" is a literal quote
                    out.push('"');
                    remaining = stripped;
                } else {
                    return Ok((after, out));
                }
            }
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    remaining,
                    nom::error::ErrorKind::Char,
                )))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
