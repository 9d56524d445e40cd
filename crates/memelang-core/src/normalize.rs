//! AST normalizer (spec component C4). Runs once at the end of `decode` and
//! again, idempotently, before every compiler (`selectify`/`put`) consumes a
//! `Tokens` value a caller may have mutated by hand.

use crate::ast::Tokens;
use crate::error::{MemelangError, Result};
use crate::operand::Operand;
use crate::operator::CmpOp;

pub fn normalize(tokens: &mut Tokens) -> Result<()> {
    for expression in tokens.iter_mut() {
        coerce_amt_operands(expression);
        check_single_leading_bid(expression)?;
    }
    Ok(())
}

/// A term whose comparator targets `amt` always carries a float rhs, even if
/// a caller builds the AST by hand with an integer-looking `Operand::Id`.
fn coerce_amt_operands(expression: &mut crate::ast::Expression) {
    for term in expression.iter_mut() {
        if matches!(term.op.cmp, Some(CmpOp::EqNum) | Some(CmpOp::Gt) | Some(CmpOp::Lt) | Some(CmpOp::Ge) | Some(CmpOp::Le) | Some(CmpOp::Ne)) {
            if let Some(Operand::Id(v)) = term.rhs {
                term.rhs = Some(Operand::Amt(v as f64));
            }
        }
    }
}

fn check_single_leading_bid(expression: &crate::ast::Expression) -> Result<()> {
    let bid_positions: Vec<usize> = expression.iter().enumerate().filter(|(_, t)| t.is_bid_marker()).map(|(i, _)| i).collect();
    match bid_positions.as_slice() {
        [] => Ok(()),
        [0] => Ok(()),
        [pos] => Err(MemelangError::ShapeViolation(format!("'bid' term must be first in its expression, found at position {pos}"))),
        _ => Err(MemelangError::ShapeViolation("at most one 'bid' term is allowed per expression".into())),
    }
}
