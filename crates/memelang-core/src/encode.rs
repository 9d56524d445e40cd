//! Serializer (spec component C3, `encode`): the inverse of `decode`.

use crate::ast::{Expression, Tokens};
use crate::operand::Operand;
use crate::operator::OperatorTable;

pub fn encode(tokens: &Tokens) -> String {
    let mut out = String::new();
    for expression in tokens {
        for term in expression {
            out.push_str(OperatorTable::link_encode_prefix(term.op.link));
            if let Some(lhs) = &term.lhs {
                out.push_str(&encode_lhs(lhs));
            }
            if let Some(cmp) = term.op.cmp {
                let desc = OperatorTable::cmp_descriptor(cmp);
                out.push_str(desc.lexeme);
                if let Some(rhs) = &term.rhs {
                    out.push_str(&encode_rhs(rhs, desc.quoted));
                }
                if desc.quoted {
                    out.push('"');
                }
            }
        }
    }
    out.trim_start_matches('\n').to_string()
}

/// Wrap a `get` job's per-body results in `;{graph:body ...}` markers (spec
/// "Result format"), one group per distinct body id. Only used by
/// `dispatch::run_get`; the round-trip-tested [`encode`] stays a pure
/// inverse of `decode` and never emits these markers itself.
pub fn encode_grouped(gid: i64, groups: &[(i64, Expression)]) -> String {
    groups
        .iter()
        .map(|(bid, expression)| {
            let body = encode(&vec![expression.clone()]);
            format!(";{{{gid}:{bid} {body}}}")
        })
        .collect::<Vec<_>>()
        .join("")
        .trim_start_matches(';')
        .to_string()
}

fn encode_lhs(op: &Operand) -> String {
    match op {
        Operand::Id(v) => v.to_string(),
        Operand::Amt(v) => format_amt(*v),
        Operand::Str(s) => s.clone(),
    }
}

fn encode_rhs(op: &Operand, quoted: bool) -> String {
    match op {
        Operand::Id(v) => format!("a{v}"),
        Operand::Amt(v) => format_amt(*v),
        Operand::Str(s) => {
            if quoted {
                s.replace('"', "\\\"")
            } else {
                s.clone()
            }
        }
    }
}

fn format_amt(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}
