//! SELECT compiler (spec component C6, `selectify`/`sqlify`).
//!
//! Each `Expression` becomes one correlated self-join over `node`, with a
//! `LEFT JOIN` out to `numb`/`name` for any term whose comparator targets
//! `amt`/`alp`. The first term seeds `FROM node n0`; every later term adds
//! one more aliased table, joined back to the term before it according to
//! its link tier:
//!
//! * `And`  — same body: `n{p}.bid = n{c}.bid`, plus an `(aid != aid OR
//!   rid != rid)` disambiguation guard when both sides target `aid`, so two
//!   `And`-joined terms can't self-match the same row.
//! * `Fwd`  — descend: `n{p}.aid = n{c}.aid AND n{p}.bid != n{c}.bid` — the
//!   previous term's target becomes this term's body, and the inequality
//!   guard stops a term from joining back onto itself.
//! * `Rev`  — ascend: the inverse of `Fwd`.
//!
//! A term whose comparator targets `amt`/`alp` always joins through
//! `LEFT JOIN ... ON n{p}.bid = n{c}.bid`, regardless of its link tier,
//! because leaf rows have no `aid` of their own to chain through.
//!
//! `selectify`'s projection always leads with `n0.bid`, the group key every
//! matched row is later folded by (spec "Projection rule": one result per
//! `(graph, body)`, not one per join-matched row).

use crate::ast::{Expression, Tokens};
use crate::error::{MemelangError, Result};
use crate::operand::Operand;
use crate::operator::{Column, LinkTier, OperatorTable};
use crate::resolver::SqlValue;

/// Which output column a compiled statement projects for term `term_index`,
/// so the caller can zip result rows back onto the expression that produced
/// them without re-deriving anything from the SQL text.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub term_index: usize,
    pub column: Column,
}

#[derive(Debug, Clone)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub projection: Vec<Projection>,
}

struct JoinPlan {
    from_clause: String,
    where_clause: String,
    params: Vec<SqlValue>,
    projection: Vec<Projection>,
}

fn table_for(column: Column) -> &'static str {
    match column {
        Column::Aid | Column::Rid | Column::Bid => crate::constants::TABLE_NODE,
        Column::Amt => crate::constants::TABLE_NUMB,
        Column::Alp => crate::constants::TABLE_NAME,
    }
}

fn value_column_sql(column: Column) -> &'static str {
    match column {
        Column::Amt => "amt",
        Column::Alp => "alp",
        _ => "aid",
    }
}

fn build_join_plan(expression: &Expression, gid: i64) -> Result<JoinPlan> {
    if expression.is_empty() {
        return Err(MemelangError::ShapeViolation("an expression must contain at least one term".into()));
    }

    let mut from_clause = String::new();
    let mut where_clause = String::new();
    let mut params: Vec<SqlValue> = vec![SqlValue::Id(gid)];
    let mut projection = Vec::new();

    for (idx, term) in expression.iter().enumerate() {
        let column = OperatorTable::column_of(term.op);
        let table = table_for(column);
        let alias = format!("n{idx}");

        if idx == 0 {
            from_clause.push_str(&format!("FROM {table} {alias}"));
            where_clause.push_str(&format!("{alias}.gid = $1"));
        } else {
            let prev = format!("n{}", idx - 1);
            let prev_column = OperatorTable::column_of(expression[idx - 1].op);
            let (join_kind, join_cond) = if table == crate::constants::TABLE_NODE {
                match term.op.link {
                    // Same body: both terms describe the same row's relations.
                    // If both sides target `aid`, two otherwise-identical
                    // terms could self-match, so also require they differ on
                    // `aid` or `rel`.
                    LinkTier::And => {
                        let guard = if prev_column == Column::Aid && column == Column::Aid {
                            format!(" AND ({prev}.aid != {alias}.aid OR {prev}.rid != {alias}.rid)")
                        } else {
                            String::new()
                        };
                        ("LEFT JOIN", format!("{prev}.bid = {alias}.bid{guard}"))
                    }
                    // Descend: the previous term's target becomes this term's
                    // body. `bid != bid` stops a term from joining back onto
                    // its own row.
                    LinkTier::Fwd => ("JOIN", format!("{prev}.aid = {alias}.aid AND {prev}.bid != {alias}.bid")),
                    // Ascend: the inverse of `Fwd`.
                    LinkTier::Rev => ("JOIN", format!("{prev}.aid = {alias}.aid AND {alias}.bid != {prev}.bid")),
                    LinkTier::Imp | LinkTier::End => {
                        return Err(MemelangError::ShapeViolation("'>>'/';' cannot appear mid-expression".into()))
                    }
                }
            } else {
                ("LEFT JOIN", format!("{prev}.bid = {alias}.bid"))
            };
            params.push(SqlValue::Id(gid));
            let gid_param = params.len();
            from_clause.push_str(&format!(" {join_kind} {table} {alias} ON {join_cond} AND {alias}.gid = ${gid_param}"));
        }

        if let Some(lhs) = &term.lhs {
            let id = lhs.as_id().ok_or_else(|| MemelangError::ShapeViolation("term lhs must already be resolved to an id before compiling".into()))?;
            params.push(SqlValue::Id(id));
            where_clause.push_str(&format!(" AND {alias}.rid = ${}", params.len()));
        }

        if let Some(cmp) = term.op.cmp {
            let desc = OperatorTable::cmp_descriptor(cmp);
            if let Some(rhs) = &term.rhs {
                let col = value_column_sql(column);
                if desc.quoted {
                    let text = rhs.as_str().ok_or_else(|| MemelangError::ShapeViolation("alp comparator requires a string rhs".into()))?;
                    params.push(SqlValue::Alp(text.to_string()));
                    where_clause.push_str(&format!(" AND LOWER({alias}.{col}) = LOWER(${})", params.len()));
                } else {
                    match rhs {
                        Operand::Id(v) => params.push(SqlValue::Id(*v)),
                        Operand::Amt(v) => params.push(SqlValue::Amt(*v)),
                        Operand::Str(_) => return Err(MemelangError::ShapeViolation("numeric comparator requires a resolved id or amount".into())),
                    }
                    where_clause.push_str(&format!(" AND {alias}.{col} {} ${}", desc.sql_glyph, params.len()));
                }
            }
        }

        projection.push(Projection { term_index: idx, column });
    }

    Ok(JoinPlan { from_clause, where_clause, params, projection })
}

/// Compile one `Expression` into a correlated `SELECT`. The result always
/// leads with `n0.bid`, the group key `dispatch::run_get` folds matched rows
/// by before projecting one Memelang result per `(graph, body)`.
pub fn selectify(expression: &Expression, gid: i64) -> Result<CompiledStatement> {
    let plan = build_join_plan(expression, gid)?;
    let mut select_list: Vec<String> = vec!["n0.bid AS body_id".to_string()];
    select_list.extend(plan.projection.iter().map(|p| {
        let idx = p.term_index;
        let col = value_column_sql(p.column);
        format!("n{idx}.rid AS rid{idx}, n{idx}.{col} AS val{idx}")
    }));
    let sql = format!("SELECT {} {} WHERE {}", select_list.join(", "), plan.from_clause, plan.where_clause);
    Ok(CompiledStatement { sql, params: plan.params, projection: plan.projection })
}

/// Compile every `Expression` in a job into a `UNION`-combined statement.
pub fn sqlify(tokens: &Tokens, gid: i64) -> Result<Vec<CompiledStatement>> {
    tokens.iter().map(|expr| selectify(expr, gid)).collect()
}

/// Compile a `COUNT(DISTINCT bid)` over an expression's root table.
pub fn countify(expression: &Expression, gid: i64) -> Result<CompiledStatement> {
    let plan = build_join_plan(expression, gid)?;
    let sql = format!("SELECT COUNT(DISTINCT n0.bid) AS amt {} WHERE {}", plan.from_clause, plan.where_clause);
    Ok(CompiledStatement { sql, params: plan.params, projection: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Term;
    use crate::operator::CmpOp;

    fn term(link: LinkTier, lhs: i64, cmp: Option<CmpOp>, rhs: Option<Operand>) -> Term {
        Term { op: OperatorTable::compose(link, cmp), lhs: Some(Operand::Id(lhs)), rhs }
    }

    #[test]
    fn forward_chain_join_shape() {
        // child[birthee year>=1700, pre-resolved to ids 1/2/3.
        let expr = vec![
            term(LinkTier::End, 1, None, None),
            term(LinkTier::Fwd, 2, None, None),
            term(LinkTier::And, 3, Some(CmpOp::Ge), Some(Operand::Amt(1700.0))),
        ];
        let compiled = selectify(&expr, 999).unwrap();
        assert_eq!(compiled.sql.matches("FROM").count(), 1);
        assert_eq!(compiled.sql.matches(" JOIN ").count() + compiled.sql.matches(" LEFT JOIN ").count(), 2);
        assert!(compiled.sql.contains("JOIN node n1 ON n0.aid = n1.aid AND n0.bid != n1.bid"));
        assert!(compiled.sql.contains("LEFT JOIN numb n2 ON n1.bid = n2.bid"));
        assert!(compiled.sql.contains("n2.amt >="));
        assert!(compiled.params.iter().any(|p| matches!(p, SqlValue::Amt(v) if *v == 1700.0)));
    }

    #[test]
    fn and_tier_guards_against_self_match_on_two_aid_terms() {
        // child parent, pre-resolved to ids 1/2: both bare relations target
        // aid, so the join needs the aid/rid disambiguation guard or a row
        // could satisfy both terms against the very same `node` row.
        let expr = vec![term(LinkTier::End, 1, None, None), term(LinkTier::And, 2, None, None)];
        let compiled = selectify(&expr, 999).unwrap();
        assert!(compiled.sql.contains("ON n0.bid = n1.bid AND (n0.aid != n1.aid OR n0.rid != n1.rid)"));
    }

    #[test]
    fn unresolved_lhs_is_rejected() {
        let expr = vec![Term { op: OperatorTable::compose(LinkTier::End, None), lhs: Some(Operand::Str("child".into())), rhs: None }];
        assert!(selectify(&expr, 999).is_err());
    }
}
