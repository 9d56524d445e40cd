//! Job dispatcher (spec component C8, `query`).
//!
//! A job is one text blob: an optional leading line of space-separated
//! `key=value` pairs recognizing `j` (action) and `g` (graph id), followed
//! by a Memelang body. `j` defaults to `get`, `g` to
//! [`crate::constants::DEFAULT_GRAPH`].
//!
//! `query` takes a [`SymbolCache`] by `&mut` rather than building one of its
//! own: callers reaching this through an [`crate::Engine`] keep the same
//! cache alive across every job in a process, so the same key is never
//! re-resolved from the backing store twice.

use crate::ast::{Expression, Term, Tokens};
use crate::constants::{DEFAULT_GRAPH, TABLE_NAME, TABLE_NODE, TABLE_NUMB};
use crate::encode::{encode, encode_grouped};
use crate::error::{MemelangError, Result};
use crate::insert::{compile_put, execute_put};
use crate::lexer::decode;
use crate::operand::Operand;
use crate::operator::{Column, LinkTier, OperatorTable};
use crate::resolver::{identify, identify_or_create, keyify, Database, Row, SqlValue, SymbolCache};
use crate::select::{countify, sqlify, Projection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Get,
    Put,
    Cnt,
    DelG,
    DelA,
    DelR,
    DelB,
    DelArB,
}

impl Job {
    fn parse(name: &str) -> Result<Job> {
        Ok(match name {
            "get" => Job::Get,
            "put" => Job::Put,
            "cnt" => Job::Cnt,
            "delg" => Job::DelG,
            "dela" => Job::DelA,
            "delr" => Job::DelR,
            "delb" => Job::DelB,
            "delarb" => Job::DelArB,
            other => return Err(MemelangError::InvalidJob(format!("unrecognized job '{other}'"))),
        })
    }
}

struct JobRequest<'a> {
    job: Job,
    gid: i64,
    body: &'a str,
}

fn parse_preamble(source: &str) -> Result<JobRequest<'_>> {
    let (first_line, rest) = match source.find('\n') {
        Some(i) => (&source[..i], &source[i + 1..]),
        None => (source, ""),
    };

    let mut job = None;
    let mut gid = None;
    let mut recognized_only = true;
    let tokens: Vec<&str> = first_line.split_whitespace().collect();
    if tokens.is_empty() {
        recognized_only = false;
    }
    for tok in &tokens {
        match tok.split_once('=') {
            Some(("j", v)) => job = Some(Job::parse(v)?),
            Some(("g", v)) => gid = Some(v.parse::<i64>().map_err(|_| MemelangError::InvalidJob(format!("'g' must be an integer, got '{v}'")))?),
            _ => {
                recognized_only = false;
            }
        }
    }

    if recognized_only && (job.is_some() || gid.is_some()) {
        Ok(JobRequest { job: job.unwrap_or(Job::Get), gid: gid.unwrap_or(DEFAULT_GRAPH), body: rest })
    } else {
        Ok(JobRequest { job: Job::Get, gid: DEFAULT_GRAPH, body: source })
    }
}

fn sqlvalue_to_operand(v: &SqlValue) -> Operand {
    match v {
        SqlValue::Id(x) => Operand::Id(*x),
        SqlValue::Amt(x) => Operand::Amt(*x),
        SqlValue::Alp(x) => Operand::Str(x.clone()),
    }
}

/// Fold raw join-matched rows into one `Expression` per distinct body id
/// (spec "Projection rule": a result row is one Memelang blob per `(graph,
/// body)`, not one per SQL row). A projected term whose join produced more
/// than one distinct value for the same body (an `And`/`Fwd` term fanning
/// out over several matching rows) contributes one extra `And`-linked `Term`
/// per additional distinct value, the equivalent of the `string_agg(DISTINCT
/// ...)` the reference SQL shape would use.
fn group_rows_by_body(expr: &Expression, projection: &[Projection], rows: Vec<Row>) -> Vec<(i64, Expression)> {
    let mut groups: Vec<(i64, Vec<Row>)> = Vec::new();
    for row in rows {
        let bid = match row.0.first().and_then(|v| v.as_ref()) {
            Some(SqlValue::Id(b)) => *b,
            _ => continue,
        };
        match groups.iter_mut().find(|(g, _)| *g == bid) {
            Some((_, rs)) => rs.push(row),
            None => groups.push((bid, vec![row])),
        }
    }

    groups
        .into_iter()
        .map(|(bid, rows)| {
            let mut terms: Vec<Term> = Vec::new();
            for (pi, p) in projection.iter().enumerate() {
                let template = &expr[p.term_index];
                let col_index = 1 + pi * 2 + 1; // skip body_id, then (rid, val) pairs
                let mut distinct: Vec<Option<Operand>> = Vec::new();
                for row in &rows {
                    let rhs = row.0.get(col_index).and_then(|v| v.as_ref()).map(sqlvalue_to_operand);
                    if !distinct.contains(&rhs) {
                        distinct.push(rhs);
                    }
                }
                for (i, rhs) in distinct.into_iter().enumerate() {
                    let op = if i == 0 { template.op } else { OperatorTable::compose(LinkTier::And, template.op.cmp) };
                    terms.push(Term { op, lhs: template.lhs.clone(), rhs });
                }
            }
            (bid, terms)
        })
        .collect()
}

fn run_get(body: &str, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<String> {
    let mut tokens = decode(body)?;
    identify(&mut tokens, gid, db, cache)?;
    let compiled = sqlify(&tokens, gid)?;

    let mut groups: Vec<(i64, Expression)> = Vec::new();
    for (expr, stmt) in tokens.iter().zip(compiled.iter()) {
        let rows = db.query(&stmt.sql, &stmt.params)?;
        groups.extend(group_rows_by_body(expr, &stmt.projection, rows));
    }

    let mut result_tokens: Tokens = groups.iter().map(|(_, expr)| expr.clone()).collect();
    keyify(&mut result_tokens, gid, db, cache)?;
    let keyed_groups: Vec<(i64, Expression)> = groups.iter().map(|(bid, _)| *bid).zip(result_tokens).collect();
    Ok(encode_grouped(gid, &keyed_groups))
}

fn run_cnt(body: &str, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<String> {
    let mut tokens = decode(body)?;
    identify(&mut tokens, gid, db, cache)?;
    let mut total: i64 = 0;
    for expr in &tokens {
        let stmt = countify(expr, gid)?;
        if let Some(row) = db.query(&stmt.sql, &stmt.params)?.into_iter().next() {
            match row.0.first().and_then(|v| v.as_ref()) {
                Some(SqlValue::Id(v)) => total += v,
                Some(SqlValue::Amt(v)) => total += *v as i64,
                _ => {}
            }
        }
    }
    Ok(format!("amt={total}"))
}

fn run_put(body: &str, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<String> {
    let mut tokens = decode(body)?;
    let compiled = compile_put(&mut tokens, gid, db, cache)?;
    execute_put(&compiled, db)?;
    keyify(&mut tokens, gid, db, cache)?;
    Ok(encode(&tokens))
}

fn run_delg(body: &str, gid: i64, db: &dyn Database) -> Result<String> {
    if !body.trim().is_empty() {
        return Err(MemelangError::ShapeViolation("'delg' takes no body".into()));
    }
    let mut affected = 0u64;
    for table in [TABLE_NODE, TABLE_NUMB, TABLE_NAME] {
        affected += db.execute(&format!("DELETE FROM {table} WHERE gid = $1"), &[SqlValue::Id(gid)])?;
    }
    Ok(format!("amt={affected}"))
}

/// Body for `dela`/`delr`/`delb`/`delarb` must decode to exactly one
/// expression with exactly one term; that term's resolved lhs id is the
/// selector value.
fn single_selector_id(body: &str, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<i64> {
    let mut tokens = decode(body)?;
    identify(&mut tokens, gid, db, cache)?;
    if tokens.len() != 1 || tokens[0].len() != 1 {
        return Err(MemelangError::ShapeViolation("delete jobs take exactly one term".into()));
    }
    tokens[0][0].lhs.as_ref().and_then(Operand::as_id).ok_or_else(|| MemelangError::ShapeViolation("delete jobs require a resolved selector id".into()))
}

fn run_dela(body: &str, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<String> {
    let aid = single_selector_id(body, gid, db, cache)?;
    let affected = db.execute(&format!("DELETE FROM {TABLE_NODE} WHERE gid = $1 AND aid = $2"), &[SqlValue::Id(gid), SqlValue::Id(aid)])?;
    Ok(format!("amt={affected}"))
}

fn run_delr(body: &str, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<String> {
    let rid = single_selector_id(body, gid, db, cache)?;
    let mut affected = 0u64;
    for table in [TABLE_NODE, TABLE_NUMB, TABLE_NAME] {
        affected += db.execute(&format!("DELETE FROM {table} WHERE gid = $1 AND rid = $2"), &[SqlValue::Id(gid), SqlValue::Id(rid)])?;
    }
    Ok(format!("amt={affected}"))
}

fn run_delb(body: &str, gid: i64, db: &dyn Database) -> Result<String> {
    let mut tokens = decode(body)?;
    if tokens.len() != 1 || tokens[0].len() != 1 || !tokens[0][0].is_bid_marker() {
        return Err(MemelangError::ShapeViolation("'delb' body must be a single 'bid=<n>' term".into()));
    }
    let bid = tokens[0][0].rhs.take().and_then(|v| v.as_id()).ok_or_else(|| MemelangError::ShapeViolation("'delb' requires an integer body id".into()))?;
    let mut affected = 0u64;
    for table in [TABLE_NODE, TABLE_NUMB, TABLE_NAME] {
        affected += db.execute(&format!("DELETE FROM {table} WHERE gid = $1 AND bid = $2"), &[SqlValue::Id(gid), SqlValue::Id(bid)])?;
    }
    Ok(format!("amt={affected}"))
}

fn run_delarb(body: &str, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<String> {
    let mut tokens = decode(body)?;
    identify(&mut tokens, gid, db, cache)?;
    if tokens.len() != 1 || tokens[0].len() != 2 || !tokens[0][0].is_bid_marker() {
        return Err(MemelangError::ShapeViolation("'delarb' body must be 'bid=<n> rel=aid'".into()));
    }
    let bid = tokens[0][0].rhs.clone().and_then(|v| v.as_id()).ok_or_else(|| MemelangError::ShapeViolation("'delarb' requires an integer body id".into()))?;
    let rel_term = &tokens[0][1];
    let rid = rel_term.lhs.as_ref().and_then(Operand::as_id).ok_or_else(|| MemelangError::ShapeViolation("'delarb' requires a resolved relation id".into()))?;
    if OperatorTable::column_of(rel_term.op) != Column::Aid {
        return Err(MemelangError::ShapeViolation("'delarb' only targets node rows".into()));
    }
    let aid = rel_term.rhs.as_ref().and_then(Operand::as_id).ok_or_else(|| MemelangError::ShapeViolation("'delarb' requires a resolved aid value".into()))?;
    let affected = db.execute(
        &format!("DELETE FROM {TABLE_NODE} WHERE gid = $1 AND bid = $2 AND rid = $3 AND aid = $4"),
        &[SqlValue::Id(gid), SqlValue::Id(bid), SqlValue::Id(rid), SqlValue::Id(aid)],
    )?;
    Ok(format!("amt={affected}"))
}

/// Run one job end to end and return its Memelang-text result. `cache`
/// should be the same [`SymbolCache`] across every job a process runs —
/// typically by going through [`crate::Engine`] rather than calling this
/// directly with a fresh cache each time.
pub fn query(source: &str, db: &dyn Database, cache: &mut SymbolCache) -> Result<String> {
    let request = parse_preamble(source)?;
    match request.job {
        Job::Get => run_get(request.body, request.gid, db, cache),
        Job::Cnt => run_cnt(request.body, request.gid, db, cache),
        Job::Put => run_put(request.body, request.gid, db, cache),
        Job::DelG => run_delg(request.body, request.gid, db),
        Job::DelA => run_dela(request.body, request.gid, db, cache),
        Job::DelR => run_delr(request.body, request.gid, db, cache),
        Job::DelB => run_delb(request.body, request.gid, db),
        Job::DelArB => run_delarb(request.body, request.gid, db, cache),
    }
}
