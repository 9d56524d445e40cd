use memelang_core::{Database, Engine};

/// Run a raw SQL string and print each returned row.
pub fn run_sql(sql: &str, db: &dyn Database) -> i32 {
    match db.query(sql, &[]) {
        Ok(rows) => {
            for row in rows {
                println!("{row:?}");
            }
            0
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

/// Run a `get`/`cnt` job (whichever the source's own `j=` preamble names,
/// defaulting to `get`) and print the textual result.
pub fn run_query(source: &str, graph: Option<i64>, engine: &mut Engine) -> i32 {
    run_job(source, graph, engine)
}

/// Run a `put` job and print the textual result (the stored body, rewritten
/// back to keys).
pub fn run_put(source: &str, graph: Option<i64>, engine: &mut Engine) -> i32 {
    let job = with_put_preamble(source, graph);
    run_job(&job, None, engine)
}

fn with_put_preamble(source: &str, graph: Option<i64>) -> String {
    match graph {
        Some(g) => format!("j=put g={g}\n{source}"),
        None => format!("j=put\n{source}"),
    }
}

fn run_job(source: &str, graph: Option<i64>, engine: &mut Engine) -> i32 {
    let job = match graph {
        Some(g) => format!("g={g}\n{source}"),
        None => source.to_string(),
    };
    match engine.query(&job) {
        Ok(result) => {
            println!("{result}");
            0
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}
