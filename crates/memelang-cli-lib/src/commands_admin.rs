use memelang_core::Engine;
use memelang_db::DbConfig;

/// Sample queries exercised by `qrytest`, chosen to cover every join tier and
/// comparator the grammar supports while staying inside its character set.
const SAMPLE_QUERIES: &[&str] = &[
    "child",
    "child parent",
    "child=JohnAdams",
    "parent=JohnAdams",
    "child[birthee",
    "child[birthee year>1700",
    "year==1732",
    "year=1732",
    "year>1700",
    "year<=1800",
    "year>=1700",
    "child[birthee year>=1700",
];

pub fn run_dbadd(config: &DbConfig) -> i32 {
    match memelang_db::schema::dbadd(&config.dbname, &config.user, &config.password) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

pub fn run_tableadd(config: &DbConfig) -> i32 {
    match memelang_db::schema::install(&config.dbname, &config.user) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

pub fn run_tabledel(config: &DbConfig) -> i32 {
    match memelang_db::schema::uninstall(&config.dbname) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

pub fn run_install(config: &DbConfig) -> i32 {
    let code = run_dbadd(config);
    if code != 0 {
        return code;
    }
    run_tableadd(config)
}

pub fn run_reinstall(config: &DbConfig) -> i32 {
    let code = run_tabledel(config);
    if code != 0 {
        return code;
    }
    run_tableadd(config)
}

/// Decode/re-encode each sample query and confirm the graph's row count
/// agrees before and after the round trip, reporting overall pass/fail.
pub fn run_qrytest(graph: i64, engine: &mut Engine) -> i32 {
    let mut errors = 0;

    for source in SAMPLE_QUERIES {
        let first = engine.query(&format!("j=cnt g={graph}\n{source}"));

        let tokens = match memelang_core::decode(source) {
            Ok(t) => t,
            Err(e) => {
                println!("{source}: decode error: {e}");
                errors += 1;
                continue;
            }
        };
        let reencoded = memelang_core::encode(&tokens);
        let second = engine.query(&format!("j=cnt g={graph}\n{reencoded}"));

        match (&first, &second) {
            (Ok(c1), Ok(c2)) if c1 == c2 => println!("{source}: OK ({c1})"),
            _ => {
                println!("{source}: *** COUNT ERROR *** {first:?} vs {second:?}");
                errors += 1;
            }
        }
    }

    println!("ERRORS: {errors}");
    if errors > 0 {
        1
    } else {
        0
    }
}
