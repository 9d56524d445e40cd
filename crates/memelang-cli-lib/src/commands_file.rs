use std::path::Path;

use memelang_core::Engine;

/// Run the job stored in a single file and print its result.
pub fn run_file(path: &Path, graph: Option<i64>, engine: &mut Engine) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            return 1;
        }
    };
    let job = match graph {
        Some(g) => format!("g={g}\n{source}"),
        None => source,
    };
    match engine.query(&job) {
        Ok(result) => {
            println!("{result}");
            0
        }
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            1
        }
    }
}

/// Run every `*.mm` file found (recursively) under `dir`, in path order,
/// through the same `Engine` so its key cache warms up across the whole run.
pub fn run_fileall(dir: &Path, graph: Option<i64>, engine: &mut Engine) -> i32 {
    let pattern = format!("{}/**/*.mm", dir.display());
    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("bad glob pattern '{pattern}': {e}");
            return 1;
        }
    };

    let mut exit_code = 0;
    for entry in paths {
        match entry {
            Ok(path) => {
                let code = run_file(&path, graph, engine);
                if code != 0 {
                    exit_code = code;
                }
            }
            Err(e) => {
                eprintln!("{e}");
                exit_code = 1;
            }
        }
    }
    exit_code
}

#[cfg(test)]
mod tests {
    use super::*;
    use memelang_core::{Database, Result, Row, SqlValue};

    struct UnusedDb;
    impl Database for UnusedDb {
        fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<Row>> {
            unreachable!("test never reaches the database")
        }
        fn execute(&self, _sql: &str, _params: &[SqlValue]) -> Result<u64> {
            unreachable!("test never reaches the database")
        }
        fn lookup_id(&self, _gid: i64, _key: &str) -> Result<Option<i64>> {
            unreachable!("test never reaches the database")
        }
        fn lookup_ids(&self, _gid: i64, _keys: &[String]) -> Result<Vec<(String, i64)>> {
            unreachable!("test never reaches the database")
        }
        fn lookup_key(&self, _gid: i64, _id: i64) -> Result<Option<String>> {
            unreachable!("test never reaches the database")
        }
        fn lookup_keys(&self, _gid: i64, _ids: &[i64]) -> Result<Vec<(i64, String)>> {
            unreachable!("test never reaches the database")
        }
        fn next_id(&self) -> Result<i64> {
            unreachable!("test never reaches the database")
        }
        fn bind_key(&self, _gid: i64, _id: i64, _key: &str) -> Result<()> {
            unreachable!("test never reaches the database")
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let db = UnusedDb;
        let mut engine = Engine::new(&db);
        let code = run_file(Path::new("/nonexistent/path/does/not/exist.mm"), None, &mut engine);
        assert_eq!(code, 1);
    }

    #[test]
    fn empty_directory_runs_nothing_and_succeeds() {
        let db = UnusedDb;
        let mut engine = Engine::new(&db);
        let dir = tempfile::tempdir().unwrap();
        let code = run_fileall(dir.path(), None, &mut engine);
        assert_eq!(code, 0);
    }
}
