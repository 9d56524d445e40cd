use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "memelang")]
#[command(about = "A compact triple-store query language and its Postgres backend", long_about = None, version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Graph id to operate in. Defaults to the job's own `g=` preamble, or
    /// the engine default graph when neither is given.
    #[arg(long, global = true)]
    pub graph: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(name = "sql", about = "Run a raw SQL string against the configured database")]
    Sql(SqlArgs),
    #[command(name = "query", alias = "qry", alias = "q", about = "Run a Memelang get/count job")]
    Query(MemeArgs),
    #[command(name = "put", about = "Run a Memelang put job")]
    Put(MemeArgs),
    #[command(name = "file", alias = "import", about = "Run the Memelang job stored in a file")]
    File(FileArgs),
    #[command(name = "fileall", about = "Run every *.mm file under a directory, recursively")]
    FileAll(FileAllArgs),
    #[command(name = "dbadd", about = "Create the database and role")]
    DbAdd,
    #[command(name = "tableadd", about = "Create the node/numb/name tables and id sequence")]
    TableAdd,
    #[command(name = "tabledel", about = "Drop the node/numb/name tables and id sequence")]
    TableDel,
    #[command(name = "install", about = "dbadd followed by tableadd")]
    Install,
    #[command(name = "reinstall", about = "tabledel followed by tableadd")]
    Reinstall,
    #[command(name = "qrytest", about = "Run the bundled self-test queries and report count mismatches")]
    QryTest,
}

#[derive(Debug, Parser)]
pub struct SqlArgs {
    /// Raw SQL to execute.
    pub sql: String,
}

#[derive(Debug, Parser)]
pub struct MemeArgs {
    /// Memelang source, e.g. `child[birthee year>=1700`.
    pub source: String,
}

#[derive(Debug, Parser)]
pub struct FileArgs {
    /// Path to a file of Memelang source.
    pub path: PathBuf,
}

#[derive(Debug, Parser)]
pub struct FileAllArgs {
    /// Directory to walk for `*.mm` files.
    pub dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_aliases_all_parse_to_the_same_variant() {
        for name in ["query", "qry", "q"] {
            let cli = Cli::try_parse_from(["memelang", name, "child"]).unwrap();
            assert!(matches!(cli.command, Commands::Query(_)));
        }
    }

    #[test]
    fn file_alias_import_parses() {
        let cli = Cli::try_parse_from(["memelang", "import", "path.mm"]).unwrap();
        assert!(matches!(cli.command, Commands::File(_)));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["memelang", "bogus"]).is_err());
    }
}
