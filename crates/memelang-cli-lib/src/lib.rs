use clap::Parser as _;

use memelang_core::Database;
use memelang_db::{DbConfig, PostgresDatabase};

use crate::commands::{Cli, Commands};

pub mod commands;
mod commands_admin;
mod commands_file;
mod commands_query;
mod logger;

pub fn run_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let _ = logger::init();
    let cli = Cli::parse_from(args);
    let config = DbConfig::from_env();

    // Schema-management commands talk to Postgres only through `psql`, so
    // they don't need a pooled client connection at all.
    match &cli.command {
        Commands::DbAdd => return commands_admin::run_dbadd(&config),
        Commands::TableAdd => return commands_admin::run_tableadd(&config),
        Commands::TableDel => return commands_admin::run_tabledel(&config),
        Commands::Install => return commands_admin::run_install(&config),
        Commands::Reinstall => return commands_admin::run_reinstall(&config),
        _ => {}
    }

    let pool = match memelang_db::build_pool(&config) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };
    let db: Box<dyn Database> = Box::new(PostgresDatabase::new(pool));
    let mut engine = memelang_core::Engine::new(db.as_ref());

    match cli.command {
        Commands::Sql(args) => commands_query::run_sql(&args.sql, db.as_ref()),
        Commands::Query(args) => commands_query::run_query(&args.source, cli.graph, &mut engine),
        Commands::Put(args) => commands_query::run_put(&args.source, cli.graph, &mut engine),
        Commands::File(args) => commands_file::run_file(&args.path, cli.graph, &mut engine),
        Commands::FileAll(args) => commands_file::run_fileall(&args.dir, cli.graph, &mut engine),
        Commands::QryTest => commands_admin::run_qrytest(cli.graph.unwrap_or(memelang_core::constants::DEFAULT_GRAPH), &mut engine),
        Commands::DbAdd | Commands::TableAdd | Commands::TableDel | Commands::Install | Commands::Reinstall => unreachable!("handled above"),
    }
}
