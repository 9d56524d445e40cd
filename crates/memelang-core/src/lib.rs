//! Lexer, AST, symbol resolver and SQL compilers for the Memelang
//! triple-store query language.
//!
//! A backing store is anything implementing [`resolver::Database`];
//! `memelang-db` is the Postgres-backed implementation this workspace ships.

pub mod ast;
pub mod constants;
pub mod dispatch;
pub mod encode;
pub mod engine;
pub mod error;
pub mod insert;
pub mod lexer;
pub mod normalize;
pub mod operand;
pub mod operator;
pub mod resolver;
pub mod select;

pub use ast::{Expression, Term, Tokens};
pub use dispatch::{query, Job};
pub use encode::{encode, encode_grouped};
pub use engine::Engine;
pub use error::{MemelangError, Result};
pub use insert::{compile_put, execute_put, CompiledInsert};
pub use lexer::decode;
pub use operand::Operand;
pub use operator::{CmpOp, Column, LinkTier, OperatorId, OperatorTable};
pub use resolver::{identify, identify_or_create, keyify, Database, Row, SqlValue, SymbolCache};
pub use select::{countify, selectify, sqlify, CompiledStatement};
