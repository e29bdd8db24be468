//! The tag-action language attached to `<tag>` elements of a grammar rule.
//!
//! Scripts are compiled once into [`Statement`] lists and run against the
//! text captured by their group, writing into a [`TimexDictionary`].
//!
//! [`TimexDictionary`]: timex_protocol::TimexDictionary

pub mod ast;
pub mod compiler;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod registry;

pub use ast::{Expression, Statement};
pub use compiler::{compile_expression, compile_statement, compile_statements};
pub use error::ScriptError;
pub use registry::{ScriptRegistry, TagActionProvider, TagScript};
