//! Matcher expression language
//!
//! Matchers are parsed once into an AST, cached by the [`Engine`], and
//! interpreted against an [`EvalContext`] holding the request and policy
//! bindings plus the functions (built-ins, role relations, custom) in scope.

pub mod context;
pub mod convert;
pub mod engine;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod rewrite;
pub mod value;

pub use context::EvalContext;
pub use engine::Engine;
pub use error::{MatcherError, Result};
pub use functions::Function;
pub use parser::Expr;
pub use value::Value;
