//! Runtime value model shared by the executor.
//!
//! Values, the `ObjectHolder` ownership container, classes with their method
//! tables, and the polymorphic comparison operators live here; the AST and
//! its evaluators live in `ast`/`interpreter`.
pub mod class;
pub mod compare;
pub mod error;
pub mod object;
