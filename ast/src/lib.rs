//! Abstract syntax tree for the Bantam teaching language
//!
//! Node variants are closed tagged unions; every compiler pass matches
//! on them exhaustively. The grammar is fixed, so adding a construct
//! means updating each pass, which is acceptable for a teaching
//! compiler with few passes.

pub mod node;
pub mod ty;

pub use node::{
    BinaryOp, Class, Expr, ExprKind, Field, Formal, Member, Method, Program, Stmt, StmtKind,
    UnaryOp,
};
pub use ty::{Ty, OBJECT_CLASS, STRING_CLASS};
