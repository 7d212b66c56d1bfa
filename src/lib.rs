//! Bantam compiler front end
//!
//! Facade over the front-end crates. A driver parses source into an
//! [`ast::Program`], then calls [`analyze_program`] to run semantic
//! analysis; on success the tree is fully typed and ready for code
//! generation, on failure the returned handler carries every violation
//! found.

pub use ast;
pub use diagnostics;
pub use semant;

use ast::Program;
use diagnostics::ErrorHandler;

/// Run semantic analysis over a parsed program. `Ok` means the tree is
/// fully typed; `Err` carries the accumulated errors, in discovery
/// order.
pub fn analyze_program(program: &mut Program) -> Result<(), ErrorHandler> {
    let mut errors = ErrorHandler::new();
    semant::check_program(program, &mut errors);
    if errors.has_errors() {
        Err(errors)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{Class, Member, Method, Program, Stmt};

    #[test]
    fn empty_program_analyzes_cleanly() {
        let mut program = Program::new(vec![]);
        assert!(analyze_program(&mut program).is_ok());
    }

    #[test]
    fn errors_surface_through_the_facade() {
        let main = Class::new(
            1,
            "Main",
            None,
            "Main.btm",
            vec![Member::Method(Method::new(
                2,
                "main",
                "void",
                vec![],
                vec![Stmt::break_stmt(3)],
            ))],
        );
        let mut program = Program::new(vec![main]);
        let errors = analyze_program(&mut program).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.errors()[0].message.contains("Break statement"));
    }
}
