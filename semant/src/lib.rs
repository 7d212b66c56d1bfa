//! Semantic analysis for the Bantam compiler
//!
//! The phase between parsing and code generation: it builds the class
//! hierarchy for a parsed [`Program`](ast::Program), then runs the type
//! checking pass over every class. After a clean run every reachable
//! expression node carries its resolved static type; on a dirty run the
//! shared [`ErrorHandler`](diagnostics::ErrorHandler) holds one record
//! per violation, in discovery order.
//!
//! Modules:
//! - [`symbol_table`]: scoped name-to-value stacks
//! - [`hierarchy`]: class hierarchy, field/method tables, subtyping
//! - [`type_checker`]: the traversal that resolves and enforces types
//! - [`logging`]: `env_logger` setup helpers

pub mod hierarchy;
pub mod logging;
pub mod symbol_table;
pub mod type_checker;

pub use hierarchy::{ClassHierarchy, ClassInfo, HierarchyError, MethodSig};
pub use symbol_table::ScopeStack;
pub use type_checker::TypeChecker;

use ast::Program;
use diagnostics::{ErrorHandler, ErrorKind};

/// Run the whole semantic phase over a parsed program: populate the
/// class hierarchy, then type check every class. Hierarchy failures
/// (duplicate classes, unknown parents) are registered and abort the
/// phase, since type checking needs a well-formed hierarchy beneath it.
pub fn check_program(program: &mut Program, errors: &mut ErrorHandler) {
    let hierarchy = match ClassHierarchy::populate(program) {
        Ok(hierarchy) => hierarchy,
        Err(error) => {
            let (file, line) = error_site(program, &error);
            errors.register(ErrorKind::Semantic, file, line, error.to_string());
            return;
        }
    };
    type_checker::check_program(program, &hierarchy, errors);
}

/// The declaration site of the class a hierarchy error names, for the
/// diagnostic record.
fn error_site<'p>(program: &'p Program, error: &HierarchyError) -> (&'p str, u32) {
    let class_name = match error {
        HierarchyError::UnknownParent { class, .. } => class,
        HierarchyError::DuplicateClass { name } => name,
        HierarchyError::UnresolvableParents { class } => class,
    };
    program
        .classes
        .iter()
        .find(|class| &class.name == class_name)
        .map(|class| (class.file.as_str(), class.line))
        .unwrap_or(("<unknown>", 0))
}
