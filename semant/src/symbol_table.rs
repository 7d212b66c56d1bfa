//! Scoped symbol tables
//!
//! A [`ScopeStack`] is an ordered stack of scopes mapping names to
//! values. Scope levels are 1-based and grow strictly on enter and
//! shrink strictly on exit; lookups search from the innermost scope
//! outward. The same structure backs variable tables (values are
//! types) and per-class method tables (values are method signatures):
//! each class's tables extend its parent's, so a class's own scope
//! level doubles as its field level.
//!
//! No operation fails; absence is `None` and callers decide whether
//! that is an error.

use fxhash::FxHashMap;

/// A stack of scopes mapping `name -> V`.
#[derive(Debug, Clone)]
pub struct ScopeStack<V> {
    scopes: Vec<FxHashMap<String, V>>,
}

impl<V> Default for ScopeStack<V> {
    fn default() -> Self {
        Self { scopes: Vec::new() }
    }
}

impl<V: Clone> ScopeStack<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The level of the innermost scope; 0 when no scope is open.
    pub fn current_level(&self) -> usize {
        self.scopes.len()
    }

    /// Push a new innermost scope.
    pub fn enter_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Pop the innermost scope. Popping with no open scope is a no-op;
    /// enter/exit pairing is the caller's invariant.
    pub fn exit_scope(&mut self) {
        debug_assert!(!self.scopes.is_empty(), "exit_scope with no open scope");
        self.scopes.pop();
    }

    /// Bind `name` in the innermost scope, shadowing any outer binding
    /// of the same name.
    pub fn add(&mut self, name: impl Into<String>, value: V) {
        debug_assert!(!self.scopes.is_empty(), "add with no open scope");
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    /// The nearest enclosing binding of `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&V> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Like [`lookup`](Self::lookup), but only scopes at levels
    /// `<= max_level` are searched. Used to test "declared in exactly
    /// this scope" and to bound field lookups at a class's own level.
    pub fn lookup_to(&self, name: &str, max_level: usize) -> Option<&V> {
        let bound = max_level.min(self.scopes.len());
        self.scopes[..bound]
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
    }

    /// The level at which `name` currently resolves, if bound.
    pub fn level_of(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rposition(|scope| scope.contains_key(name))
            .map(|index| index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_and_exit_track_levels() {
        let mut table: ScopeStack<i32> = ScopeStack::new();
        assert_eq!(table.current_level(), 0);
        table.enter_scope();
        assert_eq!(table.current_level(), 1);
        table.enter_scope();
        assert_eq!(table.current_level(), 2);
        table.exit_scope();
        assert_eq!(table.current_level(), 1);
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let mut table = ScopeStack::new();
        table.enter_scope();
        table.add("x", 1);
        table.enter_scope();
        table.add("x", 2);

        assert_eq!(table.lookup("x"), Some(&2));
        assert_eq!(table.level_of("x"), Some(2));
        table.exit_scope();
        assert_eq!(table.lookup("x"), Some(&1));
        assert_eq!(table.level_of("x"), Some(1));
    }

    #[test]
    fn lookup_to_bounds_the_search() {
        let mut table = ScopeStack::new();
        table.enter_scope();
        table.add("x", 1);
        table.enter_scope();
        table.add("x", 2);
        table.enter_scope();

        assert_eq!(table.lookup_to("x", 1), Some(&1));
        assert_eq!(table.lookup_to("x", 2), Some(&2));
        assert_eq!(table.lookup_to("x", 3), Some(&2));
        assert_eq!(table.lookup_to("x", 0), None);
    }

    #[test]
    fn absence_is_none() {
        let mut table: ScopeStack<i32> = ScopeStack::new();
        table.enter_scope();
        assert_eq!(table.lookup("missing"), None);
        assert_eq!(table.level_of("missing"), None);
    }

    #[test]
    fn exit_discards_bindings() {
        let mut table = ScopeStack::new();
        table.enter_scope();
        table.enter_scope();
        table.add("y", 9);
        table.exit_scope();
        assert_eq!(table.lookup("y"), None);
    }
}
