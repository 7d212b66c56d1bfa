//! Class hierarchy model and subtype relation
//!
//! The hierarchy is a tree of classes rooted at `Object`. Parent links
//! are names resolved through the shared name-to-class map, never
//! owning pointers, so the structure stays cycle-free without lifetime
//! entanglement. Each class carries two scoped tables that extend its
//! parent's tables by one level:
//! - the field table, holding inherited and own fields plus the
//!   `this`/`super` bindings for the class, and
//! - the method table, holding inherited and own method signatures.
//!
//! The level of a class's own scope in both tables is its field level;
//! the type checker uses it to separate own/inherited fields from
//! locals. Construction here is the minimal populate step the driver
//! and tests need; inheritance-cycle detection proper is a concern of
//! the upstream hierarchy builder.

use std::fmt;
use std::rc::Rc;

use ast::{Class, Member, Program, Ty, OBJECT_CLASS, STRING_CLASS};
use indexmap::IndexMap;

use crate::symbol_table::ScopeStack;

/// The resolved signature of a declared method. No overloading exists:
/// one name resolves to exactly one signature per class.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSig {
    pub name: String,
    pub return_type: Ty,
    /// Formal parameters in declaration order.
    pub formals: Vec<(String, Ty)>,
    pub line: u32,
}

/// One node of the class hierarchy.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    /// Parent class name; `None` only for the root `Object`.
    pub parent: Option<String>,
    /// Source file the class was declared in, used for diagnostics.
    pub file: String,
    /// Scope level of this class's own field scope.
    pub field_level: usize,
    /// Inherited and own fields, plus `this` and `super` bindings.
    pub fields: ScopeStack<Ty>,
    /// Inherited and own method signatures.
    pub methods: ScopeStack<Rc<MethodSig>>,
}

/// Failure while populating the hierarchy from a parsed program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// A class names a parent that is declared nowhere.
    UnknownParent { class: String, parent: String },
    /// Two classes (or a class and a built-in) share a name.
    DuplicateClass { name: String },
    /// The parent chain never reaches a buildable class. Full cycle
    /// reporting belongs to the upstream builder; this is only the
    /// guard that keeps populate from looping.
    UnresolvableParents { class: String },
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyError::UnknownParent { class, parent } => {
                write!(f, "class {} extends undeclared class {}", class, parent)
            }
            HierarchyError::DuplicateClass { name } => {
                write!(f, "class {} is declared more than once", name)
            }
            HierarchyError::UnresolvableParents { class } => {
                write!(f, "parent chain of class {} cannot be resolved", class)
            }
        }
    }
}

impl std::error::Error for HierarchyError {}

/// The shared name-to-class map over the whole program, declaration
/// order preserved.
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    classes: IndexMap<String, ClassInfo>,
}

impl ClassHierarchy {
    /// A hierarchy holding only the built-in classes: the root
    /// `Object` and `String` (with `length()`).
    pub fn with_builtins() -> Self {
        let mut hierarchy = ClassHierarchy::default();

        let mut fields: ScopeStack<Ty> = ScopeStack::new();
        fields.enter_scope();
        fields.add("this", Ty::Class(OBJECT_CLASS.to_string()));
        let mut methods: ScopeStack<Rc<MethodSig>> = ScopeStack::new();
        methods.enter_scope();
        let object = ClassInfo {
            name: OBJECT_CLASS.to_string(),
            parent: None,
            file: "<built-in>".to_string(),
            field_level: 1,
            fields,
            methods,
        };

        let mut string_fields = object.fields.clone();
        string_fields.enter_scope();
        string_fields.add("this", Ty::Class(STRING_CLASS.to_string()));
        string_fields.add("super", Ty::Class(OBJECT_CLASS.to_string()));
        let mut string_methods = object.methods.clone();
        string_methods.enter_scope();
        string_methods.add(
            "length",
            Rc::new(MethodSig {
                name: "length".to_string(),
                return_type: Ty::Int,
                formals: Vec::new(),
                line: 0,
            }),
        );
        let string = ClassInfo {
            name: STRING_CLASS.to_string(),
            parent: Some(OBJECT_CLASS.to_string()),
            file: "<built-in>".to_string(),
            field_level: 2,
            fields: string_fields,
            methods: string_methods,
        };

        hierarchy.classes.insert(object.name.clone(), object);
        hierarchy.classes.insert(string.name.clone(), string);
        hierarchy
    }

    /// Build the hierarchy for a parsed program: built-ins first, then
    /// every declared class with its tables stacked on its parent's.
    /// Classes may be declared in any order.
    pub fn populate(program: &Program) -> Result<Self, HierarchyError> {
        let mut hierarchy = Self::with_builtins();

        let mut pending: Vec<&Class> = Vec::new();
        for class in &program.classes {
            if hierarchy.classes.contains_key(&class.name)
                || pending.iter().any(|c| c.name == class.name)
            {
                return Err(HierarchyError::DuplicateClass {
                    name: class.name.clone(),
                });
            }
            pending.push(class);
        }

        // Parents must be built before children; sweep until no class
        // can make progress.
        while !pending.is_empty() {
            let mut progressed = false;
            pending.retain(|class| {
                let parent_name = class.parent.as_deref().unwrap_or(OBJECT_CLASS);
                match hierarchy.classes.get(parent_name) {
                    Some(parent) => {
                        let info = build_class_info(class, parent);
                        hierarchy.classes.insert(info.name.clone(), info);
                        progressed = true;
                        false
                    }
                    None => true,
                }
            });
            if !progressed {
                let class = pending[0];
                let parent = class.parent.as_deref().unwrap_or(OBJECT_CLASS);
                let parent_declared = program.classes.iter().any(|c| c.name == parent);
                return Err(if parent_declared {
                    HierarchyError::UnresolvableParents {
                        class: class.name.clone(),
                    }
                } else {
                    HierarchyError::UnknownParent {
                        class: class.name.clone(),
                        parent: parent.to_string(),
                    }
                });
            }
        }

        Ok(hierarchy)
    }

    /// Look up a class by name; `None` means undeclared.
    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    /// The parent of a class, resolved through the shared map.
    pub fn parent_of(&self, class: &ClassInfo) -> Option<&ClassInfo> {
        class.parent.as_deref().and_then(|name| self.get(name))
    }

    /// All classes in declaration order (built-ins first).
    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    /// True if `name` spells a primitive type or a declared class.
    pub fn is_declared_type(&self, name: &str) -> bool {
        name == "int" || name == "boolean" || self.classes.contains_key(name)
    }

    /// The subtype relation:
    /// - the null type is a subtype of every non-primitive type;
    /// - a primitive is a subtype of itself only;
    /// - a class type is a subtype of every class on its parent chain
    ///   up to the root.
    ///
    /// Undeclared class names are subtypes of nothing, themselves
    /// included.
    pub fn is_subtype(&self, a: &Ty, b: &Ty) -> bool {
        if *a == Ty::Null && !b.is_primitive() {
            return true;
        }
        if a.is_primitive() || b.is_primitive() {
            return a == b;
        }
        let (Some(a_name), Some(b_name)) = (a.class_name(), b.class_name()) else {
            return false;
        };
        let mut current = self.get(a_name);
        while let Some(class) = current {
            if class.name == b_name {
                return true;
            }
            current = self.parent_of(class);
        }
        false
    }
}

fn build_class_info(class: &Class, parent: &ClassInfo) -> ClassInfo {
    let parent_name = class.parent.as_deref().unwrap_or(OBJECT_CLASS);

    let mut fields = parent.fields.clone();
    fields.enter_scope();
    fields.add("this", Ty::Class(class.name.clone()));
    fields.add("super", Ty::Class(parent_name.to_string()));

    let mut methods = parent.methods.clone();
    methods.enter_scope();

    for member in &class.members {
        match member {
            Member::Field(field) => {
                fields.add(&field.name, Ty::from_name(&field.declared_type));
            }
            Member::Method(method) => {
                methods.add(
                    &method.name,
                    Rc::new(MethodSig {
                        name: method.name.clone(),
                        return_type: Ty::from_name(&method.return_type),
                        formals: method
                            .formals
                            .iter()
                            .map(|f| (f.name.clone(), Ty::from_name(&f.declared_type)))
                            .collect(),
                        line: method.line,
                    }),
                );
            }
        }
    }

    let field_level = fields.current_level();
    ClassInfo {
        name: class.name.clone(),
        parent: Some(parent_name.to_string()),
        file: class.file.clone(),
        field_level,
        fields,
        methods,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{Field, Formal, Method};

    fn animal_dog_program() -> Program {
        let animal = Class::new(
            1,
            "Animal",
            None,
            "Animal.btm",
            vec![
                Member::Field(Field::new(2, "age", "int", None)),
                Member::Method(Method::new(
                    3,
                    "speak",
                    "void",
                    vec![Formal::new(3, "times", "int")],
                    vec![],
                )),
            ],
        );
        let dog = Class::new(
            1,
            "Dog",
            Some("Animal"),
            "Dog.btm",
            vec![Member::Field(Field::new(2, "breed", "String", None))],
        );
        // Declaration order deliberately child-first.
        Program::new(vec![dog, animal])
    }

    #[test]
    fn builtins_are_present() {
        let hierarchy = ClassHierarchy::with_builtins();
        assert!(hierarchy.get(OBJECT_CLASS).is_some());
        let string = hierarchy.get(STRING_CLASS).unwrap();
        assert_eq!(string.parent.as_deref(), Some(OBJECT_CLASS));
        assert!(string.methods.lookup("length").is_some());
    }

    #[test]
    fn populate_resolves_out_of_order_parents() {
        let hierarchy = ClassHierarchy::populate(&animal_dog_program()).unwrap();
        let dog = hierarchy.get("Dog").unwrap();
        assert_eq!(dog.parent.as_deref(), Some("Animal"));
        // Object=1, Animal=2, Dog=3
        assert_eq!(dog.field_level, 3);
        assert_eq!(hierarchy.get("Animal").unwrap().field_level, 2);
    }

    #[test]
    fn child_tables_extend_parent_tables() {
        let hierarchy = ClassHierarchy::populate(&animal_dog_program()).unwrap();
        let dog = hierarchy.get("Dog").unwrap();

        // Inherited field and method visible through the child tables.
        assert_eq!(dog.fields.lookup("age"), Some(&Ty::Int));
        assert!(dog.methods.lookup("speak").is_some());
        // this/super rebound at the child's own level.
        assert_eq!(dog.fields.lookup("this"), Some(&Ty::Class("Dog".into())));
        assert_eq!(
            dog.fields.lookup("super"),
            Some(&Ty::Class("Animal".into()))
        );
        assert_eq!(dog.fields.level_of("age"), Some(2));
        assert_eq!(dog.fields.level_of("breed"), Some(3));
    }

    #[test]
    fn unknown_parent_is_an_error() {
        let orphan = Class::new(1, "Orphan", Some("Ghost"), "Orphan.btm", vec![]);
        let err = ClassHierarchy::populate(&Program::new(vec![orphan])).unwrap_err();
        assert_eq!(
            err,
            HierarchyError::UnknownParent {
                class: "Orphan".to_string(),
                parent: "Ghost".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_class_is_an_error() {
        let a = Class::new(1, "Dup", None, "A.btm", vec![]);
        let b = Class::new(1, "Dup", None, "B.btm", vec![]);
        let err = ClassHierarchy::populate(&Program::new(vec![a, b])).unwrap_err();
        assert_eq!(err, HierarchyError::DuplicateClass { name: "Dup".into() });
    }

    #[test]
    fn subtype_is_reflexive_for_declared_types() {
        let hierarchy = ClassHierarchy::populate(&animal_dog_program()).unwrap();
        for ty in [
            Ty::Int,
            Ty::Boolean,
            Ty::Class("Animal".into()),
            Ty::Class("Dog".into()),
            Ty::object(),
        ] {
            assert!(hierarchy.is_subtype(&ty, &ty), "{} <: {}", ty, ty);
        }
    }

    #[test]
    fn subtype_walks_the_parent_chain() {
        let hierarchy = ClassHierarchy::populate(&animal_dog_program()).unwrap();
        let dog = Ty::Class("Dog".into());
        let animal = Ty::Class("Animal".into());

        assert!(hierarchy.is_subtype(&dog, &animal));
        assert!(hierarchy.is_subtype(&dog, &Ty::object()));
        assert!(!hierarchy.is_subtype(&animal, &dog));
        assert!(!hierarchy.is_subtype(&Ty::object(), &dog));
    }

    #[test]
    fn null_is_a_subtype_of_reference_types_only() {
        let hierarchy = ClassHierarchy::with_builtins();
        assert!(hierarchy.is_subtype(&Ty::Null, &Ty::object()));
        assert!(hierarchy.is_subtype(&Ty::Null, &Ty::string()));
        assert!(!hierarchy.is_subtype(&Ty::Null, &Ty::Int));
        assert!(!hierarchy.is_subtype(&Ty::Null, &Ty::Boolean));
    }

    #[test]
    fn primitives_match_only_themselves() {
        let hierarchy = ClassHierarchy::with_builtins();
        assert!(!hierarchy.is_subtype(&Ty::Int, &Ty::Boolean));
        assert!(!hierarchy.is_subtype(&Ty::Int, &Ty::object()));
        assert!(!hierarchy.is_subtype(&Ty::object(), &Ty::Int));
    }

    #[test]
    fn undeclared_class_is_subtype_of_nothing() {
        let hierarchy = ClassHierarchy::with_builtins();
        let ghost = Ty::Class("Ghost".into());
        assert!(!hierarchy.is_subtype(&ghost, &ghost));
        assert!(!hierarchy.is_subtype(&ghost, &Ty::object()));
    }
}
