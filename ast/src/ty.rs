//! Static types of the Bantam language
//!
//! The type lattice is small: the two primitives `int` and `boolean`,
//! `void` (method return position only), the `null` type of the `null`
//! literal, and declared class types rooted at `Object`.

use std::fmt;

/// Name of the universal root class.
pub const OBJECT_CLASS: &str = "Object";

/// Name of the built-in string class.
pub const STRING_CLASS: &str = "String";

/// A resolved static type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    /// Primitive `int`
    Int,
    /// Primitive `boolean`
    Boolean,
    /// `void`, legal only as a method return type
    Void,
    /// The type of the `null` literal
    Null,
    /// A declared (or referenced) class type
    Class(String),
}

impl Ty {
    /// Map a source-level type name to a `Ty`. Anything that is not one
    /// of the reserved spellings is treated as a class name, declared
    /// or not; declaredness is checked against the class hierarchy.
    pub fn from_name(name: &str) -> Ty {
        match name {
            "int" => Ty::Int,
            "boolean" => Ty::Boolean,
            "void" => Ty::Void,
            "null" => Ty::Null,
            _ => Ty::Class(name.to_string()),
        }
    }

    /// The fallback type assigned to expressions whose true type could
    /// not be determined; lets the traversal continue past an error.
    pub fn object() -> Ty {
        Ty::Class(OBJECT_CLASS.to_string())
    }

    /// The type of string constants.
    pub fn string() -> Ty {
        Ty::Class(STRING_CLASS.to_string())
    }

    /// `int` and `boolean` are the only primitive types.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Ty::Int | Ty::Boolean)
    }

    /// The class name if this is a class type.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Ty::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int => write!(f, "int"),
            Ty::Boolean => write!(f, "boolean"),
            Ty::Void => write!(f, "void"),
            Ty::Null => write!(f, "null"),
            Ty::Class(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_maps_reserved_spellings() {
        assert_eq!(Ty::from_name("int"), Ty::Int);
        assert_eq!(Ty::from_name("boolean"), Ty::Boolean);
        assert_eq!(Ty::from_name("void"), Ty::Void);
        assert_eq!(Ty::from_name("null"), Ty::Null);
        assert_eq!(Ty::from_name("Shape"), Ty::Class("Shape".to_string()));
    }

    #[test]
    fn display_round_trips_names() {
        assert_eq!(Ty::Int.to_string(), "int");
        assert_eq!(Ty::object().to_string(), "Object");
        assert_eq!(Ty::string().to_string(), "String");
    }

    #[test]
    fn only_int_and_boolean_are_primitive() {
        assert!(Ty::Int.is_primitive());
        assert!(Ty::Boolean.is_primitive());
        assert!(!Ty::Void.is_primitive());
        assert!(!Ty::Null.is_primitive());
        assert!(!Ty::object().is_primitive());
    }
}
