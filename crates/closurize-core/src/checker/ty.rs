//! Checker-level type model
//!
//! The shape of a type as the type checker understands it, decoupled from
//! both the input syntax and the emitted annotation strings. Constructs
//! with no sound annotation equivalent collapse to [`Type::Unknown`] at
//! construction time rather than during rendering.

use crate::checker::SymbolId;

/// A checker-level type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// `any`, `unknown`, `never`, or anything unresolvable; renders as `?`.
    Unknown,
    String,
    Number,
    Boolean,
    Void,
    Undefined,
    Null,
    Symbol,
    /// The plain `object` keyword.
    Object,
    /// A named type, possibly applied to type arguments.
    Reference {
        symbol: SymbolId,
        type_args: Vec<Type>,
    },
    /// A type parameter in scope.
    TypeParameter { symbol: SymbolId, name: String },
    /// Flattened union of at least two members.
    Union(Vec<Type>),
    Array(Box<Type>),
    Function(Box<FunctionType>),
    /// Structural object literal with only named properties.
    Record(Vec<RecordProperty>),
    /// Object type with a single index signature.
    IndexMap { key: Box<Type>, value: Box<Type> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub this_type: Option<Type>,
    pub params: Vec<ParamType>,
    pub ret: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamType {
    pub ty: Type,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordProperty {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
}

impl Type {
    /// Build a union, flattening nested unions and deduplicating members.
    /// A single surviving member collapses to itself.
    pub fn union(members: Vec<Type>) -> Type {
        let mut flat: Vec<Type> = Vec::with_capacity(members.len());
        for member in members {
            match member {
                Type::Union(inner) => {
                    for m in inner {
                        if !flat.contains(&m) {
                            flat.push(m);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => Type::Unknown,
            1 => flat.remove(0),
            _ => Type::Union(flat),
        }
    }

    /// Remove the null and undefined atoms, as for a non-null assertion.
    pub fn non_nullable(&self) -> Type {
        match self {
            Type::Union(members) => Type::union(
                members
                    .iter()
                    .filter(|m| !matches!(m, Type::Null | Type::Undefined))
                    .cloned()
                    .collect(),
            ),
            Type::Null | Type::Undefined => Type::Unknown,
            other => other.clone(),
        }
    }

    /// True when the union contains the given atom.
    pub fn union_contains(&self, atom: &Type) -> bool {
        match self {
            Type::Union(members) => members.contains(atom),
            other => other == atom,
        }
    }

    /// True for `Unknown` (the `?` fallback).
    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_flattens_and_dedupes() {
        let u = Type::union(vec![
            Type::String,
            Type::Union(vec![Type::Number, Type::String]),
            Type::Null,
        ]);
        assert_eq!(
            u,
            Type::Union(vec![Type::String, Type::Number, Type::Null])
        );
    }

    #[test]
    fn test_union_collapses_single_member() {
        assert_eq!(Type::union(vec![Type::String, Type::String]), Type::String);
    }

    #[test]
    fn test_non_nullable() {
        let u = Type::union(vec![Type::String, Type::Null, Type::Undefined]);
        assert_eq!(u.non_nullable(), Type::String);
        assert_eq!(Type::Null.non_nullable(), Type::Unknown);
        assert_eq!(Type::Number.non_nullable(), Type::Number);
    }
}
