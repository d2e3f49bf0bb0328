//! Identifier interning.
//!
//! Identifiers are interned once by the scanner; everything downstream
//! (AST nodes, environment keys) passes around cheap `Symbol` handles.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// Owns every symbol seen so far and hands out shared handles for them.
#[derive(Debug, Default)]
pub struct Interner(HashSet<Symbol>);

impl Interner {
    pub fn new() -> Interner {
        Interner::default()
    }

    /// Returns the unique symbol for `name`, creating it on first sight.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.0.get(name) {
            sym.clone()
        } else {
            let sym = Symbol(Rc::from(name));
            self.0.insert(sym.clone());
            sym
        }
    }
}

/// An interned identifier.
///
/// At most one `Symbol` exists per distinct string within an interner, so
/// equality is a pointer comparison.
#[derive(Debug, Hash, Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_keeps_its_name() {
        let mut interner = Interner::new();
        assert_eq!(interner.intern("foo").as_str(), "foo");
    }

    #[test]
    fn interning_twice_yields_the_same_symbol() {
        let mut interner = Interner::new();
        let first = interner.intern("foo");
        let second = interner.intern("foo");
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_names_yield_distinct_symbols() {
        let mut interner = Interner::new();
        let foo = interner.intern("foo");
        let bar = interner.intern("bar");
        assert_ne!(foo, bar);
    }
}
