//! Symbols and lexical scopes.
//!
//! Scopes live in an arena owned by [`ScopeTree`]; a scope refers to its
//! parent by index, so the chain is used for lookup only and never owns
//! anything. Index `0` is the global scope and the only one without a
//! parent.

use std::collections::HashMap;

use serde::Serialize;

use crate::span::Span;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function { params: Vec<Type> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Annotated type, else the initializer's type, else `Unknown`.
    pub ty: Type,
    pub depth: usize,
    pub declared_at: Span,
    /// Top-level variables are hoisted; this flips once the declaration
    /// itself has been checked.
    pub initialized: bool,
}

impl Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Symbol", 6)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("symbol", &self.kind)?;
        state.serialize_field("type", &self.ty)?;
        state.serialize_field("depth", &self.depth)?;
        state.serialize_field("line", &self.declared_at.start.line)?;
        state.serialize_field("column", &self.declared_at.start.column)?;
        state.end()
    }
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    depth: usize,
    symbols: HashMap<String, Symbol>,
    /// Names declared further down in this block, not visible yet.
    pending: HashMap<String, Span>,
}

/// Outcome of resolving a name against a scope chain.
#[derive(Debug)]
pub enum Lookup<'a> {
    Found(&'a Symbol),
    /// The innermost binding of the name is declared later in its block.
    NotYetDeclared(Span),
    Missing,
}

#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let depth = self.scopes[parent.0].depth + 1;
        self.scopes.push(Scope {
            parent: Some(parent),
            depth,
            ..Scope::default()
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    pub fn depth(&self, scope: ScopeId) -> usize {
        self.scopes[scope.0].depth
    }

    /// Insert `symbol` into `scope`; on a clash the existing symbol is
    /// returned and nothing changes.
    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> Result<(), &Symbol> {
        let scope = &mut self.scopes[scope.0];
        if scope.symbols.contains_key(&symbol.name) {
            return Err(&scope.symbols[&symbol.name]);
        }
        scope.pending.remove(&symbol.name);
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Announce that `name` will be declared later in `scope`.
    pub fn announce(&mut self, scope: ScopeId, name: &str, span: Span) {
        self.scopes[scope.0]
            .pending
            .entry(name.to_string())
            .or_insert(span);
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.scopes[scope.0].symbols.get(name)
    }

    pub fn lookup_local_mut(&mut self, scope: ScopeId, name: &str) -> Option<&mut Symbol> {
        self.scopes[scope.0].symbols.get_mut(name)
    }

    /// Resolve `name` innermost-first.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Lookup<'_> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(symbol) = scope.symbols.get(name) {
                return Lookup::Found(symbol);
            }
            if let Some(span) = scope.pending.get(name) {
                return Lookup::NotYetDeclared(*span);
            }
            current = scope.parent;
        }
        Lookup::Missing
    }

    /// Symbols of the global scope in declaration order.
    pub fn globals(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.scopes[0].symbols.values().cloned().collect();
        symbols.sort_by_key(|s| s.declared_at.start.offset);
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;

    fn var(name: &str, offset: u32) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::Variable,
            ty: Type::Int,
            depth: 0,
            declared_at: Span::new(Position::new(1, offset + 1, offset), offset + 1),
            initialized: true,
        }
    }

    #[test]
    fn resolves_innermost_first() {
        let mut tree = ScopeTree::new();
        tree.declare(ScopeId::GLOBAL, var("x", 0)).expect("declare");
        let inner = tree.push(ScopeId::GLOBAL);
        let mut shadow = var("x", 5);
        shadow.ty = Type::Str;
        tree.declare(inner, shadow).expect("shadowing is allowed");

        match tree.lookup(inner, "x") {
            Lookup::Found(symbol) => assert_eq!(symbol.ty, Type::Str),
            other => panic!("unexpected {other:?}"),
        }
        match tree.lookup(ScopeId::GLOBAL, "x") {
            Lookup::Found(symbol) => assert_eq!(symbol.ty, Type::Int),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(tree.parent(inner), Some(ScopeId::GLOBAL));
        assert_eq!(tree.parent(ScopeId::GLOBAL), None);
        assert_eq!(tree.depth(inner), 1);
    }

    #[test]
    fn rejects_duplicate_in_same_scope() {
        let mut tree = ScopeTree::new();
        tree.declare(ScopeId::GLOBAL, var("x", 0)).expect("declare");
        let existing = tree
            .declare(ScopeId::GLOBAL, var("x", 9))
            .expect_err("duplicate");
        assert_eq!(existing.declared_at.start.offset, 0);
    }

    #[test]
    fn pending_names_hide_outer_bindings() {
        let mut tree = ScopeTree::new();
        tree.declare(ScopeId::GLOBAL, var("x", 0)).expect("declare");
        let block = tree.push(ScopeId::GLOBAL);
        tree.announce(block, "x", Span::default());

        assert!(matches!(tree.lookup(block, "x"), Lookup::NotYetDeclared(_)));
        tree.declare(block, var("x", 4)).expect("declare");
        assert!(matches!(tree.lookup(block, "x"), Lookup::Found(_)));
        assert!(matches!(tree.lookup(block, "y"), Lookup::Missing));
    }

    #[test]
    fn lists_globals_in_declaration_order() {
        let mut tree = ScopeTree::new();
        tree.declare(ScopeId::GLOBAL, var("b", 10)).expect("declare");
        tree.declare(ScopeId::GLOBAL, var("a", 2)).expect("declare");
        let names: Vec<_> = tree.globals().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
