//! Compilation state: permanent bindings plus the lexical scope chain.

use compact_str::{CompactString, format_compact};

use crate::element::{Binding, BindingId, ParamRoot, PropertyPath};
use crate::error::{Result, RowshapeError};
use crate::params::ParamPool;
use crate::resolver::qualify;
use crate::statement::{Lookup, Statement, TableId};
use crate::value::ValueType;

/// One lambda parameter in scope.
#[derive(Debug)]
pub(crate) struct Frame<'a> {
    pub(crate) name: &'a str,
    pub(crate) binding: BindingId,
    pub(crate) parent: Env<'a>,
}

/// Immutable chain of frames; inner frames shadow outer ones.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Env<'a> {
    frame: Option<&'a Frame<'a>>,
}

impl<'a> Env<'a> {
    pub(crate) fn with(frame: &'a Frame<'a>) -> Self {
        Self { frame: Some(frame) }
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<BindingId> {
        let mut current = self.frame;
        while let Some(frame) = current {
            if frame.name == name {
                return Some(frame.binding);
            }
            current = frame.parent.frame;
        }
        None
    }
}

/// Where a sub-expression is being compiled.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub(crate) env: Env<'a>,
    /// Table whose rows the enclosing mapping produces; aggregates fold into it
    pub(crate) table: TableId,
    pub(crate) in_aggregate: bool,
}

impl Scope<'static> {
    pub(crate) fn root(table: TableId) -> Self {
        Scope {
            env: Env::default(),
            table,
            in_aggregate: false,
        }
    }
}

pub(crate) struct Compiler<'s> {
    pub(crate) statement: &'s Statement,
    pub(crate) params: &'s mut ParamPool,
    pub(crate) bindings: Vec<Binding>,
    fresh: usize,
}

impl<'s> Compiler<'s> {
    pub(crate) fn new(
        statement: &'s Statement,
        params: &'s mut ParamPool,
    ) -> Self {
        Self {
            statement,
            params,
            bindings: Vec::new(),
            fresh: 0,
        }
    }

    pub(crate) fn bind(&mut self, root: ParamRoot, path: PropertyPath) -> BindingId {
        let id = BindingId(self.bindings.len());
        self.bindings.push(Binding { root, path });
        id
    }

    /// A lambda parameter name no user mapping can collide with.
    pub(crate) fn fresh_name(&mut self) -> CompactString {
        self.fresh += 1;
        format_compact!("#v{}", self.fresh)
    }

    pub(crate) fn lookup(&self, root: ParamRoot, path: &[CompactString]) -> Result<Option<Lookup<'s>>> {
        let qualified = qualify(&self.bindings, root, path)?;
        Ok(self.statement.lookup(&qualified))
    }

    pub(crate) fn type_of(&self, root: ParamRoot, path: &[CompactString]) -> Result<ValueType> {
        Ok(match self.lookup(root, path)? {
            Some(Lookup::Column(_, column)) => column.ty,
            Some(Lookup::RowId(_)) => ValueType::Integer,
            _ => ValueType::Any,
        })
    }

    pub(crate) fn binding_for(scope: &Scope<'_>, name: &str) -> Result<BindingId> {
        scope.env.lookup(name).ok_or_else(|| {
            RowshapeError::invariant(format!("lambda parameter `{name}` is not in scope"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_frames_shadow_outer_ones() {
        let outer = Frame {
            name: "c",
            binding: BindingId(0),
            parent: Env::default(),
        };
        let inner = Frame {
            name: "c",
            binding: BindingId(1),
            parent: Env::with(&outer),
        };
        let env = Env::with(&inner);
        assert_eq!(env.lookup("c"), Some(BindingId(1)));
        assert_eq!(Env::with(&outer).lookup("c"), Some(BindingId(0)));
        assert_eq!(env.lookup("t"), None);
    }
}
