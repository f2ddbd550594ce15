//! Binds symbolic leaves to concrete statement columns.

use compact_str::CompactString;

use crate::accumulator::Accumulator;
use crate::element::{Binding, ColumnRef, ParamRoot, PropertyPath, ResolvedElement, SymbolicElement};
use crate::error::{Result, RowshapeError};
use crate::schema::NamingResolver;
use crate::statement::{Lookup, Statement};
use crate::syntax::ROW_ID;
use crate::value::ValueType;

/// Rewrites `root` + `path` into a path starting at the shape parameter.
pub(crate) fn qualify(
    bindings: &[Binding],
    root: ParamRoot,
    path: &[CompactString],
) -> Result<PropertyPath> {
    let mut segments: PropertyPath = path.iter().cloned().collect();
    let mut current = root;
    // Bindings only ever refer to earlier bindings.
    for _ in 0..=bindings.len() {
        match current {
            ParamRoot::Row => return Ok(segments),
            ParamRoot::Binding(id) => {
                let binding = bindings.get(id.0).ok_or_else(|| {
                    RowshapeError::invariant(format!("binding #{} was never registered", id.0))
                })?;
                let mut qualified = binding.path.clone();
                qualified.extend(segments);
                segments = qualified;
                current = binding.root;
            }
        }
    }
    Err(RowshapeError::invariant("lambda parameter bindings form a cycle"))
}

/// Pure: resolving the same element twice yields equal results.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'s> {
    statement: &'s Statement,
    naming: &'s dyn NamingResolver,
    bindings: &'s [Binding],
}

impl<'s> Resolver<'s> {
    pub fn new(statement: &'s Statement, naming: &'s dyn NamingResolver, bindings: &'s [Binding]) -> Self {
        Self {
            statement,
            naming,
            bindings,
        }
    }

    pub fn resolve(&self, element: &SymbolicElement) -> Result<ResolvedElement> {
        let (root, path, aggregation_table, function) = match element {
            SymbolicElement::Parameter(id) => return Ok(ResolvedElement::Parameter(*id)),
            SymbolicElement::Column {
                root,
                path,
                aggregation_table,
                function,
            } => (root, path, aggregation_table, function),
        };

        let qualified = qualify(self.bindings, *root, path)?;
        let display = qualified.join(".");
        let (table, column, ty) = match self.statement.lookup(&qualified) {
            Some(Lookup::Column(table, column)) => (
                table,
                column.column_name(&table.schema.name, self.naming),
                column.ty,
            ),
            Some(Lookup::RowId(table)) => (table, ROW_ID.into(), ValueType::Integer),
            Some(Lookup::Table(table)) => {
                return Err(RowshapeError::unsupported(
                    display,
                    format!("`{}` is a table, not a column", table.schema.name),
                ));
            }
            Some(Lookup::Shape) => {
                return Err(RowshapeError::unsupported(
                    "q",
                    "the query shape cannot be used as a value",
                ));
            }
            None => {
                return Err(RowshapeError::unsupported(display, "no such member"));
            }
        };

        let governing = aggregation_table.map_or(table, |id| self.statement.table(id));
        Ok(ResolvedElement::Column {
            column: ColumnRef {
                table: table.id,
                table_alias: table.alias.clone(),
                column,
            },
            row_id: ColumnRef::row_id(governing.id, governing.alias.clone()),
            function: *function,
            ty,
        })
    }

    pub fn resolve_accumulator(
        &self,
        accumulator: &Accumulator<SymbolicElement>,
    ) -> Result<Accumulator<ResolvedElement>> {
        accumulator.try_map(&mut |e| self.resolve(e))
    }
}
