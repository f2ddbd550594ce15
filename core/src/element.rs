//! Leaf representations of the accumulator algebra.
//!
//! Compilation produces [`SymbolicElement`]s: references expressed relative
//! to the lambda parameter they were reached through. The resolver turns each
//! into a [`ResolvedElement`] bound to a concrete statement column.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::accumulator::AccumulatorElement;
use crate::expr::ScalarFunction;
use crate::params::ParamId;
use crate::statement::TableId;
use crate::syntax::ROW_ID;
use crate::value::ValueType;

/// Member names walked from a parameter root.
pub type PropertyPath = SmallVec<[CompactString; 4]>;

/// Index of a lambda-parameter binding recorded during compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(pub(crate) usize);

/// Where a property path starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRoot {
    /// The query shape parameter
    Row,
    /// A parameter introduced by an enclosing `select`
    Binding(BindingId),
}

/// "This lambda parameter stands for that property chain."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub root: ParamRoot,
    pub path: PropertyPath,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolicElement {
    Parameter(ParamId),
    Column {
        root: ParamRoot,
        path: PropertyPath,
        /// Materialize against this table's row instead of the column's own;
        /// set on leaves beneath an aggregate
        aggregation_table: Option<TableId>,
        function: Option<ScalarFunction>,
    },
}

impl SymbolicElement {
    pub fn column(root: ParamRoot, path: PropertyPath) -> Self {
        SymbolicElement::Column {
            root,
            path,
            aggregation_table: None,
            function: None,
        }
    }
}

impl AccumulatorElement for SymbolicElement {
    fn is_parameter(&self) -> bool {
        matches!(self, SymbolicElement::Parameter(_))
    }
}

/// A physical column of one statement table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: TableId,
    pub table_alias: CompactString,
    pub column: CompactString,
}

impl ColumnRef {
    pub fn row_id(table: TableId, table_alias: impl Into<CompactString>) -> Self {
        Self {
            table,
            table_alias: table_alias.into(),
            column: CompactString::const_new(ROW_ID),
        }
    }

    pub fn is_row_id(&self) -> bool {
        self.column == ROW_ID
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedElement {
    Parameter(ParamId),
    Column {
        column: ColumnRef,
        /// Row-id column of the table whose rows this value belongs to
        row_id: ColumnRef,
        function: Option<ScalarFunction>,
        ty: ValueType,
    },
}

impl ResolvedElement {
    /// The value is folded into a different (outer) table's rows than the
    /// one it is read from.
    pub fn column_is_aggregated_to_different_table(&self) -> bool {
        match self {
            ResolvedElement::Parameter(_) => false,
            ResolvedElement::Column { column, row_id, .. } => column.table != row_id.table,
        }
    }

    pub fn column(&self) -> Option<&ColumnRef> {
        match self {
            ResolvedElement::Parameter(_) => None,
            ResolvedElement::Column { column, .. } => Some(column),
        }
    }
}

impl AccumulatorElement for ResolvedElement {
    fn is_parameter(&self) -> bool {
        matches!(self, ResolvedElement::Parameter(_))
    }
}
