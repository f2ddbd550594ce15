use crate::accumulator::Accumulator;
use crate::element::SymbolicElement;
use crate::statement::TableId;
use crate::target::{Segment, TargetPath};
use crate::value::ValueType;

/// One output value: an accumulator and where its result lands.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedProperty<E = SymbolicElement> {
    pub accumulator: Accumulator<E>,
    pub target: TargetPath,
    pub ty: ValueType,
}

/// A table whose rows materialize at `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedTable {
    pub table: TableId,
    pub target: TargetPath,
    /// Only folded into an aggregate; contributes no elements of its own
    pub aggregated: bool,
    /// A single object per parent rather than a collection
    pub single: bool,
}

/// Result of compiling one sub-expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compiled {
    pub properties: Vec<MappedProperty>,
    pub tables: Vec<MappedTable>,
}

impl Compiled {
    pub(crate) fn value(accumulator: Accumulator<SymbolicElement>, ty: ValueType) -> Self {
        Self {
            properties: vec![MappedProperty {
                accumulator,
                target: TargetPath::root(),
                ty,
            }],
            tables: Vec::new(),
        }
    }

    pub(crate) fn with_tables(mut self, tables: impl IntoIterator<Item = MappedTable>) -> Self {
        self.tables.extend(tables);
        self
    }

    /// The single property at the root target, if that is all there is.
    pub(crate) fn as_single(&self) -> Option<&MappedProperty> {
        match self.properties.as_slice() {
            [property] if property.target.is_root() => Some(property),
            _ => None,
        }
    }

    pub(crate) fn prefixed(self, segment: Segment) -> Self {
        Self {
            properties: self
                .properties
                .into_iter()
                .map(|p| MappedProperty {
                    target: p.target.prefixed(segment.clone()),
                    ..p
                })
                .collect(),
            tables: self
                .tables
                .into_iter()
                .map(|t| MappedTable {
                    target: t.target.prefixed(segment.clone()),
                    ..t
                })
                .collect(),
        }
    }

    /// Keeps what lies beneath `segment`, with `segment` stripped.
    pub(crate) fn member(self, segment: &Segment) -> Self {
        Self {
            properties: self
                .properties
                .into_iter()
                .filter_map(|p| {
                    p.target.strip_segment(segment).map(|target| MappedProperty { target, ..p })
                })
                .collect(),
            tables: self
                .tables
                .into_iter()
                .filter_map(|t| {
                    t.target.strip_segment(segment).map(|target| MappedTable { target, ..t })
                })
                .collect(),
        }
    }

    pub(crate) fn merge(&mut self, other: Compiled) {
        self.properties.extend(other.properties);
        self.tables.extend(other.tables);
    }
}
