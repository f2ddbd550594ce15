use compact_str::CompactString;

use crate::target::TargetPath;
use crate::value::ValueType;

/// How the columns of a flat result rebuild the nested graph.
///
/// Level 0 is the root: one element per distinct primary row id. Every other
/// level hangs below its parent at `target` and is keyed by the chain of row
/// ids from the root down to itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializePlan {
    pub levels: Vec<LevelPlan>,
    pub columns: Vec<ColumnPlan>,
    /// Aliases of the selected row-id columns
    pub row_ids: Vec<CompactString>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelPlan {
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Index into [`MaterializePlan::row_ids`]
    pub row_id: usize,
    /// One object (or null) per parent instead of a collection
    pub single: bool,
    /// Relative to the parent level's element
    pub target: TargetPath,
    /// Absolute target, for diagnostics
    pub label: String,
    pub table: CompactString,
    /// Row ids of tables read row-by-row at this level without being a level
    /// of their own; they must stay constant per element
    pub witnesses: Vec<Witness>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub row_id: usize,
    pub table: CompactString,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPlan {
    pub alias: CompactString,
    pub level: usize,
    /// Relative to its level's element
    pub target: TargetPath,
    pub ty: ValueType,
}

impl MaterializePlan {
    /// A plan whose root level is keyed by `row_id_alias`.
    pub fn new(row_id_alias: impl Into<CompactString>, table: impl Into<CompactString>) -> Self {
        let mut plan = Self::default();
        let row_id = plan.add_row_id(row_id_alias);
        plan.levels.push(LevelPlan {
            parent: None,
            children: Vec::new(),
            row_id,
            single: false,
            target: TargetPath::root(),
            label: String::new(),
            table: table.into(),
            witnesses: Vec::new(),
        });
        plan
    }

    /// Registers a row-id column, reusing an existing slot for the same alias.
    pub fn add_row_id(&mut self, alias: impl Into<CompactString>) -> usize {
        let alias = alias.into();
        if let Some(index) = self.row_ids.iter().position(|a| *a == alias) {
            return index;
        }
        self.row_ids.push(alias);
        self.row_ids.len() - 1
    }

    pub fn add_level(
        &mut self,
        parent: usize,
        row_id: usize,
        single: bool,
        target: TargetPath,
        label: impl Into<String>,
        table: impl Into<CompactString>,
    ) -> usize {
        let index = self.levels.len();
        self.levels.push(LevelPlan {
            parent: Some(parent),
            children: Vec::new(),
            row_id,
            single,
            target,
            label: label.into(),
            table: table.into(),
            witnesses: Vec::new(),
        });
        self.levels[parent].children.push(index);
        index
    }

    pub fn add_column(
        &mut self,
        alias: impl Into<CompactString>,
        level: usize,
        target: TargetPath,
        ty: ValueType,
    ) {
        self.columns.push(ColumnPlan {
            alias: alias.into(),
            level,
            target,
            ty,
        });
    }

    pub fn add_witness(&mut self, level: usize, row_id: usize, table: impl Into<CompactString>) {
        let witness = Witness {
            row_id,
            table: table.into(),
        };
        let witnesses = &mut self.levels[level].witnesses;
        if !witnesses.contains(&witness) {
            witnesses.push(witness);
        }
    }
}
