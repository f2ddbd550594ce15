//! Rebuilds nested results from a flat row stream.
//!
//! Rows are consumed once, in arrival order. Each level of the plan keys its
//! elements by the chain of row ids from the root down to itself, so rows
//! repeated by sibling or nested joins reuse existing elements instead of
//! creating duplicates.

mod convert;
mod plan;

use compact_str::CompactString;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::driver::Row;
use crate::error::{Result, RowshapeError};
use crate::logging::Logger;
use crate::rowshape_log;
use crate::target::Segment;

pub(crate) use convert::integral;
pub use plan::{ColumnPlan, LevelPlan, MaterializePlan, Witness};

type Chain = SmallVec<[i64; 4]>;

#[derive(Debug)]
enum Slot {
    Many(Vec<usize>),
    One(Option<usize>),
}

#[derive(Debug)]
struct Node {
    level: usize,
    values: Vec<(usize, serde_json::Value)>,
    /// Parallel to the level's `children`
    slots: Vec<Slot>,
    witnesses: SmallVec<[Option<i64>; 2]>,
}

/// Row positions of the plan's columns, resolved from the first row's
/// header.
#[derive(Debug)]
struct Positions {
    columns: Vec<usize>,
    row_ids: Vec<usize>,
}

#[derive(Debug)]
pub struct Materializer<'p> {
    plan: &'p MaterializePlan,
    logger: &'p dyn Logger,
    positions: Option<Positions>,
    nodes: Vec<Node>,
    index: HashMap<(usize, Chain), usize>,
    roots: Vec<usize>,
    warned: Vec<bool>,
}

impl<'p> Materializer<'p> {
    pub fn new(plan: &'p MaterializePlan, logger: &'p dyn Logger) -> Self {
        Self {
            plan,
            logger,
            positions: None,
            nodes: Vec::new(),
            index: HashMap::new(),
            roots: Vec::new(),
            warned: vec![false; plan.columns.len()],
        }
    }

    fn resolve_positions(&self, row: &Row) -> Result<Positions> {
        let find = |alias: &CompactString| {
            row.columns()
                .iter()
                .position(|c| c == alias)
                .ok_or_else(|| {
                    RowshapeError::Conversion(format!("column `{alias}` is missing from the result"))
                })
        };
        Ok(Positions {
            columns: self
                .plan
                .columns
                .iter()
                .map(|c| find(&c.alias))
                .collect::<Result<_>>()?,
            row_ids: self.plan.row_ids.iter().map(find).collect::<Result<_>>()?,
        })
    }

    pub fn push_row(&mut self, row: &Row) -> Result<()> {
        if self.positions.is_none() {
            self.positions = Some(self.resolve_positions(row)?);
        }
        let Some(positions) = &self.positions else {
            return Err(RowshapeError::invariant("row positions were not resolved"));
        };
        let row_ids: SmallVec<[Option<i64>; 8]> = positions
            .row_ids
            .iter()
            .map(|&p| row.get(p).and_then(|v| v.as_row_id()))
            .collect();

        let plan = self.plan;
        let mut nodes: SmallVec<[Option<(usize, Chain)>; 8]> = SmallVec::new();
        for (li, level) in plan.levels.iter().enumerate() {
            let (parent, mut chain) = match level.parent {
                None => (None, Chain::new()),
                Some(p) => match &nodes[p] {
                    Some((node, chain)) => (Some(*node), chain.clone()),
                    None => {
                        nodes.push(None);
                        continue;
                    }
                },
            };
            let Some(id) = row_ids[level.row_id] else {
                if parent.is_none() {
                    return Err(RowshapeError::Conversion(format!(
                        "row id `{}` of the primary table is null",
                        plan.row_ids[level.row_id]
                    )));
                }
                nodes.push(None);
                continue;
            };
            chain.push(id);

            let witnesses: SmallVec<[Option<i64>; 2]> =
                level.witnesses.iter().map(|w| row_ids[w.row_id]).collect();
            let node = match self.index.get(&(li, chain.clone())) {
                Some(&node) => {
                    self.check_witnesses(node, &witnesses)?;
                    node
                }
                None => {
                    let node = self.create(li, row, id, witnesses)?;
                    self.index.insert((li, chain.clone()), node);
                    self.link(parent, li, node, id)?;
                    node
                }
            };
            nodes.push(Some((node, chain)));
        }
        Ok(())
    }

    fn create(
        &mut self,
        level: usize,
        row: &Row,
        id: i64,
        witnesses: SmallVec<[Option<i64>; 2]>,
    ) -> Result<usize> {
        let plan = self.plan;
        let Some(positions) = &self.positions else {
            return Err(RowshapeError::invariant("row positions were not resolved"));
        };
        let mut values = Vec::new();
        for (ci, column) in plan.columns.iter().enumerate() {
            if column.level != level {
                continue;
            }
            let cell = row.get(positions.columns[ci]).ok_or_else(|| {
                RowshapeError::Conversion(format!("row is missing column `{}`", column.alias))
            })?;
            let converted = convert::convert(cell, column.ty)?;
            if converted.inefficient && !self.warned[ci] {
                self.warned[ci] = true;
                rowshape_log!(
                    self.logger,
                    Warning,
                    InefficientCollectionConversion,
                    "column `{}` converted to {:?} from a different collection representation; select it as {:?} directly",
                    column.alias,
                    column.ty,
                    column.ty
                );
            }
            values.push((ci, converted.json));
        }

        let level_plan = &plan.levels[level];
        let slots = level_plan
            .children
            .iter()
            .map(|&child| {
                if plan.levels[child].single {
                    Slot::One(None)
                } else {
                    Slot::Many(Vec::new())
                }
            })
            .collect();
        self.nodes.push(Node {
            level,
            values,
            slots,
            witnesses,
        });
        rowshape_log!(
            self.logger,
            Debug,
            ObjectGraphNodeAllocated,
            "allocated `{}` element for row id {id} at `{}`",
            level_plan.table,
            level_plan.label
        );
        Ok(self.nodes.len() - 1)
    }

    fn link(&mut self, parent: Option<usize>, level: usize, node: usize, id: i64) -> Result<()> {
        let Some(parent) = parent else {
            self.roots.push(node);
            return Ok(());
        };
        let plan = self.plan;
        let parent_level = &plan.levels[self.nodes[parent].level];
        let slot = parent_level
            .children
            .iter()
            .position(|&c| c == level)
            .ok_or_else(|| RowshapeError::invariant("level is not a child of its parent"))?;
        match &mut self.nodes[parent].slots[slot] {
            Slot::Many(items) => items.push(node),
            Slot::One(current @ None) => *current = Some(node),
            Slot::One(Some(_)) => {
                let level = &plan.levels[level];
                return Err(RowshapeError::CardinalityViolation {
                    table: level.table.to_string(),
                    path: level.label.clone(),
                    detail: format!(
                        "a second distinct row (row id {id}) arrived for a single-valued slot"
                    ),
                });
            }
        }
        Ok(())
    }

    fn check_witnesses(&self, node: usize, witnesses: &[Option<i64>]) -> Result<()> {
        let node = &self.nodes[node];
        let level = &self.plan.levels[node.level];
        for (i, (seen, now)) in node.witnesses.iter().zip(witnesses).enumerate() {
            if seen != now {
                return Err(RowshapeError::CardinalityViolation {
                    table: level.witnesses[i].table.to_string(),
                    path: level.label.clone(),
                    detail: "more than one row was read for a value that holds one".into(),
                });
            }
        }
        Ok(())
    }

    /// Consumes the materializer, returning one graph per root element in
    /// arrival order.
    pub fn finish(self) -> Vec<serde_json::Value> {
        self.roots.iter().map(|&root| self.node_json(root)).collect()
    }

    fn node_json(&self, node: usize) -> serde_json::Value {
        let node = &self.nodes[node];
        let level = &self.plan.levels[node.level];
        let mut shape = Shape::Empty;
        for (column, value) in &node.values {
            shape.insert(self.plan.columns[*column].target.segments(), value.clone());
        }
        for (slot, &child) in node.slots.iter().zip(&level.children) {
            let value = match slot {
                Slot::Many(items) => {
                    serde_json::Value::Array(items.iter().map(|&n| self.node_json(n)).collect())
                }
                Slot::One(Some(n)) => self.node_json(*n),
                Slot::One(None) => serde_json::Value::Null,
            };
            shape.insert(self.plan.levels[child].target.segments(), value);
        }
        shape.into_json()
    }
}

/// Output tree of one element, keyed by target segments.
#[derive(Debug)]
enum Shape {
    Empty,
    Value(serde_json::Value),
    Object(Vec<(Segment, Shape)>),
}

impl Shape {
    fn insert(&mut self, path: &[Segment], value: serde_json::Value) {
        let Some((first, rest)) = path.split_first() else {
            *self = Shape::Value(value);
            return;
        };
        if !matches!(self, Shape::Object(_)) {
            *self = Shape::Object(Vec::new());
        }
        let Shape::Object(members) = self else {
            return;
        };
        let index = match members.iter().position(|(s, _)| s == first) {
            Some(index) => index,
            None => {
                members.push((first.clone(), Shape::Empty));
                members.len() - 1
            }
        };
        members[index].1.insert(rest, value);
    }

    /// Objects whose members are all positional become arrays.
    fn into_json(self) -> serde_json::Value {
        match self {
            Shape::Empty => serde_json::Value::Object(serde_json::Map::new()),
            Shape::Value(value) => value,
            Shape::Object(mut members) => {
                if members.iter().all(|(s, _)| matches!(s, Segment::Arg(_))) {
                    members.sort_by(|a, b| a.0.cmp(&b.0));
                    serde_json::Value::Array(members.into_iter().map(|(_, s)| s.into_json()).collect())
                } else {
                    serde_json::Value::Object(
                        members
                            .into_iter()
                            .map(|(segment, shape)| (segment.to_string(), shape.into_json()))
                            .collect(),
                    )
                }
            }
        }
    }
}
