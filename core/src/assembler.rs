//! Statement assembly: resolved properties in, one SELECT plus its
//! materialization plan out.
//!
//! The assembler decides the level (nested object or collection) each
//! property materializes at, which joined tables the rendered statement
//! still needs, and how the rows must be grouped and ordered.

use compact_str::{CompactString, format_compact};
use hashbrown::HashSet;

use crate::accumulator::{Accumulator, AggregationType, UnaryOperator};
use crate::compiler::{MappedProperty, MappedTable};
use crate::element::{ColumnRef, ResolvedElement};
use crate::error::{Result, RowshapeError};
use crate::expr::{AggregateFunction, BinaryOp};
use crate::materialize::MaterializePlan;
use crate::params::ParamPool;
use crate::settings::TempIdSequence;
use crate::schema::Cardinality;
use crate::sql::{SQL, SQLChunk, Token};
use crate::statement::{JoinKind, SortDirection, Statement, TableId};
use crate::syntax::{RowIdStrategy, SqlSyntax};
use crate::target::TargetPath;

/// Alias of a property that is the whole value of its level.
pub const SELF_ALIAS: &str = "##self";

/// A statement ready for rendering, with the plan that rebuilds its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub sql: SQL,
    pub plan: MaterializePlan,
}

#[derive(Debug, Clone)]
struct Level {
    table: TableId,
    /// Absolute target
    target: TargetPath,
    parent: Option<usize>,
}

/// Alias of the derived row set that aggregates read from when joined rows
/// must be collapsed first.
pub const DERIVED_ALIAS: &str = "##rows";

/// A row-number column marking the first row of each distinct combination
/// of `tables` within a group.
#[derive(Debug, Clone)]
struct Marker {
    alias: CompactString,
    tables: Vec<TableId>,
}

#[derive(Clone, Copy)]
pub struct Assembler<'a> {
    statement: &'a Statement,
    params: &'a ParamPool,
    syntax: &'a dyn SqlSyntax,
    temp_ids: &'a TempIdSequence,
    /// Set while rendering over the derived row set
    derived: Option<&'a [Marker]>,
}

impl<'a> Assembler<'a> {
    pub fn new(
        statement: &'a Statement,
        params: &'a ParamPool,
        syntax: &'a dyn SqlSyntax,
        temp_ids: &'a TempIdSequence,
    ) -> Self {
        Self {
            statement,
            params,
            syntax,
            temp_ids,
            derived: None,
        }
    }

    pub fn assemble(
        &self,
        properties: &[MappedProperty<ResolvedElement>],
        tables: &[MappedTable],
    ) -> Result<Assembled> {
        self.check_aggregation(properties, tables)?;

        let primary = self.statement.primary();
        let mut plan =
            MaterializePlan::new(self.syntax.row_id_alias(&primary.alias), primary.schema.name.clone());
        let mut row_id_tables = vec![primary.id];
        let levels = self.levels(tables, &mut plan, &mut row_id_tables);

        let mut aliases: HashSet<CompactString> = HashSet::new();
        let mut outputs = Vec::with_capacity(properties.len());
        let mut needed = Needed::new(self.statement);
        for level in &levels {
            needed.mark(level.table);
        }

        for property in properties {
            let level = deepest_level(&levels, &property.target);
            let relative = property
                .target
                .strip_prefix(&levels[level].target)
                .ok_or_else(|| RowshapeError::invariant("property lies outside its level"))?;

            for table in self.witness_tables(&levels, level, &property.accumulator) {
                let witness = self.row_id(table, &mut plan, &mut row_id_tables);
                plan.add_witness(level, witness, self.statement.table(table).schema.name.clone());
                needed.mark(table);
            }

            let alias = unique_alias(&mut aliases, &property.target);
            needed.mark_accumulator(&property.accumulator);
            plan.add_column(alias.clone(), level, relative, property.ty);
            outputs.push((&property.accumulator, alias));
        }

        if let Some(filter) = &self.statement.filter {
            needed.mark_accumulator(filter);
        }
        for (key, _) in &self.statement.order {
            needed.mark_accumulator(key);
        }
        needed.close();

        let grouped = properties
            .iter()
            .any(|p| p.accumulator.aggregation_type() != AggregationType::NotAggregated);
        let keys = if grouped {
            self.group_keys(properties, &row_id_tables)
        } else {
            Vec::new()
        };
        let markers = self.markers(properties, &needed, &row_id_tables)?;

        let view = Assembler {
            derived: (!markers.is_empty()).then_some(&markers[..]),
            ..*self
        };
        let source = if markers.is_empty() {
            self.sources(&needed)?
        } else {
            self.derived_rows(properties, &keys, &row_id_tables, &markers, &needed)?
                .parens()
                .alias(DERIVED_ALIAS)
        };
        let mut sql = view
            .projection(&outputs, &plan, &row_id_tables)?
            .push(Token::FROM)
            .append(source);

        if grouped {
            sql = sql
                .push(Token::GROUP)
                .push(Token::BY)
                .append(SQL::join(keys.iter().map(|c| view.column(c)), Token::COMMA));
        }

        let mut order = Vec::with_capacity(self.statement.order.len() + levels.len());
        for (key, direction) in &self.statement.order {
            let direction = match direction {
                SortDirection::Asc => Token::ASC,
                SortDirection::Desc => Token::DESC,
            };
            order.push(view.render(key)?.push(direction));
        }
        for level in &plan.levels {
            order.push(view.column(&self.row_id_column(row_id_tables[level.row_id])));
        }
        sql = sql
            .push(Token::ORDER)
            .push(Token::BY)
            .append(SQL::join(order, Token::COMMA));

        if let Some(paging) = self.syntax.paging(self.statement.skip, self.statement.take) {
            sql = sql.append(paging);
        }

        Ok(Assembled { sql, plan })
    }

    /// `SELECT` with every output column followed by the selected row ids.
    fn projection(
        &self,
        outputs: &[(&Accumulator<ResolvedElement>, CompactString)],
        plan: &MaterializePlan,
        row_id_tables: &[TableId],
    ) -> Result<SQL> {
        let mut select = Vec::with_capacity(outputs.len() + row_id_tables.len());
        for (accumulator, alias) in outputs {
            select.push(self.render(accumulator)?.alias(alias.clone()));
        }
        for (alias, &table) in plan.row_ids.iter().zip(row_id_tables) {
            select.push(self.column(&self.row_id_column(table)).alias(alias.clone()));
        }
        Ok(SQL::token(Token::SELECT).append(SQL::join(select, Token::COMMA)))
    }

    /// The primary table, the kept joins and the filter.
    fn sources(&self, needed: &Needed<'_>) -> Result<SQL> {
        let primary = self.statement.primary();
        let mut sql = self
            .syntax
            .table_source(&primary.schema.name, &primary.alias, self.temp_ids);
        for table in self.statement.tables.iter().skip(1) {
            if !needed.contains(table.id) {
                continue;
            }
            let on = table.on.as_ref().ok_or_else(|| {
                RowshapeError::invariant(format!("join `{}` has no condition", table.path))
            })?;
            let kind = match table.join {
                Some(JoinKind::Inner) => Token::INNER,
                _ => Token::LEFT,
            };
            sql = sql
                .push(kind)
                .push(Token::JOIN)
                .append(self.syntax.table_source(&table.schema.name, &table.alias, self.temp_ids))
                .push(Token::ON)
                .append(self.render(on)?);
        }
        if let Some(filter) = &self.statement.filter {
            sql = sql.push(Token::WHERE).append(self.render(filter)?);
        }
        Ok(sql)
    }

    /// Aggregates that would see rows repeated by a joined table they do not
    /// read. Each distinct set of tables read beneath such an aggregate gets
    /// one row-number marker.
    fn markers(
        &self,
        properties: &[MappedProperty<ResolvedElement>],
        needed: &Needed<'_>,
        row_id_tables: &[TableId],
    ) -> Result<Vec<Marker>> {
        let mut markers: Vec<Marker> = Vec::new();
        for property in properties {
            property.accumulator.visit_aggregates(&mut |function, operand| {
                if !counts_duplicates(function) || is_row_id(operand) {
                    return;
                }
                let tables = read_tables(operand);
                if tables.is_empty() {
                    return;
                }
                let multiplied = self.statement.tables.iter().any(|t| {
                    !t.is_primary()
                        && t.cardinality == Cardinality::Many
                        && needed.contains(t.id)
                        && !tables.contains(&t.id)
                        && !row_id_tables.contains(&t.id)
                });
                if multiplied && !markers.iter().any(|m| m.tables == tables) {
                    markers.push(Marker {
                        alias: format_compact!("##d{}", markers.len()),
                        tables,
                    });
                }
            });
        }
        if let Some(&first) = markers.first().and_then(|m| m.tables.first())
            && let RowIdStrategy::Emulated(_) = self.syntax.row_id_strategy()
        {
            let table = self.statement.table(first);
            return Err(RowshapeError::unsupported(
                &table.path,
                "aggregating this table next to another collection needs window functions",
            ));
        }
        Ok(markers)
    }

    /// The joined rows with every column the outer query reads, plus one
    /// `ROW_NUMBER()` per marker that is 1 on the first row of each distinct
    /// combination of the marker's tables within a group.
    fn derived_rows(
        &self,
        properties: &[MappedProperty<ResolvedElement>],
        keys: &[ColumnRef],
        row_id_tables: &[TableId],
        markers: &[Marker],
        needed: &Needed<'_>,
    ) -> Result<SQL> {
        let mut columns: Vec<ColumnRef> = Vec::new();
        let mut add = |column: &ColumnRef| {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        };
        for property in properties {
            let elements = property.accumulator.elements();
            for column in elements.into_iter().filter_map(ResolvedElement::column) {
                add(column);
            }
        }
        for (key, _) in &self.statement.order {
            for column in key.elements().into_iter().filter_map(ResolvedElement::column) {
                add(column);
            }
        }
        for key in keys {
            add(key);
        }
        for &table in row_id_tables {
            add(&self.row_id_column(table));
        }

        let mut select: Vec<SQL> = columns
            .iter()
            .map(|c| self.column(c).alias(derived_name(c)))
            .collect();
        for marker in markers {
            let mut partition: Vec<ColumnRef> = keys.to_vec();
            for &table in &marker.tables {
                let row_id = self.row_id_column(table);
                if !partition.contains(&row_id) {
                    partition.push(row_id);
                }
            }
            let over = SQL::raw("PARTITION BY")
                .append(SQL::join(partition.iter().map(|c| self.column(c)), Token::COMMA))
                .parens();
            select.push(
                SQL::func("ROW_NUMBER", SQL::empty())
                    .push(Token::OVER)
                    .append(over)
                    .alias(marker.alias.clone()),
            );
        }

        Ok(SQL::token(Token::SELECT)
            .append(SQL::join(select, Token::COMMA))
            .push(Token::FROM)
            .append(self.sources(needed)?))
    }

    fn row_id_column(&self, table: TableId) -> ColumnRef {
        ColumnRef::row_id(table, self.statement.table(table).alias.clone())
    }

    /// A column as read by the current query level.
    fn column(&self, column: &ColumnRef) -> SQL {
        match self.derived {
            None => SQL::qualified(column.table_alias.clone(), column.column.clone()),
            Some(_) => SQL::qualified(DERIVED_ALIAS, derived_name(column)),
        }
    }

    /// A table is either folded into an aggregate or read row by row within
    /// one output, never both.
    fn check_aggregation(
        &self,
        properties: &[MappedProperty<ResolvedElement>],
        tables: &[MappedTable],
    ) -> Result<()> {
        let mut aggregated: HashSet<TableId> = HashSet::new();
        let mut row_level: HashSet<TableId> = HashSet::new();
        for table in tables {
            if table.aggregated {
                aggregated.insert(table.table);
            } else {
                row_level.insert(table.table);
            }
        }
        for property in properties {
            property.accumulator.visit(&mut |element, in_aggregate| {
                let ResolvedElement::Column { column, .. } = element else {
                    return;
                };
                if in_aggregate {
                    if element.column_is_aggregated_to_different_table() {
                        aggregated.insert(column.table);
                    }
                } else {
                    row_level.insert(column.table);
                }
            });
        }
        match aggregated.intersection(&row_level).min() {
            Some(&table) => {
                let table = self.statement.table(table);
                Err(RowshapeError::unsupported(
                    &table.path,
                    format!(
                        "`{}` is used both inside an aggregate and row by row in the same mapping",
                        table.schema.name
                    ),
                ))
            }
            None => Ok(()),
        }
    }

    /// Materialization levels: the primary table, then every mapped table
    /// that is not folded into an aggregate, shallowest first.
    fn levels(
        &self,
        tables: &[MappedTable],
        plan: &mut MaterializePlan,
        row_id_tables: &mut Vec<TableId>,
    ) -> Vec<Level> {
        let mut levels = vec![Level {
            table: self.statement.primary().id,
            target: TargetPath::root(),
            parent: None,
        }];
        let mut mapped: Vec<&MappedTable> = tables.iter().filter(|t| !t.aggregated).collect();
        mapped.sort_by_key(|t| t.target.len());

        for table in mapped {
            let parent = deepest_level(&levels, &table.target);
            let exists = levels
                .iter()
                .any(|l| l.table == table.table && l.target == table.target);
            if exists || levels[parent].table == table.table {
                continue;
            }
            let Some(relative) = table.target.strip_prefix(&levels[parent].target) else {
                continue;
            };
            let row_id = self.row_id(table.table, plan, row_id_tables);
            let schema = &self.statement.table(table.table).schema;
            let index = plan.add_level(
                parent,
                row_id,
                table.single,
                relative,
                table.target.to_string(),
                schema.name.clone(),
            );
            debug_assert_eq!(index, levels.len());
            levels.push(Level {
                table: table.table,
                target: table.target.clone(),
                parent: Some(parent),
            });
        }
        levels
    }

    fn row_id(
        &self,
        table: TableId,
        plan: &mut MaterializePlan,
        row_id_tables: &mut Vec<TableId>,
    ) -> usize {
        let alias = self.syntax.row_id_alias(&self.statement.table(table).alias);
        let index = plan.add_row_id(alias);
        if index == row_id_tables.len() {
            row_id_tables.push(table);
        }
        index
    }

    /// Tables read row by row by this accumulator that are neither the
    /// level's table nor one of its ancestors'.
    fn witness_tables(
        &self,
        levels: &[Level],
        level: usize,
        accumulator: &Accumulator<ResolvedElement>,
    ) -> Vec<TableId> {
        let mut lineage = Vec::new();
        let mut current = Some(level);
        while let Some(index) = current {
            lineage.push(levels[index].table);
            current = levels[index].parent;
        }
        let mut witnesses = Vec::new();
        accumulator.visit(&mut |element, in_aggregate| {
            if in_aggregate {
                return;
            }
            if let ResolvedElement::Column { row_id, .. } = element
                && !lineage.contains(&row_id.table)
                && !witnesses.contains(&row_id.table)
            {
                witnesses.push(row_id.table);
            }
        });
        witnesses
    }

    /// Every row-level column reference plus every selected row id.
    fn group_keys(
        &self,
        properties: &[MappedProperty<ResolvedElement>],
        row_id_tables: &[TableId],
    ) -> Vec<ColumnRef> {
        let mut seen: Vec<ColumnRef> = Vec::new();
        let mut collect = |accumulator: &Accumulator<ResolvedElement>| {
            accumulator.visit(&mut |element, in_aggregate| {
                if let (false, Some(column)) = (in_aggregate, element.column())
                    && !seen.contains(column)
                {
                    seen.push(column.clone());
                }
            });
        };
        for property in properties {
            collect(&property.accumulator);
        }
        for (key, _) in &self.statement.order {
            collect(key);
        }
        for &table in row_id_tables {
            let column = self.row_id_column(table);
            if !seen.contains(&column) {
                seen.push(column);
            }
        }
        seen
    }

    // ==================== rendering ====================

    pub fn render(&self, accumulator: &Accumulator<ResolvedElement>) -> Result<SQL> {
        Ok(match accumulator {
            Accumulator::Leaf(ResolvedElement::Parameter(id)) => SQL::param(*id),
            Accumulator::Leaf(ResolvedElement::Column {
                column, function, ..
            }) => {
                let sql = self.column(column);
                match function {
                    Some(function) => self.syntax.function(*function, sql),
                    None => sql,
                }
            }
            Accumulator::Binary {
                op: BinaryOp::In,
                left,
                right,
            } => {
                let subject = self.operand(left)?;
                match right.as_ref() {
                    Accumulator::Leaf(ResolvedElement::Parameter(id))
                        if self.params.is_expanded(*id) =>
                    {
                        SQL::in_list(subject, *id)
                    }
                    list => subject.push(Token::IN).append(self.render(list)?.parens()),
                }
            }
            Accumulator::Binary {
                op: BinaryOp::Comma,
                left,
                right,
            } => self
                .render(left)?
                .push(Token::COMMA)
                .append(self.render(right)?),
            Accumulator::Binary { op, left, right } => self
                .operand(left)?
                .push(self.syntax.binary_operator(*op))
                .append(self.operand(right)?),
            Accumulator::Unary {
                op: UnaryOperator::Aggregate(AggregateFunction::Count),
                operand,
            } if is_row_id(operand) => {
                self.syntax
                    .aggregate(AggregateFunction::Count, self.render(operand)?, true)
            }
            Accumulator::Unary {
                op: UnaryOperator::Aggregate(function),
                operand,
            } if self.derived.is_some() && counts_duplicates(*function) => {
                let value = self.render(operand)?;
                let value = match self.marker(operand) {
                    Some(marker) => SQL::token(Token::CASE)
                        .push(Token::WHEN)
                        .append(SQL::qualified(DERIVED_ALIAS, marker.alias.clone()))
                        .push(SQLChunk::raw_static("="))
                        .push(SQLChunk::Number(1))
                        .push(Token::THEN)
                        .append(value)
                        .push(Token::END),
                    None => value,
                };
                self.syntax.aggregate(*function, value, false)
            }
            Accumulator::Unary {
                op: op @ (UnaryOperator::Not | UnaryOperator::Negate),
                operand,
            } => self.syntax.unary(*op, self.operand(operand)?),
            Accumulator::Unary { op, operand } => self.syntax.unary(*op, self.render(operand)?),
            Accumulator::Case {
                branches,
                otherwise,
            } => {
                let mut sql = SQL::token(Token::CASE);
                for (when, then) in branches {
                    sql = sql
                        .push(Token::WHEN)
                        .append(self.render(when)?)
                        .push(Token::THEN)
                        .append(self.render(then)?);
                }
                sql.push(Token::ELSE)
                    .append(self.render(otherwise)?)
                    .push(Token::END)
            }
            Accumulator::SimpleCase {
                subject,
                branches,
                otherwise,
            } => {
                let mut sql = SQL::token(Token::CASE).append(self.operand(subject)?);
                for (when, then) in branches {
                    sql = sql
                        .push(Token::WHEN)
                        .append(self.render(when)?)
                        .push(Token::THEN)
                        .append(self.render(then)?);
                }
                sql.push(Token::ELSE)
                    .append(self.render(otherwise)?)
                    .push(Token::END)
            }
        })
    }

    fn marker(&self, operand: &Accumulator<ResolvedElement>) -> Option<&Marker> {
        let tables = read_tables(operand);
        self.derived?.iter().find(|m| m.tables == tables)
    }

    /// Composite operands of an operator are parenthesized.
    fn operand(&self, accumulator: &Accumulator<ResolvedElement>) -> Result<SQL> {
        let sql = self.render(accumulator)?;
        Ok(match accumulator {
            Accumulator::Binary { .. }
            | Accumulator::Unary {
                op: UnaryOperator::Not | UnaryOperator::Negate,
                ..
            } => sql.parens(),
            _ => sql,
        })
    }
}

/// Aggregates whose result changes when an input row is repeated.
fn counts_duplicates(function: AggregateFunction) -> bool {
    matches!(
        function,
        AggregateFunction::Count | AggregateFunction::Sum | AggregateFunction::Avg
    )
}

/// Tables whose columns `accumulator` reads, in statement order.
fn read_tables(accumulator: &Accumulator<ResolvedElement>) -> Vec<TableId> {
    let mut tables: Vec<TableId> = accumulator
        .elements()
        .into_iter()
        .filter_map(ResolvedElement::column)
        .map(|c| c.table)
        .collect();
    tables.sort();
    tables.dedup();
    tables
}

/// Columns of the derived row set are named after their source.
fn derived_name(column: &ColumnRef) -> CompactString {
    format_compact!("{}.{}", column.table_alias, column.column)
}

fn is_row_id(accumulator: &Accumulator<ResolvedElement>) -> bool {
    matches!(
        accumulator,
        Accumulator::Leaf(ResolvedElement::Column { column, .. }) if column.is_row_id()
    )
}

/// The last-added level whose target encloses `target`. Levels are added
/// shallowest first, so that is also the deepest one.
fn deepest_level(levels: &[Level], target: &TargetPath) -> usize {
    levels
        .iter()
        .rposition(|l| target.starts_with(&l.target))
        .unwrap_or(0)
}

fn unique_alias(aliases: &mut HashSet<CompactString>, target: &TargetPath) -> CompactString {
    let base = if target.is_root() {
        CompactString::const_new(SELF_ALIAS)
    } else {
        CompactString::from(target.to_string())
    };
    let mut alias = base.clone();
    let mut n = 1;
    while !aliases.insert(alias.clone()) {
        alias = format_compact!("{base}~{n}");
        n += 1;
    }
    alias
}

/// Tables the rendered statement must keep.
struct Needed<'s> {
    statement: &'s Statement,
    tables: Vec<bool>,
}

impl<'s> Needed<'s> {
    fn new(statement: &'s Statement) -> Self {
        let tables = statement
            .tables
            .iter()
            .map(|t| t.is_primary() || t.join == Some(JoinKind::Inner))
            .collect();
        Self { statement, tables }
    }

    fn mark(&mut self, table: TableId) {
        if let Some(slot) = self.tables.get_mut(table.index()) {
            *slot = true;
        }
    }

    fn mark_accumulator(&mut self, accumulator: &Accumulator<ResolvedElement>) {
        for element in accumulator.elements() {
            if let ResolvedElement::Column { column, row_id, .. } = element {
                self.mark(column.table);
                self.mark(row_id.table);
            }
        }
    }

    fn contains(&self, table: TableId) -> bool {
        self.tables.get(table.index()).copied().unwrap_or(false)
    }

    /// Adds the tables join conditions of kept tables depend on, until
    /// nothing changes.
    fn close(&mut self) {
        let statement = self.statement;
        loop {
            let before = self.tables.iter().filter(|&&t| t).count();
            for table in &statement.tables {
                if !self.contains(table.id) {
                    continue;
                }
                if let Some(on) = &table.on {
                    self.mark_accumulator(on);
                }
            }
            let after = self.tables.iter().filter(|&&t| t).count();
            if after == before {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests;
