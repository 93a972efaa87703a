//! SELECT: placement, merge-joins and candidate enumeration

use super::{Candidate, Engine, JoinPlan};
use crate::condition::{ColumnCondition, Condition, EvalContext, Relation, RowSource};
use crate::context::{pair_mut, TableContext};
use crate::error::{QueryError, Result};
use crate::result::{OrderedFetchResult, SortKey};
use crate::statement::{Diagnostic, Diagnostics, Placeholders, Reporter, Select};
use crate::storage::Store;
use crate::table::{TableId, TableSet};
use tracing::debug;

/// Contexts of all tables of a query after fetching and joining
struct Placement<R, C> {
    contexts: Vec<TableContext<R, C>>,
    plan: JoinPlan,
}

impl<R: Clone + Eq + std::hash::Hash, C: Clone + std::fmt::Display> Placement<R, C> {
    /// Rows to try at `level` given the rows bound at the outer levels
    ///
    /// Uses the join map of the nearest outer level that has a precise one;
    /// otherwise every row of the level's table.
    fn candidates(&self, level: usize, tuple: &[Option<R>]) -> &[R] {
        let table = self.plan.nesting[level];
        for outer in self.plan.nesting[..level].iter().rev() {
            let Some(map) = self.contexts[outer.index()].join(table) else {
                continue;
            };
            let Some(row) = tuple[outer.index()].as_ref() else {
                continue;
            };
            if let Some(candidates) = map.candidates(row) {
                return candidates;
            }
        }
        self.contexts[table.index()].rows()
    }
}

impl<S: Store> Engine<S> {
    /// Run a SELECT and materialize its projection
    pub fn select(
        &self,
        select: &Select<S::Value>,
        placeholders: &Placeholders<S::Value>,
    ) -> Result<OrderedFetchResult<S::Value>> {
        let tables = &select.tables;
        if tables.is_empty() {
            return Err(QueryError::Execution("SELECT without tables".into()));
        }
        if !self.config.allow_cartesian {
            let unjoined = select.unjoined_tables();
            if !unjoined.is_empty() {
                let mut diagnostics = Diagnostics::new();
                for table in unjoined {
                    diagnostics.report(Diagnostic::fatal(format!(
                        "table {} is not joined to the other tables",
                        tables.get(table).label()
                    )));
                }
                return Err(QueryError::Check(diagnostics));
            }
        }

        let comparator = self.store.comparator();
        let eval = EvalContext::new(&*comparator, placeholders);

        let columns = select.fetched_columns();
        let keys = select
            .order_by
            .iter()
            .map(|item| {
                columns
                    .iter()
                    .position(|c| *c == item.column)
                    .map(|column| SortKey {
                        column,
                        descending: item.descending,
                    })
                    .ok_or_else(|| {
                        QueryError::Execution(format!("ORDER BY column {} not fetched", item.column))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let hidden = columns.len() - select.projection.len();
        let mut result =
            OrderedFetchResult::new(select.labels.clone(), hidden, keys, comparator.clone());

        let Some(placement) = self.place(tables, &eval)? else {
            debug!("a table has no candidate rows, skipping enumeration");
            return Ok(result);
        };

        let emitted = self.enumerate(&placement, tables, select.condition.as_ref(), &eval, |source| {
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                row.push(source.value(column)?);
            }
            result.push(row);
            Ok(())
        })?;
        debug!(rows = emitted, "select finished");
        Ok(result)
    }

    /// Fetch, index and join every table in plan order
    ///
    /// Returns `None` as soon as a table has no rows left, since the
    /// enumeration would then be empty.
    fn place(
        &self,
        tables: &TableSet<S::Value>,
        eval: &EvalContext<'_, S::Value>,
    ) -> Result<Option<Placement<S::Row, S::Value>>> {
        let cmp = eval.comparator;

        let mut contexts = Vec::with_capacity(tables.len());
        for table in tables.iter() {
            let metadata = self.store.metadata(table.name()?);
            contexts.push(TableContext::new(table, metadata.as_ref(), tables.len(), eval)?);
        }

        let plan = self.plan(tables);
        debug!(order = %plan, "join order");

        let mut placed = vec![false; tables.len()];
        for &id in &plan.selection_order {
            let rows = self.store.fetch_context(&contexts[id.index()], false)?;
            debug!(table = contexts[id.index()].table_name(), rows = rows.len(), "fetched");
            if rows.is_empty() {
                return Ok(None);
            }
            contexts[id.index()].set_data(rows, &self.store, cmp)?;

            let table = tables.get(id);
            for leaf in table.and_path_conditions() {
                let Some(edge) = leaf.join_edge(id) else {
                    continue;
                };
                let remote = edge.remote.table;
                if edge.relation != Relation::Eq || !placed[remote.index()] {
                    continue;
                }
                let (this, other) = pair_mut(&mut contexts, id.index(), remote.index())?;
                this.join_with(other, &edge.local.column, &edge.remote.column, cmp)?;
                if this.live_count() == 0 || other.live_count() == 0 {
                    return Ok(None);
                }
            }

            for other in tables.ids().filter(|t| placed[t.index()]) {
                contexts[id.index()].mark_cartesian(other);
                contexts[other.index()].mark_cartesian(id);
            }
            placed[id.index()] = true;

            if self.config.propagate_hints {
                for leaf in table.and_path_conditions() {
                    let Some(edge) = leaf.join_edge(id) else {
                        continue;
                    };
                    let remote = edge.remote.table;
                    if placed[remote.index()] {
                        continue;
                    }
                    let (this, pending) = pair_mut(&mut contexts, id.index(), remote.index())?;
                    this.update_hints(
                        pending,
                        &edge.local.column,
                        edge.relation.flip(),
                        &edge.remote.column,
                        cmp,
                    );
                }
            }
        }

        Ok(Some(Placement { contexts, plan }))
    }

    /// Depth-first walk over the candidate space, one cursor per level
    ///
    /// Calls `sink` for every full tuple satisfying `condition` and returns
    /// how many there were.
    fn enumerate<F>(
        &self,
        placement: &Placement<S::Row, S::Value>,
        tables: &TableSet<S::Value>,
        condition: Option<&Condition<S::Value>>,
        eval: &EvalContext<'_, S::Value>,
        mut sink: F,
    ) -> Result<usize>
    where
        F: FnMut(&Candidate<'_, S>) -> Result<()>,
    {
        let nesting = &placement.plan.nesting;
        let levels = nesting.len();
        let filters = self.level_filters(nesting, tables.len(), condition);

        let mut tuple: Vec<Option<S::Row>> = vec![None; tables.len()];
        let mut stack: Vec<(&[S::Row], usize)> = Vec::with_capacity(levels);
        stack.push((placement.candidates(0, &tuple), 0));
        let mut emitted = 0;

        while let Some(level) = stack.len().checked_sub(1) {
            let table = nesting[level];
            let next = {
                let (rows, cursor) = &mut stack[level];
                let row = rows.get(*cursor).cloned();
                *cursor += 1;
                row
            };
            let Some(row) = next else {
                tuple[table.index()] = None;
                stack.pop();
                continue;
            };
            if !placement.contexts[table.index()].is_live(&row) {
                continue;
            }
            tuple[table.index()] = Some(row);

            let source = Candidate {
                rows: &tuple,
                store: &self.store,
            };
            if !passes(&filters[level], eval, &source)? {
                continue;
            }
            if level + 1 == levels {
                let accepted = match condition {
                    Some(c) => c.matches(eval, &source)?.is_true(),
                    None => true,
                };
                if accepted {
                    sink(&source)?;
                    emitted += 1;
                }
            } else {
                let candidates = placement.candidates(level + 1, &tuple);
                stack.push((candidates, 0));
            }
        }
        Ok(emitted)
    }

    /// AND-path leaves grouped by the shallowest level binding all their tables
    ///
    /// Leaves that only bind at the deepest level are left to the root
    /// predicate.
    fn level_filters<'c>(
        &self,
        nesting: &[TableId],
        table_count: usize,
        condition: Option<&'c Condition<S::Value>>,
    ) -> Vec<Vec<&'c ColumnCondition<S::Value>>> {
        let mut filters = vec![Vec::new(); nesting.len()];
        let Some(condition) = condition else {
            return filters;
        };
        if !self.config.incremental_pruning {
            return filters;
        }
        let mut level_of = vec![0; table_count];
        for (level, table) in nesting.iter().enumerate() {
            level_of[table.index()] = level;
        }
        for leaf in condition.and_path_leaves() {
            let level = leaf
                .referenced_tables()
                .iter()
                .map(|t| level_of[t.index()])
                .max()
                .unwrap_or(0);
            if level + 1 < nesting.len() {
                filters[level].push(leaf);
            }
        }
        filters
    }
}

fn passes<S: Store>(
    leaves: &[&ColumnCondition<S::Value>],
    eval: &EvalContext<'_, S::Value>,
    source: &Candidate<'_, S>,
) -> Result<bool> {
    for leaf in leaves {
        if !leaf.matches(eval, source)?.is_true() {
            return Ok(false);
        }
    }
    Ok(true)
}
