//! Single-table statements: INSERT, UPDATE, DELETE, SHOW, DESCRIBE

use super::{Engine, SingleRow};
use crate::condition::{Condition, EvalContext, Operand};
use crate::context::TableContext;
use crate::error::{QueryError, Result};
use crate::result::OrderedFetchResult;
use crate::statement::{Delete, Insert, Placeholders, Update, TARGET};
use crate::storage::Store;
use crate::table::{TableId, TableSet};
use crate::value::Literal;
use tracing::debug;

impl<S: Store> Engine<S> {
    /// Rows of `table` for which `condition` is TRUE
    ///
    /// The whole table is fetched for update; the condition is evaluated
    /// against each row on its own.
    pub fn target(
        &self,
        tables: &TableSet<S::Value>,
        table: TableId,
        condition: Option<&Condition<S::Value>>,
        placeholders: &Placeholders<S::Value>,
    ) -> Result<Vec<S::Row>> {
        let comparator = self.store.comparator();
        let eval = EvalContext::new(&*comparator, placeholders);
        let target = tables.get(table);
        let metadata = self.store.metadata(target.name()?);
        let context = TableContext::new(target, metadata.as_ref(), tables.len(), &eval)?;
        let rows = self.store.fetch_context(&context, true)?;

        let Some(condition) = condition else {
            return Ok(rows);
        };
        let mut matched = Vec::new();
        for row in rows {
            let keep = {
                let source = SingleRow {
                    table,
                    row: &row,
                    store: &self.store,
                };
                condition.matches(&eval, &source)?.is_true()
            };
            if keep {
                matched.push(row);
            }
        }
        debug!(table = context.table_name(), rows = matched.len(), "target rows");
        Ok(matched)
    }

    fn operand_value(
        operand: &Operand<S::Value>,
        placeholders: &Placeholders<S::Value>,
    ) -> Result<Option<S::Value>> {
        match operand {
            Operand::Literal(value) => Ok(Some(value.clone())),
            Operand::Placeholder(name) => placeholders.value(name),
            Operand::Null => Ok(None),
            Operand::Column(column) => Err(QueryError::Unsupported(format!(
                "column reference {} as a value",
                column
            ))),
        }
    }

    pub fn insert(
        &mut self,
        insert: &Insert<S::Value>,
        placeholders: &Placeholders<S::Value>,
    ) -> Result<usize> {
        let table = insert.tables.get(TARGET).name()?.to_string();
        for row in &insert.rows {
            let values = row
                .iter()
                .map(|op| Self::operand_value(op, placeholders))
                .collect::<Result<Vec<_>>>()?;
            self.store.insert(&table, &insert.columns, values)?;
        }
        debug!(table = %table, rows = insert.rows.len(), "inserted");
        Ok(insert.rows.len())
    }

    pub fn update(
        &mut self,
        update: &Update<S::Value>,
        placeholders: &Placeholders<S::Value>,
    ) -> Result<usize> {
        let rows = self.target(&update.tables, TARGET, update.condition.as_ref(), placeholders)?;
        if rows.is_empty() {
            return Ok(0);
        }
        let values = update
            .assignments
            .iter()
            .map(|a| Self::operand_value(&a.value, placeholders))
            .collect::<Result<Vec<_>>>()?;

        let mut changes = Vec::with_capacity(rows.len() * values.len());
        for row in &rows {
            for (assignment, value) in update.assignments.iter().zip(&values) {
                let current = self.store.get(row, &assignment.column)?;
                let mut change = self.store.updateable(row, &assignment.column, current)?;
                change.set(value.clone());
                changes.push(change);
            }
        }
        let affected = self.store.update(changes)?;
        debug!(rows = affected, "updated");
        Ok(affected)
    }

    pub fn delete(
        &mut self,
        delete: &Delete<S::Value>,
        placeholders: &Placeholders<S::Value>,
    ) -> Result<usize> {
        let rows = self.target(&delete.tables, TARGET, delete.condition.as_ref(), placeholders)?;
        if rows.is_empty() {
            return Ok(0);
        }
        let table = delete.tables.get(TARGET).name()?.to_string();
        let deleted = self.store.delete(&table, &rows)?;
        debug!(table = %table, rows = deleted, "deleted");
        Ok(deleted)
    }

    /// One `name` row per catalog table
    pub fn show(&self) -> Result<OrderedFetchResult<S::Value>> {
        let mut result =
            OrderedFetchResult::new(vec!["name".into()], 0, Vec::new(), self.store.comparator());
        for name in self.store.table_names() {
            result.push(vec![Some(self.store.text(&name)?)]);
        }
        Ok(result)
    }

    /// One row per column of the target table
    pub fn describe(&self, tables: &TableSet<S::Value>) -> Result<OrderedFetchResult<S::Value>> {
        let name = tables.get(TARGET).name()?;
        let metadata = self
            .store
            .metadata(name)
            .ok_or_else(|| QueryError::Storage(format!("table not found: {}", name)))?;

        let columns = ["column", "type", "unique", "distinct_estimate"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let mut result = OrderedFetchResult::new(columns, 0, Vec::new(), self.store.comparator());
        for column in &metadata.columns {
            let distinct = column
                .distinct_estimate
                .map(|n| self.store.convert(&Literal::Number(n.to_string())))
                .transpose()?;
            result.push(vec![
                Some(self.store.text(&column.name)?),
                Some(self.store.text(column.data_type.name())?),
                Some(self.store.convert(&Literal::Boolean(column.unique))?),
                distinct,
            ]);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ColumnCondition, Relation};
    use crate::statement::Assignment;
    use crate::storage::{ColumnDef, MemoryStore};
    use crate::table::ColumnRef;
    use crate::value::{ColumnType, Value};

    fn engine() -> Engine<MemoryStore> {
        let mut store = MemoryStore::new();
        store
            .create_table(
                "t",
                vec![
                    ColumnDef::new("x", ColumnType::Integer),
                    ColumnDef::new("y", ColumnType::Text),
                ],
            )
            .unwrap();
        for x in [Some(1), None, Some(2)] {
            store
                .insert_values("t", vec![x.map(Value::from), Some("a".into())])
                .unwrap();
        }
        Engine::new(store)
    }

    fn target_table(condition: Option<&Condition<Value>>) -> TableSet<Value> {
        let mut tables = TableSet::new();
        let t = tables.add("t", None);
        tables.get_mut(t).resolve("t");
        if let Some(c) = condition {
            c.associate(&mut tables, true);
        }
        tables
    }

    fn x_is_null() -> Condition<Value> {
        Condition::Column(ColumnCondition::Null {
            column: ColumnRef::new(TARGET, None, "x"),
        })
    }

    #[test]
    fn test_delete_where_null() {
        let mut engine = engine();
        let condition = x_is_null();
        let delete = Delete {
            tables: target_table(Some(&condition)),
            condition: Some(condition),
        };
        assert_eq!(engine.delete(&delete, &Placeholders::new()).unwrap(), 1);
        let rows = engine.store().rows("t").unwrap();
        let xs: Vec<Option<Value>> = rows.into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(xs, vec![Some(Value::from(1)), Some(Value::from(2))]);
    }

    #[test]
    fn test_update_with_placeholder() {
        let mut engine = engine();
        let condition = Condition::Column(ColumnCondition::Comparison {
            left: ColumnRef::new(TARGET, None, "x"),
            relation: Relation::Ge,
            right: Operand::Literal(Value::from(2)),
        });
        let update = Update {
            tables: target_table(Some(&condition)),
            assignments: vec![Assignment {
                column: "y".into(),
                value: Operand::Placeholder("1".into()),
            }],
            condition: Some(condition),
        };
        let mut placeholders = Placeholders::new();
        placeholders.declare("1", Some(ColumnType::Text), None);
        placeholders.bind("1", Value::from("z")).unwrap();
        assert_eq!(engine.update(&update, &placeholders).unwrap(), 1);
        let ys: Vec<Option<Value>> = engine
            .store()
            .rows("t")
            .unwrap()
            .into_iter()
            .map(|r| r[1].clone())
            .collect();
        assert_eq!(
            ys,
            vec![Some("a".into()), Some("a".into()), Some("z".into())]
        );
    }

    #[test]
    fn test_insert_null_and_literal() {
        let mut engine = engine();
        let insert = Insert {
            tables: target_table(None),
            columns: vec!["x".into(), "y".into()],
            rows: vec![
                vec![Operand::Literal(Value::from(9)), Operand::Null],
                vec![Operand::Null, Operand::Literal(Value::from("q"))],
            ],
        };
        assert_eq!(engine.insert(&insert, &Placeholders::new()).unwrap(), 2);
        assert_eq!(engine.store().row_count("t").unwrap(), 5);
    }

    #[test]
    fn test_describe_and_show() {
        let engine = engine();
        let describe = engine.describe(&target_table(None)).unwrap();
        assert_eq!(
            describe.columns(),
            &["column", "type", "unique", "distinct_estimate"].map(String::from)
        );
        assert_eq!(describe.len(), 2);
        let first = describe.row(0).unwrap();
        assert_eq!(first[1], Some(Value::from("INTEGER")));
        assert_eq!(first[3], Some(Value::from(2)));

        let show = engine.show().unwrap();
        assert_eq!(show.column("name").unwrap(), vec![Some(&Value::from("t"))]);
    }
}
