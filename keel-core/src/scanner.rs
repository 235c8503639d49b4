use crate::{Context, Model, ModelMeta, Record, Result, RowLabeled, RowNames, unpoison};
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// Where each result column goes: `fields[i]` is the index in [`ModelMeta::fields`] receiving
/// the i-th column, `None` for columns the model does not map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    pub fields: Box<[Option<usize>]>,
}

impl ScanPlan {
    pub fn new(meta: &ModelMeta, labels: &[String]) -> Self {
        Self {
            fields: labels.iter().map(|v| Self::resolve(meta, v)).collect(),
        }
    }

    fn resolve(meta: &ModelMeta, label: &str) -> Option<usize> {
        meta.column_index(label)
            .or_else(|| {
                meta.fields
                    .iter()
                    .position(|v| v.column.eq_ignore_ascii_case(label))
            })
            .or_else(|| {
                let (_, column) = label.rsplit_once('.')?;
                Self::resolve(meta, column)
            })
    }

    pub fn mapped(&self) -> usize {
        self.fields.iter().flatten().count()
    }
}

/// Cache of [`ScanPlan`]s keyed by model type and column list.
#[derive(Debug, Default)]
pub struct Scanner {
    plans: RwLock<HashMap<(TypeId, RowNames), Arc<ScanPlan>>>,
}

impl Scanner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn plan(&self, meta: &ModelMeta, labels: &RowNames) -> Arc<ScanPlan> {
        let key = ((meta.schema.type_id)(), labels.clone());
        if let Some(plan) = unpoison(self.plans.read()).get(&key) {
            return plan.clone();
        }
        let plan = Arc::new(ScanPlan::new(meta, labels));
        unpoison(self.plans.write())
            .entry(key)
            .or_insert(plan)
            .clone()
    }

    pub fn len(&self) -> usize {
        unpoison(self.plans.read()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the mapped columns of `row` into `record`.
    ///
    /// A NULL reaching a field that cannot hold it leaves the field untouched.
    pub fn scan_into(
        &self,
        meta: &ModelMeta,
        plan: &ScanPlan,
        row: &RowLabeled,
        record: &mut dyn Record,
    ) -> Result<()> {
        for (i, target) in plan.fields.iter().enumerate() {
            let (Some(target), Some(value)) = (target, row.values.get(i)) else {
                continue;
            };
            let field = &meta.fields[*target];
            if value.is_null() && !field.nullable {
                continue;
            }
            field.set(record, value.clone()).with_context(|| {
                format!(
                    "While scanning column `{}` into `{}.{}`",
                    row.labels[i], meta.type_name, field.name
                )
            })?;
        }
        Ok(())
    }

    pub fn scan_all<T: Model>(&self, meta: &ModelMeta, rows: &[RowLabeled]) -> Result<Vec<T>> {
        let mut plan: Option<(RowNames, Arc<ScanPlan>)> = None;
        rows.iter()
            .map(|row| {
                let plan = self.plan_for(&mut plan, meta, row);
                let mut record = T::default();
                self.scan_into(meta, &plan, row, &mut record)?;
                Ok(record)
            })
            .collect()
    }

    /// Same as [`Scanner::scan_all`] for a model only known at runtime.
    pub fn scan_records(&self, meta: &ModelMeta, rows: &[RowLabeled]) -> Result<Vec<Box<dyn Record>>> {
        let mut plan: Option<(RowNames, Arc<ScanPlan>)> = None;
        rows.iter()
            .map(|row| {
                let plan = self.plan_for(&mut plan, meta, row);
                let mut record = (meta.schema.instantiate)();
                self.scan_into(meta, &plan, row, record.as_mut())?;
                Ok(record)
            })
            .collect()
    }

    fn plan_for(
        &self,
        last: &mut Option<(RowNames, Arc<ScanPlan>)>,
        meta: &ModelMeta,
        row: &RowLabeled,
    ) -> Arc<ScanPlan> {
        match last {
            Some((labels, plan)) if Arc::ptr_eq(labels, &row.labels) => plan.clone(),
            _ => {
                let plan = self.plan(meta, &row.labels);
                *last = Some((row.labels.clone(), plan.clone()));
                plan
            }
        }
    }
}
