use crate::{ErrorKind, Model, ModelMeta, ModelSchema, Record, Result, unpoison};
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

/// Cache of parsed model metadata.
///
/// Every model type is parsed once, the first time it is requested, and the same `Arc` is handed
/// out from then on. Registering a new type bumps [`Registry::generation`], which invalidates the
/// relation catalog entries computed before it existed.
#[derive(Debug, Default)]
pub struct Registry {
    models: RwLock<HashMap<TypeId, Arc<ModelMeta>>>,
    tables: RwLock<HashMap<String, Arc<ModelMeta>>>,
    generation: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn model<T: Model>(&self) -> Result<Arc<ModelMeta>> {
        self.model_for(T::describe())
    }

    pub fn model_of(&self, record: &dyn Record) -> Result<Arc<ModelMeta>> {
        self.model_for(record.schema())
    }

    pub fn model_for(&self, schema: &'static ModelSchema) -> Result<Arc<ModelMeta>> {
        let type_id = (schema.type_id)();
        if let Some(model) = unpoison(self.models.read()).get(&type_id) {
            return Ok(model.clone());
        }
        // Parsed without holding the lock, concurrent first requests race on the insert below
        let parsed = Arc::new(ModelMeta::parse(schema)?);
        let (model, inserted) = {
            let mut models = unpoison(self.models.write());
            match models.get(&type_id) {
                Some(existing) => (existing.clone(), false),
                None => {
                    models.insert(type_id, parsed.clone());
                    (parsed, true)
                }
            }
        };
        if inserted {
            unpoison(self.tables.write()).insert(model.table.clone(), model.clone());
            let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            log::trace!(
                "Registered model `{}` as table `{}` (generation {generation})",
                model.type_name,
                model.table
            );
        }
        Ok(model)
    }

    pub fn model_by_table(&self, table: &str) -> Result<Arc<ModelMeta>> {
        unpoison(self.tables.read())
            .get(table)
            .cloned()
            .ok_or_else(|| ErrorKind::ModelNotFound(table.to_string()).into())
    }

    /// Number of models registered so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        unpoison(self.models.read()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
