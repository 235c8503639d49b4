use crate::{Error, ModelSchema, Result, Value};
use std::any::{self, Any};

/// Object safe access to a model instance, generated by `#[derive(Model)]`.
///
/// Fields are addressed by index path: `[2]` is the third declared field, `[2, 0]` the first field
/// of the model embedded at position two. Associations are addressed by field name.
pub trait Record: Any + Send + Sync {
    fn schema(&self) -> &'static ModelSchema;
    fn get_value(&self, path: &[usize]) -> Result<Value>;
    fn set_value(&mut self, path: &[usize], value: Value) -> Result<()>;
    /// Replaces the association field `name` with the records loaded for it.
    fn assign_association(&mut self, name: &str, related: Vec<Box<dyn Record>>) -> Result<()>;
    fn clone_record(&self) -> Box<dyn Record>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    /// Lifecycle hooks, when the model opted into them with `#[keel(hooks)]`.
    fn hooks(&mut self) -> Option<&mut dyn Hooks> {
        None
    }
}

/// A statically known model type.
pub trait Model: Record + Clone + Default {
    fn describe() -> &'static ModelSchema;
}

/// Lifecycle callbacks.
///
/// A `before_*` error aborts the operation before any statement is sent. An `after_*` error is
/// returned to the caller but the write already took effect.
pub trait Hooks {
    fn before_insert(&mut self) -> Result<()> {
        Ok(())
    }
    fn after_insert(&mut self) -> Result<()> {
        Ok(())
    }
    fn before_update(&mut self) -> Result<()> {
        Ok(())
    }
    fn after_update(&mut self) -> Result<()> {
        Ok(())
    }
    fn before_delete(&mut self) -> Result<()> {
        Ok(())
    }
    fn after_delete(&mut self) -> Result<()> {
        Ok(())
    }
    fn after_find(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn downcast_record<T: Model>(record: Box<dyn Record>) -> Result<T> {
    let found = record.schema().type_name;
    record
        .into_any()
        .downcast::<T>()
        .map(|v| *v)
        .map_err(|_| {
            Error::msg(format!(
                "Expected a record of type `{}`, found `{found}`",
                any::type_name::<T>()
            ))
        })
}

pub fn assign_many<T: Model>(slot: &mut Vec<T>, related: Vec<Box<dyn Record>>) -> Result<()> {
    *slot = related
        .into_iter()
        .map(downcast_record::<T>)
        .collect::<Result<_>>()?;
    Ok(())
}

pub fn assign_one<T: Model>(slot: &mut Option<T>, related: Vec<Box<dyn Record>>) -> Result<()> {
    *slot = related
        .into_iter()
        .next()
        .map(downcast_record::<T>)
        .transpose()?;
    Ok(())
}

pub fn assign_one_boxed<T: Model>(
    slot: &mut Option<Box<T>>,
    related: Vec<Box<dyn Record>>,
) -> Result<()> {
    *slot = related
        .into_iter()
        .next()
        .map(|v| downcast_record::<T>(v).map(Box::new))
        .transpose()?;
    Ok(())
}
