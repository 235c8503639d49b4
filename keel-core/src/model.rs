use crate::{
    ErrorKind, FieldKind, FieldType, ForeignKey, ModelSchema, Record, Result, Tag, Value,
};
use convert_case::{Case, Casing};
use std::{any::TypeId, collections::HashMap};

/// Embedding deeper than this is treated as a cycle.
const MAX_EMBEDDING_DEPTH: usize = 16;

/// A column of a model, possibly reached through embedded structs.
#[derive(Debug, Clone)]
pub struct Field {
    /// Rust field name.
    pub name: &'static str,
    pub column: String,
    pub ty: FieldType,
    pub nullable: bool,
    /// Index path from the model root.
    pub path: Box<[usize]>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub auto_time: bool,
    pub auto_update: bool,
    pub unique: bool,
    pub not_null: bool,
    pub size: Option<u32>,
    pub default: Option<String>,
    pub references: Option<ForeignKey>,
    pub tag: &'static str,
}

impl Field {
    pub fn get(&self, record: &dyn Record) -> Result<Value> {
        record.get_value(&self.path)
    }
    pub fn set(&self, record: &mut dyn Record, value: Value) -> Result<()> {
        record.set_value(&self.path, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationShape {
    Collection,
    Reference,
}

/// A struct field holding other models, candidate for a relation.
#[derive(Debug, Clone)]
pub struct AssociationField {
    pub name: &'static str,
    pub tag: Tag,
    pub shape: AssociationShape,
    pub target: fn() -> &'static ModelSchema,
}

/// Parsed, immutable metadata of a model type.
#[derive(Debug)]
pub struct ModelMeta {
    pub type_name: &'static str,
    pub table: String,
    pub fields: Vec<Field>,
    pub associations: Vec<AssociationField>,
    pub schema: &'static ModelSchema,
    primary_key: Option<usize>,
    columns: HashMap<String, usize>,
}

impl ModelMeta {
    pub fn parse(schema: &'static ModelSchema) -> Result<ModelMeta> {
        let table = match schema.table_name {
            Some(v) => v.to_string(),
            None => schema.type_name.to_case(Case::Snake),
        };
        let mut result = ModelMeta {
            type_name: schema.type_name,
            table,
            fields: Vec::new(),
            associations: Vec::new(),
            schema,
            primary_key: None,
            columns: HashMap::new(),
        };
        result.collect(schema, &mut Vec::new(), &mut vec![(schema.type_id)()])?;
        for (i, field) in result.fields.iter().enumerate() {
            if result.columns.insert(field.column.clone(), i).is_some() {
                return Err(ErrorKind::invalid_model(format!(
                    "Model `{}` maps more than one field to column `{}`",
                    schema.type_name, field.column
                )));
            }
            if field.primary_key {
                if let Some(previous) = result.primary_key {
                    return Err(ErrorKind::invalid_model(format!(
                        "Model `{}` declares two primary keys: `{}` and `{}`",
                        schema.type_name, result.fields[previous].name, field.name
                    )));
                }
                result.primary_key = Some(i);
            }
        }
        if result.primary_key.is_none() {
            if let Some(&i) = result.columns.get("id") {
                let field = &mut result.fields[i];
                field.primary_key = true;
                field.auto_increment |= field.ty.is_integer();
                result.primary_key = Some(i);
            }
        }
        log::trace!(
            "Parsed model `{}` (table `{}`, {} columns, {} associations)",
            result.type_name,
            result.table,
            result.fields.len(),
            result.associations.len()
        );
        Ok(result)
    }

    fn collect(
        &mut self,
        schema: &'static ModelSchema,
        prefix: &mut Vec<usize>,
        embedding: &mut Vec<TypeId>,
    ) -> Result<()> {
        for (i, field) in schema.fields.iter().enumerate() {
            let tag = Tag::parse(field.tag).map_err(|e| {
                e.context(format!(
                    "While parsing the tag of `{}.{}`",
                    schema.type_name, field.name
                ))
            })?;
            match field.kind {
                FieldKind::Column { ty, nullable } => {
                    if tag.has_association_hints() {
                        return Err(ErrorKind::invalid_model(format!(
                            "Field `{}.{}` is a plain column but its tag declares an association",
                            schema.type_name, field.name
                        )));
                    }
                    let mut path = prefix.clone();
                    path.push(i);
                    self.fields.push(Field {
                        name: field.name,
                        column: tag
                            .column
                            .clone()
                            .unwrap_or_else(|| field.name.trim_start_matches("r#").to_string()),
                        ty,
                        nullable: nullable && !tag.not_null && !tag.primary_key,
                        path: path.into(),
                        primary_key: tag.primary_key,
                        auto_increment: tag.auto_increment,
                        auto_time: tag.auto_time,
                        auto_update: tag.auto_update,
                        unique: tag.unique,
                        not_null: tag.not_null,
                        size: tag.size,
                        default: tag.default,
                        references: tag.foreign_key,
                        tag: field.tag,
                    });
                }
                FieldKind::Embedded(nested) => {
                    let nested = nested();
                    let type_id = (nested.type_id)();
                    if embedding.contains(&type_id) || embedding.len() >= MAX_EMBEDDING_DEPTH {
                        return Err(ErrorKind::invalid_model(format!(
                            "Field `{}.{}` embeds `{}` recursively",
                            schema.type_name, field.name, nested.type_name
                        )));
                    }
                    if tag.has_association_hints() {
                        return Err(ErrorKind::invalid_model(format!(
                            "Field `{}.{}` is embedded but its tag declares an association",
                            schema.type_name, field.name
                        )));
                    }
                    prefix.push(i);
                    embedding.push(type_id);
                    self.collect(nested, prefix, embedding)?;
                    embedding.pop();
                    prefix.pop();
                }
                FieldKind::Collection(target) | FieldKind::Reference(target) => {
                    if !prefix.is_empty() {
                        log::warn!(
                            "Association `{}.{}` is declared inside an embedded struct and will be ignored",
                            schema.type_name,
                            field.name
                        );
                        continue;
                    }
                    self.associations.push(AssociationField {
                        name: field.name,
                        tag,
                        shape: if matches!(field.kind, FieldKind::Collection(..)) {
                            AssociationShape::Collection
                        } else {
                            AssociationShape::Reference
                        },
                        target,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn primary_key(&self) -> Option<&Field> {
        self.primary_key.map(|i| &self.fields[i])
    }

    pub fn require_primary_key(&self) -> Result<&Field> {
        self.primary_key().ok_or_else(|| {
            ErrorKind::invalid_model(format!("Model `{}` has no primary key", self.type_name))
        })
    }

    pub fn column(&self, name: &str) -> Option<&Field> {
        self.columns.get(name).map(|&i| &self.fields[i])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn require_column(&self, name: &str) -> Result<&Field> {
        self.column(name).ok_or_else(|| {
            ErrorKind::invalid_model(format!(
                "Model `{}` has no column `{name}`",
                self.type_name
            ))
        })
    }

    pub fn association(&self, name: &str) -> Option<&AssociationField> {
        self.associations
            .iter()
            .find(|v| v.name == name)
            .or_else(|| self.associations.iter().find(|v| v.name.eq_ignore_ascii_case(name)))
            .or_else(|| {
                let snake = name.to_case(Case::Snake);
                self.associations.iter().find(|v| v.name == snake)
            })
    }

    /// Snake cased type name, the base of conventional key names.
    pub fn snake_name(&self) -> String {
        self.type_name.to_case(Case::Snake)
    }
}
