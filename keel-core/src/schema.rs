use crate::Record;
use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use std::any::TypeId;

/// Semantic storage type of a column, mapped to SQL types by each dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal,
    Varchar,
    Blob,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Uuid,
}

impl FieldType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldType::Int8
                | FieldType::Int16
                | FieldType::Int32
                | FieldType::Int64
                | FieldType::UInt8
                | FieldType::UInt16
                | FieldType::UInt32
                | FieldType::UInt64
        )
    }
}

impl ToTokens for FieldType {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let variant = match self {
            FieldType::Boolean => quote!(Boolean),
            FieldType::Int8 => quote!(Int8),
            FieldType::Int16 => quote!(Int16),
            FieldType::Int32 => quote!(Int32),
            FieldType::Int64 => quote!(Int64),
            FieldType::UInt8 => quote!(UInt8),
            FieldType::UInt16 => quote!(UInt16),
            FieldType::UInt32 => quote!(UInt32),
            FieldType::UInt64 => quote!(UInt64),
            FieldType::Float32 => quote!(Float32),
            FieldType::Float64 => quote!(Float64),
            FieldType::Decimal => quote!(Decimal),
            FieldType::Varchar => quote!(Varchar),
            FieldType::Blob => quote!(Blob),
            FieldType::Date => quote!(Date),
            FieldType::Time => quote!(Time),
            FieldType::Timestamp => quote!(Timestamp),
            FieldType::TimestampWithTimezone => quote!(TimestampWithTimezone),
            FieldType::Uuid => quote!(Uuid),
        };
        tokens.extend(quote!(::keel::FieldType::#variant));
    }
}

/// Compile time description of a model type, generated by `#[derive(Model)]`.
///
/// This is the raw material the registry parses into a [`crate::ModelMeta`]: it carries the
/// annotations verbatim and makes no decision about columns or keys.
#[derive(Debug)]
pub struct ModelSchema {
    pub type_name: &'static str,
    pub table_name: Option<&'static str>,
    pub fields: &'static [FieldSchema],
    pub type_id: fn() -> TypeId,
    pub instantiate: fn() -> Box<dyn Record>,
}

impl ModelSchema {
    pub fn field(&self, name: &str) -> Option<(usize, &'static FieldSchema)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }
}

#[derive(Debug)]
pub struct FieldSchema {
    pub name: &'static str,
    pub tag: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Scalar stored in one column.
    Column { ty: FieldType, nullable: bool },
    /// Nested model whose columns are flattened into the owner.
    Embedded(fn() -> &'static ModelSchema),
    /// `Vec<T>` of another model.
    Collection(fn() -> &'static ModelSchema),
    /// `Option<T>` of another model.
    Reference(fn() -> &'static ModelSchema),
}

impl FieldKind {
    pub fn is_association(&self) -> bool {
        matches!(self, FieldKind::Collection(..) | FieldKind::Reference(..))
    }
}
