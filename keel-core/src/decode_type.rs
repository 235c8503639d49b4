use crate::{FieldType, matches_path};
use std::mem;
use syn::{GenericArgument, Path, PathArguments, Type, TypePath};

/// Shape of a struct field type, as seen by `#[derive(Model)]`.
#[derive(Clone)]
pub enum TypeDecoded {
    /// A scalar column.
    Column { ty: FieldType, nullable: bool },
    /// `Vec<T>` where `T` is not a scalar: a to-many association.
    Collection(Type),
    /// `Option<T>` where `T` is not a scalar: a to-one association.
    Reference(Type),
    /// `Option<Box<T>>` where `T` is not a scalar: a to-one association, boxed.
    BoxedReference(Type),
    /// Anything else: a nested model when marked as embedded.
    Other,
}

fn first_generic(path: &Path) -> Option<&Type> {
    match &path.segments.last()?.arguments {
        PathArguments::AngleBracketed(bracketed) => match bracketed.args.first()? {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        },
        _ => None,
    }
}

fn decode_scalar(path: &Path) -> Option<FieldType> {
    if let Some(ident) = path.get_ident() {
        let ty = if ident == "bool" {
            FieldType::Boolean
        } else if ident == "i8" {
            FieldType::Int8
        } else if ident == "i16" {
            FieldType::Int16
        } else if ident == "i32" {
            FieldType::Int32
        } else if ident == "i64" {
            FieldType::Int64
        } else if ident == "u8" {
            FieldType::UInt8
        } else if ident == "u16" {
            FieldType::UInt16
        } else if ident == "u32" {
            FieldType::UInt32
        } else if ident == "u64" {
            FieldType::UInt64
        } else if ident == "isize" {
            if mem::size_of::<isize>() == mem::size_of::<i32>() {
                FieldType::Int32
            } else {
                FieldType::Int64
            }
        } else if ident == "usize" {
            if mem::size_of::<usize>() == mem::size_of::<u32>() {
                FieldType::UInt32
            } else {
                FieldType::UInt64
            }
        } else if ident == "f32" {
            FieldType::Float32
        } else if ident == "f64" {
            FieldType::Float64
        } else {
            return decode_scalar_path(path);
        };
        return Some(ty);
    }
    decode_scalar_path(path)
}

fn decode_scalar_path(path: &Path) -> Option<FieldType> {
    Some(if matches_path(path, &["std", "string", "String"]) {
        FieldType::Varchar
    } else if matches_path(path, &["rust_decimal", "Decimal"]) {
        FieldType::Decimal
    } else if matches_path(path, &["time", "Time"]) {
        FieldType::Time
    } else if matches_path(path, &["time", "Date"]) {
        FieldType::Date
    } else if matches_path(path, &["time", "PrimitiveDateTime"]) {
        FieldType::Timestamp
    } else if matches_path(path, &["time", "OffsetDateTime"]) {
        FieldType::TimestampWithTimezone
    } else if matches_path(path, &["uuid", "Uuid"]) {
        FieldType::Uuid
    } else if matches_path(path, &["std", "vec", "Vec"])
        || matches_path(path, &["std", "boxed", "Box"])
    {
        match first_generic(path)? {
            Type::Path(TypePath { path: inner, .. }) if inner.is_ident("u8") => FieldType::Blob,
            Type::Slice(slice) if matches!(&*slice.elem, Type::Path(p) if p.path.is_ident("u8")) => {
                FieldType::Blob
            }
            _ => return None,
        }
    } else {
        return None;
    })
}

/// Classifies a field type syntactically.
///
/// Only the last path segments are compared, so both `Uuid` and `uuid::Uuid` are recognized.
/// Unsupported scalar-looking types fall into [`TypeDecoded::Other`] and are rejected by the
/// derive unless the field is marked as embedded.
pub fn decode_type(ty: &Type) -> TypeDecoded {
    let Type::Path(TypePath { path, .. }) = ty else {
        return TypeDecoded::Other;
    };
    if let Some(ty) = decode_scalar(path) {
        return TypeDecoded::Column {
            ty,
            nullable: false,
        };
    }
    if matches_path(path, &["std", "option", "Option"]) {
        let Some(inner) = first_generic(path) else {
            return TypeDecoded::Other;
        };
        return match decode_type(inner) {
            TypeDecoded::Column { ty, .. } => TypeDecoded::Column { ty, nullable: true },
            TypeDecoded::Other => match inner {
                Type::Path(TypePath { path: boxed, .. })
                    if matches_path(boxed, &["std", "boxed", "Box"]) =>
                {
                    match first_generic(boxed) {
                        Some(target) => TypeDecoded::BoxedReference(target.clone()),
                        None => TypeDecoded::Other,
                    }
                }
                _ => TypeDecoded::Reference(inner.clone()),
            },
            _ => TypeDecoded::Other,
        };
    }
    if matches_path(path, &["std", "vec", "Vec"]) {
        return match first_generic(path) {
            Some(inner) if matches!(decode_type(inner), TypeDecoded::Other) => {
                TypeDecoded::Collection(inner.clone())
            }
            _ => TypeDecoded::Other,
        };
    }
    TypeDecoded::Other
}
