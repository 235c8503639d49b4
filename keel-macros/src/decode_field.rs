use keel_core::{FieldType, Tag, TypeDecoded, decode_type};
use syn::{Field, Ident, LitStr, Type, parse::ParseBuffer};

pub(crate) enum FieldShape {
    Column { ty: FieldType, nullable: bool },
    Embedded,
    Collection(Type),
    Reference(Type),
    BoxedReference(Type),
}

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    /// Raw annotation, parsed again by the registry at runtime.
    pub(crate) tag: String,
    pub(crate) shape: FieldShape,
}

impl FieldMetadata {
    pub(crate) fn name(&self) -> String {
        self.ident.to_string().trim_start_matches("r#").to_string()
    }
}

/// Decodes a struct field, `None` when it is marked `#[keel(ignore)]`.
pub fn decode_field(field: &Field) -> Option<FieldMetadata> {
    let ident = field
        .ident
        .clone()
        .expect("Field is expected to have a name");
    let mut tags = Vec::new();
    let mut embed = false;
    let mut ignore = false;
    for attr in &field.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("keel") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `keel`, use it like: `#[keel(\"pk;auto_increment\")]`");
        };
        if let Ok(tag) = list.parse_args::<LitStr>() {
            tags.push(tag.value());
            continue;
        }
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("tag") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `tag`, use it like: `#[keel(tag = \"column:name\")]`");
                };
                tags.push(v.value());
            } else if arg.path.is_ident("embed") {
                let Err(..) = arg.value() else {
                    panic!("Error while parsing `embed`, use it like: `#[keel(embed)]`");
                };
                embed = true;
            } else if arg.path.is_ident("ignore") {
                let Err(..) = arg.value() else {
                    panic!("Error while parsing `ignore`, use it like: `#[keel(ignore)]`");
                };
                ignore = true;
            } else {
                panic!(
                    "Unknown attribute `{}` inside `keel` on field `{ident}`, expected a tag string, `tag`, `embed` or `ignore`",
                    arg.path
                        .get_ident()
                        .map(ToString::to_string)
                        .unwrap_or_default()
                );
            }
            Ok(())
        });
    }
    if ignore {
        return None;
    }
    let tag = tags.join(";");
    if let Err(e) = Tag::parse(&tag) {
        panic!("Invalid tag on field `{ident}`: {e:#}");
    }
    let shape = if embed {
        FieldShape::Embedded
    } else {
        match decode_type(&field.ty) {
            TypeDecoded::Column { ty, nullable } => FieldShape::Column { ty, nullable },
            TypeDecoded::Collection(target) => FieldShape::Collection(target),
            TypeDecoded::Reference(target) => FieldShape::Reference(target),
            TypeDecoded::BoxedReference(target) => FieldShape::BoxedReference(target),
            TypeDecoded::Other => panic!(
                "Unsupported field type for `{ident}`, mark it with `#[keel(embed)]` if it is a model to flatten or `#[keel(ignore)]` to skip it"
            ),
        }
    };
    Some(FieldMetadata {
        ident,
        ty: field.ty.clone(),
        tag,
        shape,
    })
}
