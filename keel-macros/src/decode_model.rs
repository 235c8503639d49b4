use crate::decode_field::{FieldMetadata, decode_field};
use syn::{Fields, ItemStruct, LitStr, parse::ParseBuffer};

pub(crate) struct ModelMetadata {
    pub(crate) table_name: Option<String>,
    pub(crate) hooks: bool,
    /// Every named field that is not ignored, in declaration order.
    pub(crate) fields: Vec<FieldMetadata>,
}

pub fn decode_model(item: &ItemStruct) -> ModelMetadata {
    if !item.generics.params.is_empty() {
        panic!(
            "Model `{}` cannot have generic parameters, models describe a concrete table",
            item.ident
        );
    }
    let Fields::Named(named) = &item.fields else {
        panic!(
            "Model `{}` must be a struct with named fields",
            item.ident
        );
    };
    let mut metadata = ModelMetadata {
        table_name: None,
        hooks: false,
        fields: named.named.iter().filter_map(decode_field).collect(),
    };
    for attr in &item.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("keel") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `keel`, use it like: `#[keel(table = \"my_table\")]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("table") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `table`, use it like: `#[keel(table = \"my_table\")]`");
                };
                metadata.table_name = Some(v.value());
            } else if arg.path.is_ident("hooks") {
                let Err(..) = arg.value() else {
                    panic!("Error while parsing `hooks`, use it like: `#[keel(hooks)]`");
                };
                metadata.hooks = true;
            } else {
                panic!(
                    "Unknown attribute `{}` inside `keel` on a struct, expected `table` or `hooks`",
                    arg.path
                        .get_ident()
                        .map(ToString::to_string)
                        .unwrap_or_default()
                );
            }
            Ok(())
        });
    }
    metadata
}
