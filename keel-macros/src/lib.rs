mod decode_field;
mod decode_model;

use decode_field::FieldShape;
use decode_model::decode_model;
use proc_macro::TokenStream;
use proc_macro2::Literal;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Implements `keel::Record` and `keel::Model` for a struct with named fields.
///
/// Field annotations go in `#[keel("...")]` (see `keel::Tag`), `#[keel(embed)]` flattens a nested
/// model into the owner's columns and `#[keel(ignore)]` leaves a field out. On the struct,
/// `#[keel(table = "...")]` overrides the table name and `#[keel(hooks)]` enables the lifecycle
/// callbacks of the `keel::Hooks` implementation.
#[proc_macro_derive(Model, attributes(keel))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let name = &item.ident;
    let metadata = decode_model(&item);
    let type_name = name.to_string();
    let table_name = match &metadata.table_name {
        Some(v) => quote!(Some(#v)),
        None => quote!(None),
    };

    let mut field_schemas = Vec::new();
    let mut get_arms = Vec::new();
    let mut set_arms = Vec::new();
    let mut assign_arms = Vec::new();
    for (i, field) in metadata.fields.iter().enumerate() {
        let ident = &field.ident;
        let ty = &field.ty;
        let field_name = field.name();
        let tag = &field.tag;
        let index = Literal::usize_unsuffixed(i);
        let kind = match &field.shape {
            FieldShape::Column { ty: field_type, nullable } => {
                get_arms.push(quote! {
                    [#index] => Ok(::keel::AsValue::as_value(::std::clone::Clone::clone(&self.#ident))),
                });
                set_arms.push(quote! {
                    [#index] => {
                        self.#ident = <#ty as ::keel::AsValue>::try_from_value(value)?;
                        Ok(())
                    }
                });
                quote!(::keel::FieldKind::Column { ty: #field_type, nullable: #nullable })
            }
            FieldShape::Embedded => {
                get_arms.push(quote! {
                    [#index, rest @ ..] => ::keel::Record::get_value(&self.#ident, rest),
                });
                set_arms.push(quote! {
                    [#index, rest @ ..] => ::keel::Record::set_value(&mut self.#ident, rest, value),
                });
                quote!(::keel::FieldKind::Embedded(<#ty as ::keel::Model>::describe))
            }
            FieldShape::Collection(target) => {
                assign_arms.push(quote! {
                    #field_name => ::keel::assign_many(&mut self.#ident, related),
                });
                quote!(::keel::FieldKind::Collection(<#target as ::keel::Model>::describe))
            }
            FieldShape::Reference(target) => {
                assign_arms.push(quote! {
                    #field_name => ::keel::assign_one(&mut self.#ident, related),
                });
                quote!(::keel::FieldKind::Reference(<#target as ::keel::Model>::describe))
            }
            FieldShape::BoxedReference(target) => {
                assign_arms.push(quote! {
                    #field_name => ::keel::assign_one_boxed(&mut self.#ident, related),
                });
                quote!(::keel::FieldKind::Reference(<#target as ::keel::Model>::describe))
            }
        };
        field_schemas.push(quote! {
            ::keel::FieldSchema {
                name: #field_name,
                tag: #tag,
                kind: #kind,
            }
        });
    }
    let hooks = metadata.hooks.then(|| {
        quote! {
            fn hooks(&mut self) -> ::std::option::Option<&mut dyn ::keel::Hooks> {
                ::std::option::Option::Some(self)
            }
        }
    });

    quote! {
        impl ::keel::Record for #name {
            fn schema(&self) -> &'static ::keel::ModelSchema {
                <Self as ::keel::Model>::describe()
            }

            #[allow(unused_variables)]
            fn get_value(&self, path: &[usize]) -> ::keel::Result<::keel::Value> {
                match path {
                    #(#get_arms)*
                    _ => Err(::keel::Error::msg(format!(
                        "Model `{}` has no column at index path {:?}",
                        #type_name, path
                    ))),
                }
            }

            #[allow(unused_variables)]
            fn set_value(&mut self, path: &[usize], value: ::keel::Value) -> ::keel::Result<()> {
                match path {
                    #(#set_arms)*
                    _ => Err(::keel::Error::msg(format!(
                        "Model `{}` has no column at index path {:?}",
                        #type_name, path
                    ))),
                }
            }

            #[allow(unused_variables)]
            fn assign_association(
                &mut self,
                name: &str,
                related: ::std::vec::Vec<::std::boxed::Box<dyn ::keel::Record>>,
            ) -> ::keel::Result<()> {
                match name {
                    #(#assign_arms)*
                    _ => Err(::keel::Error::msg(format!(
                        "Model `{}` has no association named `{}`",
                        #type_name, name
                    ))),
                }
            }

            fn clone_record(&self) -> ::std::boxed::Box<dyn ::keel::Record> {
                ::std::boxed::Box::new(::std::clone::Clone::clone(self))
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }

            #hooks
        }

        impl ::keel::Model for #name {
            fn describe() -> &'static ::keel::ModelSchema {
                fn instantiate() -> ::std::boxed::Box<dyn ::keel::Record> {
                    ::std::boxed::Box::new(<#name as ::std::default::Default>::default())
                }
                fn type_id() -> ::std::any::TypeId {
                    ::std::any::TypeId::of::<#name>()
                }
                static SCHEMA: ::keel::ModelSchema = ::keel::ModelSchema {
                    type_name: #type_name,
                    table_name: #table_name,
                    fields: &[#(#field_schemas),*],
                    type_id,
                    instantiate,
                };
                &SCHEMA
            }
        }
    }
    .into()
}
