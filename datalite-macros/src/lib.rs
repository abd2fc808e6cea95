mod decode_entity;
mod from_row;

use decode_entity::{decode_entity, encode_default};
use from_row::from_row;
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Implement `datalite::Entity` for a struct with named fields.
///
/// The struct needs exactly one field of type `Identity`, every other field is a column
/// unless marked with `#[datalite(skip)]`.
#[proc_macro_derive(Entity, attributes(datalite))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    let entity = match decode_entity(&item) {
        Ok(v) => v,
        Err(e) => return e.to_compile_error().into(),
    };
    let name = &item.ident;
    let table = &entity.table;
    let identity = &entity.identity;
    let field_defs = entity.columns.iter().map(|c| {
        let ty = &c.ty;
        let column = &c.name;
        let unique = c.unique;
        let not_null = c.not_null;
        let default = encode_default(c);
        quote! {
            ::datalite::FieldDef {
                name: #column,
                value: <#ty as ::datalite::AsValue>::as_empty_value(),
                nullable: <#ty as ::datalite::AsValue>::NULLABLE,
                unique: #unique,
                not_null: #not_null,
                default: #default,
            }
        }
    });
    let values = entity.columns.iter().map(|c| {
        let ident = &c.ident;
        quote!(::datalite::AsValue::as_value(::std::clone::Clone::clone(&self.#ident)))
    });
    let from_row = from_row(&entity);
    quote! {
        impl ::datalite::Entity for #name {
            fn table_name() -> &'static str {
                #table
            }

            fn fields() -> &'static [::datalite::FieldDef] {
                static FIELDS: ::std::sync::LazyLock<::std::boxed::Box<[::datalite::FieldDef]>> =
                    ::std::sync::LazyLock::new(|| vec![#(#field_defs),*].into_boxed_slice());
                &FIELDS
            }

            fn identity(&self) -> ::datalite::Identity {
                self.#identity
            }

            fn set_identity(&mut self, identity: ::datalite::Identity) {
                self.#identity = identity;
            }

            fn row(&self) -> ::datalite::Row {
                vec![#(#values),*].into_boxed_slice()
            }

            fn from_row(row: ::datalite::RowLabeled) -> ::datalite::Result<Self> {
                #from_row
            }
        }
    }
    .into()
}
