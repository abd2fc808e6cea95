use crate::decode_entity::EntityMetadata;
use proc_macro2::TokenStream;
use quote::quote;

/// Body of `Entity::from_row`: every column is collected into an `Option` holder, then the
/// struct is assembled failing on the first missing column.
pub(crate) fn from_row(entity: &EntityMetadata) -> TokenStream {
    let holders = entity.columns.iter().map(|c| {
        let ident = &c.ident;
        let ty = &c.ty;
        quote!(let mut #ident: ::std::option::Option<#ty> = ::std::option::Option::None;)
    });
    let assignments = entity.columns.iter().map(|c| {
        let ident = &c.ident;
        let ty = &c.ty;
        let name = &c.name;
        quote! {
            #name => #ident = ::std::option::Option::Some(
                <#ty as ::datalite::AsValue>::try_from_value(__value__)
                    .map_err(|e| ::datalite::Error::msg(format!("Column `{}`: {}", #name, e)))?,
            ),
        }
    });
    let fields = entity.columns.iter().map(|c| {
        let ident = &c.ident;
        let name = &c.name;
        quote!(#ident: #ident.ok_or_else(|| __missing__(#name))?)
    });
    let identity = &entity.identity;
    let skipped = &entity.skipped;
    quote! {
        let ::datalite::RowLabeled {
            labels: __labels__,
            values: __values__,
        } = row;
        #(#holders)*
        for (__name__, __value__) in ::std::iter::zip(__labels__.iter(), __values__.into_vec()) {
            match __name__.as_str() {
                #(#assignments)*
                _ => {}
            }
        }
        let __missing__ = |name: &str| {
            ::datalite::Error::msg(format!(
                "Column `{}` does not exist in the row provided",
                name
            ))
        };
        ::std::result::Result::Ok(Self {
            #identity: ::datalite::Identity::NONE,
            #(#fields,)*
            #(#skipped: ::std::default::Default::default(),)*
        })
    }
}
