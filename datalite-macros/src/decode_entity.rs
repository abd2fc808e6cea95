use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{
    Error, Expr, ExprLit, Field, Fields, Ident, ItemStruct, Lit, LitStr, Result, Type,
    spanned::Spanned,
};

pub(crate) struct ColumnMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    pub(crate) name: String,
    pub(crate) unique: bool,
    pub(crate) not_null: bool,
    pub(crate) default: Option<Expr>,
}

pub(crate) struct EntityMetadata {
    pub(crate) table: String,
    pub(crate) identity: Ident,
    pub(crate) columns: Vec<ColumnMetadata>,
    /// Fields excluded with `#[datalite(skip)]`, rebuilt with `Default::default()`.
    pub(crate) skipped: Vec<Ident>,
}

fn is_identity(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    path.qself.is_none()
        && path
            .path
            .segments
            .last()
            .is_some_and(|v| v.ident == "Identity" && v.arguments.is_empty())
}

fn table_name(item: &ItemStruct) -> Result<String> {
    let mut name = item.ident.to_string().to_case(Case::Snake);
    for attr in item.attrs.iter().filter(|v| v.path().is_ident("datalite")) {
        attr.parse_nested_meta(|arg| {
            if arg.path.is_ident("name") {
                name = arg.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(arg.error(format!(
                    "Unknown attribute `{}`, use it like: `#[datalite(name = \"my_table\")]`",
                    arg.path.to_token_stream()
                )))
            }
        })?;
    }
    if name.is_empty() {
        return Err(Error::new(item.ident.span(), "The table name cannot be empty"));
    }
    Ok(name)
}

/// Column metadata of `field`, `None` when the field is skipped.
fn decode_column(field: &Field) -> Result<Option<ColumnMetadata>> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| Error::new(field.span(), "Fields are expected to have a name"))?;
    let mut name = ident.to_string();
    if let Some(stripped) = name.strip_prefix("r#") {
        name = stripped.to_string();
    }
    let mut column = ColumnMetadata {
        ident,
        ty: field.ty.clone(),
        name,
        unique: false,
        not_null: false,
        default: None,
    };
    let mut skip = false;
    for attr in field.attrs.iter().filter(|v| v.path().is_ident("datalite")) {
        attr.parse_nested_meta(|arg| {
            if arg.path.is_ident("name") {
                column.name = arg.value()?.parse::<LitStr>()?.value();
            } else if arg.path.is_ident("unique") {
                column.unique = true;
            } else if arg.path.is_ident("not_null") {
                column.not_null = true;
            } else if arg.path.is_ident("default") {
                column.default = Some(arg.value()?.parse::<Expr>()?);
            } else if arg.path.is_ident("skip") {
                skip = true;
            } else {
                return Err(arg.error(format!(
                    "Unknown attribute `{}` inside datalite macro",
                    arg.path.to_token_stream()
                )));
            }
            Ok(())
        })?;
    }
    Ok((!skip).then_some(column))
}

pub(crate) fn decode_entity(item: &ItemStruct) -> Result<EntityMetadata> {
    if !item.generics.params.is_empty() {
        return Err(Error::new(
            item.generics.span(),
            "Entity cannot be derived for a generic struct",
        ));
    }
    let Fields::Named(fields) = &item.fields else {
        return Err(Error::new(
            item.span(),
            "Entity can only be derived for a struct with named fields",
        ));
    };
    let table = table_name(item)?;
    let mut identity: Option<Ident> = None;
    let mut columns = Vec::with_capacity(fields.named.len());
    let mut skipped = Vec::new();
    for field in &fields.named {
        if is_identity(&field.ty) {
            if identity.is_some() {
                return Err(Error::new(
                    field.span(),
                    "An entity has exactly one field of type `Identity`",
                ));
            }
            identity = field.ident.clone();
            continue;
        }
        match decode_column(field)? {
            Some(column) => columns.push(column),
            None => skipped.extend(field.ident.clone()),
        }
    }
    let Some(identity) = identity else {
        return Err(Error::new(
            item.ident.span(),
            format!(
                "`{}` needs a field of type `Identity` to hold the row identity",
                item.ident
            ),
        ));
    };
    Ok(EntityMetadata {
        table,
        identity,
        columns,
        skipped,
    })
}

/// Declared default typed as the field, string literals go through `Into`.
pub(crate) fn encode_default(column: &ColumnMetadata) -> TokenStream {
    let ty = &column.ty;
    let Some(expr) = &column.default else {
        return quote!(::std::option::Option::None);
    };
    let value = match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(..), ..
        }) => quote!(::std::convert::Into::into(#expr)),
        _ => quote!(#expr),
    };
    quote! {
        ::std::option::Option::Some(::datalite::AsValue::as_value({
            let value: #ty = #value;
            value
        }))
    }
}
