//! Derive implementations for `Message` and `ArrayMessage`
//!
//! # Code Generation Example
//!
//! Input:
//! ```ignore
//! #[derive(Default, Deserialize, ArrayMessage)]
//! struct GatewayReport {
//!     #[serde(default)]
//!     items: Vec<BeaconReading>,
//! }
//! ```
//!
//! Generated output:
//! ```ignore
//! impl ::rawjson_core::MessageType for GatewayReport {
//!     fn array_shape() -> Option<::rawjson_core::ArrayShape> {
//!         Some(<Self as ::rawjson_core::ArrayMessage>::shape())
//!     }
//!     fn decode_tree(tree: &::rawjson_core::JsonTree) -> Result<Self, ::rawjson_core::DecodeError> {
//!         ::rawjson_core::decoder::decode_array_tolerant::<Self>(tree)
//!     }
//! }
//!
//! impl ::rawjson_core::ArrayMessage for GatewayReport {
//!     type Item = BeaconReading;
//!     const FIELD: &'static str = "items";
//!     fn from_items(items: Vec<BeaconReading>) -> Self { /* default + items */ }
//!     fn items(&self) -> &[BeaconReading] { &self.items }
//! }
//! ```
//!
//! `FIELD` is the name serde deserializes the field from: a field-level
//! `#[serde(rename = "...")]` (or its `deserialize` half) wins, then the
//! struct's `#[serde(rename_all = "...")]`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Field, Fields, GenericArgument, Ident, LitStr,
    PathArguments, Token, Type,
};

/// Expand `#[derive(Message)]`
pub fn derive_message_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let urn_fn = match urn_override(&input) {
        Ok(urn_fn) => urn_fn,
        Err(e) => return e.to_compile_error().into(),
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::rawjson_core::MessageType for #name #ty_generics #where_clause {
            #urn_fn
        }
    };

    TokenStream::from(expanded)
}

/// Expand `#[derive(ArrayMessage)]`
pub fn derive_array_message_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_array_message(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_array_message(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let urn_fn = urn_override(input)?;
    let field = items_field(input)?;

    let field_ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new(field.span(), "the items field must be named"))?;
    let element = vec_element(&field.ty)?;
    let wire_name = wire_name(input, field, field_ident)?;

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::rawjson_core::MessageType for #name #ty_generics #where_clause {
            #urn_fn

            fn array_shape() -> ::core::option::Option<::rawjson_core::ArrayShape> {
                ::core::option::Option::Some(<Self as ::rawjson_core::ArrayMessage>::shape())
            }

            fn decode_tree(
                tree: &::rawjson_core::JsonTree,
            ) -> ::core::result::Result<Self, ::rawjson_core::DecodeError> {
                ::rawjson_core::decoder::decode_array_tolerant::<Self>(tree)
            }
        }

        impl #impl_generics ::rawjson_core::ArrayMessage for #name #ty_generics #where_clause {
            type Item = #element;

            const FIELD: &'static str = #wire_name;

            fn from_items(items: ::std::vec::Vec<#element>) -> Self {
                let mut message = <Self as ::core::default::Default>::default();
                message.#field_ident = items;
                message
            }

            fn items(&self) -> &[#element] {
                &self.#field_ident
            }
        }
    })
}

/// `fn message_urn()` for `#[message(urn = "...")]`, or nothing
fn urn_override(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let mut urn: Option<LitStr> = None;

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("message")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("urn") {
                urn = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported message attribute, expected `urn`"))
            }
        })?;
    }

    Ok(match urn {
        Some(urn) => quote! {
            fn message_urn() -> ::std::string::String {
                ::std::string::String::from(#urn)
            }
        },
        None => TokenStream2::new(),
    })
}

/// The field marked `#[items]`, else the field named `items`
fn items_field(input: &DeriveInput) -> syn::Result<&Field> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "ArrayMessage requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "ArrayMessage can only be derived for structs",
            ))
        }
    };

    let marked: Vec<&Field> = fields
        .iter()
        .filter(|f| f.attrs.iter().any(|a| a.path().is_ident("items")))
        .collect();

    match marked.as_slice() {
        [field] => Ok(field),
        [] => fields
            .iter()
            .find(|f| f.ident.as_ref().is_some_and(|i| unraw(i) == "items"))
            .ok_or_else(|| {
                syn::Error::new(
                    input.ident.span(),
                    "ArrayMessage needs a field named `items` or one marked `#[items]`",
                )
            }),
        [_, second, ..] => Err(syn::Error::new(
            second.span(),
            "only one field can be marked `#[items]`",
        )),
    }
}

/// `E` from a `Vec<E>` field type
fn vec_element(ty: &Type) -> syn::Result<&Type> {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "Vec" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(element)) = args.args.first() {
                        return Ok(element);
                    }
                }
            }
        }
    }

    Err(syn::Error::new(ty.span(), "the items field must be a `Vec<T>`"))
}

/// Name serde reads the items field from
fn wire_name(input: &DeriveInput, field: &Field, ident: &Ident) -> syn::Result<LitStr> {
    if let Some(renamed) = serde_name(&field.attrs, "rename")? {
        return Ok(renamed);
    }

    let name = unraw(ident);
    match serde_name(&input.attrs, "rename_all")? {
        Some(rule) => Ok(LitStr::new(&apply_rename_rule(&rule, &name)?, ident.span())),
        None => Ok(LitStr::new(&name, ident.span())),
    }
}

/// Deserialize-side value of `#[serde(key = "..")]` or `#[serde(key(deserialize = ".."))]`
fn serde_name(attrs: &[Attribute], key: &str) -> syn::Result<Option<LitStr>> {
    let mut found = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident(key) {
                return skip_meta(meta);
            }
            if meta.input.peek(Token![=]) {
                found = Some(meta.value()?.parse()?);
                return Ok(());
            }
            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("deserialize") {
                    found = Some(inner.value()?.parse()?);
                    Ok(())
                } else {
                    skip_meta(inner)
                }
            })
        })?;
    }

    Ok(found)
}

/// Consume a serde option this macro does not care about
fn skip_meta(meta: ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(skip_meta)?;
    }
    Ok(())
}

/// serde's `rename_all` conversion of a snake_case field name
fn apply_rename_rule(rule: &LitStr, field: &str) -> syn::Result<String> {
    let pascal = || {
        let mut out = String::with_capacity(field.len());
        let mut upper = true;
        for ch in field.chars() {
            if ch == '_' {
                upper = true;
            } else if upper {
                out.push(ch.to_ascii_uppercase());
                upper = false;
            } else {
                out.push(ch);
            }
        }
        out
    };

    Ok(match rule.value().as_str() {
        "lowercase" | "snake_case" => field.to_string(),
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => field.to_ascii_uppercase(),
        "PascalCase" => pascal(),
        "camelCase" => {
            let pascal = pascal();
            let mut chars = pascal.chars();
            match chars.next() {
                Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                None => pascal,
            }
        }
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.to_ascii_uppercase().replace('_', "-"),
        other => {
            return Err(syn::Error::new(
                rule.span(),
                format!("unknown serde rename_all rule `{other}`"),
            ))
        }
    })
}

fn unraw(ident: &Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
}
