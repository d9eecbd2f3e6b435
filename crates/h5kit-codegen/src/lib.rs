// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::parse::ParseStream;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DataEnum, DeriveInput, Fields, Ident, Index,
    LitStr, Token,
};

/// Annotations parsed from `#[hdf(...)]` on one member.
#[derive(Debug, Default, PartialEq)]
struct Tags {
    ignore: bool,
    rename: Option<String>,
    type_ref: Option<String>,
}

/// `#[derive(Reflect)]` macro: generates `h5kit::reflect::Reflect`
///
/// Supports:
/// - Structs with named or tuple fields: a record shape with host offsets
/// - Unit-only enums: an enumeration shape over the `#[repr]` integer
///   (`isize` when absent)
///
/// Member annotations:
/// - `#[hdf(ignore)]`: leave the member out
/// - `#[hdf("name")]` or `#[hdf(rename = "name")]`: stored member name
/// - `#[hdf(type_ref = "/path")]`: resolve the member type by name
///
/// Example:
/// ```ignore
/// use h5kit::Reflect;
///
/// #[derive(Reflect)]
/// struct Reading {
///     id: u32,
///     #[hdf("temperature")]
///     temp: f64,
///     #[hdf(ignore)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(hdf))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let expanded = match &input.data {
        Data::Struct(data) => expand_struct(&input, &data.fields),
        Data::Enum(data) => expand_enum(&input, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Reflect cannot be derived for unions",
        )),
    };

    expanded
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_struct(input: &DeriveInput, fields: &Fields) -> syn::Result<TokenStream2> {
    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "Reflect requires 'static types; lifetime parameters are not supported",
        ));
    }

    let mut members = Vec::new();
    for (idx, field) in fields.iter().enumerate() {
        let tags = parse_tags(&field.attrs)?;
        let (name_str, member) = match &field.ident {
            Some(ident) => (ident.to_string(), quote! { #ident }),
            None => {
                let index = Index::from(idx);
                (idx.to_string(), quote! { #index })
            }
        };
        let ty = &field.ty;

        // Ignored and by-name members never need their own shape.
        let shape = if tags.ignore || tags.type_ref.is_some() {
            quote! { ::core::option::Option::None }
        } else {
            quote! {
                ::core::option::Option::Some(
                    <#ty as ::h5kit::reflect::Reflect>::shape as ::h5kit::reflect::ShapeFn
                )
            }
        };
        let ignore = tags.ignore;
        let rename = option_tokens(tags.rename.as_deref());
        let type_ref = option_tokens(tags.type_ref.as_deref());

        members.push(quote! {
            ::h5kit::reflect::FieldShape {
                name: #name_str,
                offset: ::core::mem::offset_of!(Self, #member),
                shape: #shape,
                tags: ::h5kit::reflect::FieldTags {
                    ignore: #ignore,
                    rename: #rename,
                    type_ref: #type_ref,
                },
            }
        });
    }

    let name = &input.ident;
    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::h5kit::reflect::Reflect));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::h5kit::reflect::Reflect for #name #ty_generics #where_clause {
            fn shape() -> ::h5kit::reflect::Shape {
                ::h5kit::reflect::Shape::new::<Self>(::h5kit::reflect::Kind::Record {
                    fields: ::std::vec![#(#members),*],
                })
            }
        }
    })
}

fn expand_enum(input: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect cannot be derived for generic enums",
        ));
    }
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Reflect supports unit-only enums; this variant carries data",
            ));
        }
    }

    let repr = enum_repr(&input.attrs)?;
    let repr_str = repr.to_string();
    let signed = repr_str.starts_with('i');
    let unsigned = format_ident!("u{}", &repr_str[1..]);

    let variants = data.variants.iter().map(|variant| {
        let ident = &variant.ident;
        let name_str = ident.to_string();
        quote! {
            ::h5kit::reflect::VariantShape {
                name: #name_str,
                value: (Self::#ident as #repr) as #unsigned as u64,
            }
        }
    });

    let name = &input.ident;
    Ok(quote! {
        impl ::h5kit::reflect::Reflect for #name {
            fn shape() -> ::h5kit::reflect::Shape {
                ::h5kit::reflect::Shape::new::<Self>(::h5kit::reflect::Kind::Enumeration {
                    width: ::core::mem::size_of::<#repr>(),
                    signed: #signed,
                    variants: ::std::vec![#(#variants),*],
                })
            }
        }
    })
}

/// Integer named by `#[repr(..)]`, `isize` when absent.
fn enum_repr(attrs: &[Attribute]) -> syn::Result<Ident> {
    const ALLOWED: [&str; 10] = [
        "u8", "u16", "u32", "u64", "usize", "i8", "i16", "i32", "i64", "isize",
    ];

    let mut repr = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("repr")) {
        attr.parse_nested_meta(|meta| {
            if let Some(ident) = meta.path.get_ident() {
                let s = ident.to_string();
                if ALLOWED.contains(&s.as_str()) {
                    repr = Some(ident.clone());
                } else if s == "u128" || s == "i128" {
                    return Err(meta.error("128-bit discriminants do not fit an 8-byte integer"));
                }
            }
            // align(N), packed(N)
            if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                content.parse::<TokenStream2>()?;
            }
            Ok(())
        })?;
    }
    Ok(repr.unwrap_or_else(|| format_ident!("isize")))
}

/// Parse every `#[hdf(...)]` attribute of one member.
fn parse_tags(attrs: &[Attribute]) -> syn::Result<Tags> {
    let mut tags = Tags::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("hdf")) {
        attr.parse_args_with(|input: ParseStream<'_>| {
            while !input.is_empty() {
                if input.peek(LitStr) {
                    let lit: LitStr = input.parse()?;
                    tags.rename = Some(non_empty(&lit)?);
                } else {
                    let key: Ident = input.parse()?;
                    match key.to_string().as_str() {
                        "ignore" => tags.ignore = true,
                        "rename" => {
                            input.parse::<Token![=]>()?;
                            let lit: LitStr = input.parse()?;
                            tags.rename = Some(non_empty(&lit)?);
                        }
                        "type_ref" => {
                            input.parse::<Token![=]>()?;
                            let lit: LitStr = input.parse()?;
                            tags.type_ref = Some(non_empty(&lit)?);
                        }
                        other => {
                            return Err(syn::Error::new(
                                key.span(),
                                format!(
                                    "unknown hdf annotation `{other}` (expected ignore, rename, type_ref or a name)"
                                ),
                            ))
                        }
                    }
                }
                if input.is_empty() {
                    break;
                }
                input.parse::<Token![,]>()?;
            }
            Ok(())
        })?;
    }
    Ok(tags)
}

fn non_empty(lit: &LitStr) -> syn::Result<String> {
    let value = lit.value();
    if value.is_empty() {
        return Err(syn::Error::new(lit.span(), "hdf name must not be empty"));
    }
    Ok(value)
}

fn option_tokens(value: Option<&str>) -> TokenStream2 {
    match value {
        Some(s) => quote! { ::core::option::Option::Some(#s) },
        None => quote! { ::core::option::Option::None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_attrs(field: syn::Field) -> Vec<Attribute> {
        field.attrs
    }

    #[test]
    fn test_bare_string_renames() {
        let field: syn::Field = parse_quote! { #[hdf("temperature")] temp: f64 };
        let tags = parse_tags(&field_attrs(field)).unwrap();
        assert_eq!(tags.rename.as_deref(), Some("temperature"));
        assert!(!tags.ignore);
    }

    #[test]
    fn test_combined_annotations() {
        let field: syn::Field = parse_quote! {
            #[hdf(rename = "lvl", type_ref = "/types/level")]
            level: u8
        };
        let tags = parse_tags(&field_attrs(field)).unwrap();
        assert_eq!(
            tags,
            Tags {
                ignore: false,
                rename: Some("lvl".to_string()),
                type_ref: Some("/types/level".to_string()),
            }
        );
    }

    #[test]
    fn test_ignore_and_unknown() {
        let field: syn::Field = parse_quote! { #[hdf(ignore)] cache: Vec<u8> };
        assert!(parse_tags(&field_attrs(field)).unwrap().ignore);

        let field: syn::Field = parse_quote! { #[hdf(skip)] cache: Vec<u8> };
        let err = parse_tags(&field_attrs(field)).unwrap_err();
        assert!(err.to_string().contains("unknown hdf annotation `skip`"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let field: syn::Field = parse_quote! { #[hdf("")] x: u8 };
        assert!(parse_tags(&field_attrs(field)).is_err());
    }

    #[test]
    fn test_enum_repr() {
        let input: DeriveInput = parse_quote! {
            #[derive(Clone)]
            #[repr(C, u16)]
            enum Level { Low, High }
        };
        assert_eq!(enum_repr(&input.attrs).unwrap(), "u16");

        let input: DeriveInput = parse_quote! { enum Level { Low } };
        assert_eq!(enum_repr(&input.attrs).unwrap(), "isize");
    }

    #[test]
    fn test_data_carrying_enum_rejected() {
        let input: DeriveInput = parse_quote! { enum Shape { Circle(f64), Empty } };
        let Data::Enum(data) = &input.data else {
            unreachable!()
        };
        assert!(expand_enum(&input, data).is_err());
    }
}
