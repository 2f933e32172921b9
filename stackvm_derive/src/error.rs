//! `#[derive(Error)]` implementation.
//!
//! Generates `std::fmt::Display` and `std::error::Error` for an enum whose
//! variants carry `#[error("...")]` attributes. A small stand-in for
//! `thiserror` covering the subset this workspace uses: unit variants,
//! tuple variants with `{0}`-style interpolation, and struct variants with
//! `{field}`-style interpolation.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(Error)] only supports enums",
        ));
    };

    let name = &input.ident;
    let arms = data
        .variants
        .iter()
        .map(display_arm)
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl ::std::fmt::Display for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    #(#arms)*
                }
            }
        }

        impl ::std::error::Error for #name {}
    })
}

/// Builds one `match` arm writing the variant's `#[error]` message.
fn display_arm(variant: &syn::Variant) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &variant.ident;
    let message = error_attribute(variant)?;

    Ok(match &variant.fields {
        Fields::Unit => quote! {
            Self::#ident => write!(f, #message),
        },
        Fields::Unnamed(fields) => {
            // Bind tuple fields to f0, f1, ... and rewrite `{0}` to `{f0}` so
            // the message can interpolate them by position. Fields the message
            // never mentions are bound with a leading underscore.
            let message = positional_to_named(&message, fields.unnamed.len());
            let bindings: Vec<_> = (0..fields.unnamed.len())
                .map(|i| format_ident!("f{}", i))
                .collect();
            let (used, patterns): (Vec<_>, Vec<_>) = bindings
                .iter()
                .map(|b| {
                    if interpolates(&message, &b.to_string()) {
                        (Some(b.clone()), quote!(#b))
                    } else {
                        (None, quote!(_))
                    }
                })
                .unzip();
            let used: Vec<_> = used.into_iter().flatten().collect();
            quote! {
                Self::#ident(#(#patterns),*) =>
                    write!(f, #message, #(#used = #used),*),
            }
        }
        Fields::Named(fields) => {
            let names: Vec<_> = fields.named.iter().filter_map(|f| f.ident.clone()).collect();
            let (used, patterns): (Vec<_>, Vec<_>) = names
                .iter()
                .map(|n| {
                    if interpolates(&message, &n.to_string()) {
                        (Some(n.clone()), quote!(#n))
                    } else {
                        (None, quote!(#n: _))
                    }
                })
                .unzip();
            let used: Vec<_> = used.into_iter().flatten().collect();
            quote! {
                Self::#ident { #(#patterns),* } =>
                    write!(f, #message, #(#used = #used),*),
            }
        }
    })
}

/// Extracts the string literal from a variant's `#[error("...")]` attribute.
fn error_attribute(variant: &syn::Variant) -> syn::Result<String> {
    for attr in &variant.attrs {
        if !attr.path().is_ident("error") {
            continue;
        }
        let Meta::List(list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                &attr.meta,
                "expected #[error(\"message\")]",
            ));
        };
        let Ok(Lit::Str(lit)) = syn::parse2::<Lit>(list.tokens.clone()) else {
            return Err(syn::Error::new_spanned(
                &attr.meta,
                "#[error] message must be a string literal",
            ));
        };
        return Ok(lit.value());
    }

    Err(syn::Error::new_spanned(
        variant,
        format!(
            "variant `{}` is missing its #[error(\"...\")] attribute",
            variant.ident
        ),
    ))
}

/// Whether the format string interpolates the named argument, as `{name}` or
/// `{name:spec}`.
fn interpolates(message: &str, name: &str) -> bool {
    message.contains(&format!("{{{name}}}")) || message.contains(&format!("{{{name}:"))
}

/// Rewrites `{0}`, `{1}`, ... to `{f0}`, `{f1}`, ... for tuple variants.
fn positional_to_named(message: &str, field_count: usize) -> String {
    let mut out = message.to_string();
    for i in (0..field_count).rev() {
        out = out.replace(&format!("{{{i}}}"), &format!("{{f{i}}}"));
    }
    out
}
