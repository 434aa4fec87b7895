//! `#[operation]`: attach verb/noun metadata to a board operation struct.
//!
//! ```ignore
//! #[operation(verb = "move", noun = "card", description = "Move a card on its board")]
//! #[derive(Debug, Serialize, Deserialize)]
//! pub struct MoveCard { /* fields are the parameters */ }
//!
//! #[operation(verb = "get", noun = "board", description = "Read a board", read_only = true)]
//! #[derive(Debug, Serialize, Deserialize)]
//! pub struct GetBoard { /* ... */ }
//! ```
//!
//! The struct gets an `Operation` impl and an inherent `OP` constant holding
//! the canonical `"<verb> <noun>"` string.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    parse::Parser, parse_macro_input, punctuated::Punctuated, Data, DeriveInput, Expr, ExprLit,
    Lit, MetaNameValue, Token,
};

#[proc_macro_attribute]
pub fn operation(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let pairs = match Punctuated::<MetaNameValue, Token![,]>::parse_terminated.parse(attr) {
        Ok(pairs) => pairs,
        Err(e) => return e.to_compile_error().into(),
    };

    match expand(&input, pairs) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

#[derive(Default)]
struct Meta {
    verb: Option<String>,
    noun: Option<String>,
    description: Option<String>,
    read_only: bool,
}

fn expand(
    input: &DeriveInput,
    pairs: Punctuated<MetaNameValue, Token![,]>,
) -> syn::Result<proc_macro2::TokenStream> {
    if !matches!(input.data, Data::Struct(_)) {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "#[operation] can only be applied to structs",
        ));
    }

    let mut meta = Meta::default();
    for pair in pairs {
        let key = pair
            .path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default();
        let Expr::Lit(ExprLit { lit, .. }) = &pair.value else {
            return Err(syn::Error::new_spanned(&pair.value, "expected a literal"));
        };

        match (key.as_str(), lit) {
            ("verb", Lit::Str(s)) => meta.verb = Some(s.value()),
            ("noun", Lit::Str(s)) => meta.noun = Some(s.value()),
            ("description", Lit::Str(s)) => meta.description = Some(s.value()),
            ("read_only", Lit::Bool(b)) => meta.read_only = b.value,
            ("verb" | "noun" | "description", other) => {
                return Err(syn::Error::new_spanned(other, format!("`{key}` takes a string")))
            }
            ("read_only", other) => {
                return Err(syn::Error::new_spanned(other, "`read_only` takes true or false"))
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &pair.path,
                    "expected one of: verb, noun, description, read_only",
                ))
            }
        }
    }

    let required = |value: Option<String>, key: &str| {
        value.ok_or_else(|| {
            syn::Error::new(Span::call_site(), format!("#[operation] requires `{key} = \"...\"`"))
        })
    };
    let verb = required(meta.verb, "verb")?;
    let noun = required(meta.noun, "noun")?;
    let description = required(meta.description, "description")?;
    let read_only = meta.read_only;
    let op = format!("{verb} {noun}");

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #input

        impl #impl_generics #name #ty_generics #where_clause {
            /// Canonical op string
            pub const OP: &'static str = #op;
        }

        impl #impl_generics dealflow_operations::Operation for #name #ty_generics #where_clause {
            fn verb(&self) -> &'static str { #verb }
            fn noun(&self) -> &'static str { #noun }
            fn description(&self) -> &'static str { #description }
            fn is_read_only(&self) -> bool { #read_only }
            fn op_string(&self) -> String { Self::OP.to_string() }
        }
    })
}
