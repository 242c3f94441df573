//! Field-level `#[orm(...)]` attributes of `#[derive(Record)]`.

use syn::{Field, Result};

/// Parsed `#[orm(...)]` options of one field.
#[derive(Debug, Default)]
pub(super) struct FieldAttr {
    pub column: Option<String>,
    pub skip: bool,
    pub json: bool,
    pub flatten: bool,
    pub scalar: bool,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                attr.column = Some(value.value());
            } else if ident == "skip" {
                attr.skip = true;
            } else if ident == "json" {
                attr.json = true;
            } else if ident == "flatten" {
                attr.flatten = true;
            } else if ident == "scalar" {
                attr.scalar = true;
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "unknown orm attribute, expected one of: column, skip, json, flatten, scalar",
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        if !input.is_empty() {
            return Err(input.error("unexpected tokens in orm attribute"));
        }
        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` on `field` and reject contradictory options.
pub(super) fn field_attr(field: &Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed: FieldAttr = attr.parse_args()?;
        if parsed.column.is_some() {
            merged.column = parsed.column;
        }
        merged.skip |= parsed.skip;
        merged.json |= parsed.json;
        merged.flatten |= parsed.flatten;
        merged.scalar |= parsed.scalar;
    }

    if merged.flatten && (merged.column.is_some() || merged.json || merged.scalar) {
        return Err(syn::Error::new_spanned(
            field,
            "#[orm(flatten)] cannot be combined with column, json or scalar",
        ));
    }
    if merged.json && merged.scalar {
        return Err(syn::Error::new_spanned(
            field,
            "#[orm(json)] and #[orm(scalar)] are mutually exclusive",
        ));
    }
    Ok(merged)
}
