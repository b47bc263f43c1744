//! Field attribute parsing for the Record derive macro.

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::{Error, Result};

use crate::sql_ident::parse_sql_ident_with_span;

/// Parsed `#[orm(...)]` of a mapped field.
#[derive(Debug)]
pub(crate) struct FieldAttrs {
    pub(crate) column: String,
    pub(crate) span: Span,
    pub(crate) omitempty: bool,
    pub(crate) nullable: bool,
    pub(crate) skip: bool,
    pub(crate) raw: bool,
}

struct FieldAttrList {
    /// `Some(None)` for a bare `column`.
    column: Option<Option<syn::LitStr>>,
    column_span: Span,
    omitempty: bool,
    nullable: bool,
    skip: bool,
    raw: bool,
}

impl syn::parse::Parse for FieldAttrList {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut list = FieldAttrList {
            column: None,
            column_span: Span::call_site(),
            omitempty: false,
            nullable: false,
            skip: false,
            raw: false,
        };

        loop {
            if input.is_empty() {
                break;
            }

            let ident: syn::Ident = input.parse()?;
            let key = ident.to_string();

            if key == "column" {
                if list.column.is_some() {
                    return Err(Error::new(ident.span(), "duplicate `column`"));
                }
                let name = if input.peek(syn::Token![=]) {
                    let _: syn::Token![=] = input.parse()?;
                    Some(input.parse::<syn::LitStr>()?)
                } else {
                    None
                };
                list.column_span = name.as_ref().map_or(ident.span(), |lit| lit.span());
                list.column = Some(name);
            } else {
                if input.peek(syn::Token![=]) {
                    return Err(Error::new(
                        ident.span(),
                        format!("`{key}` does not take a value"),
                    ));
                }
                let flag = match key.as_str() {
                    "omitempty" => &mut list.omitempty,
                    "nullable" => &mut list.nullable,
                    "skip" => &mut list.skip,
                    "raw" => &mut list.raw,
                    _ => {
                        return Err(Error::new(
                            ident.span(),
                            format!(
                                "unknown orm attribute `{key}` (expected column, omitempty, nullable, skip or raw)"
                            ),
                        ));
                    }
                };
                *flag = true;
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(list)
    }
}

/// Read the `#[orm(...)]` attribute of `field`.
///
/// `Ok(None)` means the field carries no `orm` attribute and is transient.
pub(crate) fn parse_field(field: &syn::Field) -> Result<Option<FieldAttrs>> {
    let mut parsed: Option<FieldAttrList> = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        if parsed.is_some() {
            return Err(Error::new_spanned(attr, "duplicate #[orm(...)] attribute"));
        }
        parsed = Some(attr.parse_args()?);
    }

    let Some(list) = parsed else {
        return Ok(None);
    };
    let Some(column) = list.column else {
        return Err(Error::new(
            field.span(),
            "#[orm(...)] on a field requires `column` or `column = \"name\"`",
        ));
    };

    let column = match column {
        Some(lit) => parse_sql_ident_with_span(&lit.value(), lit.span(), "column")?,
        None => {
            let ident = field
                .ident
                .as_ref()
                .ok_or_else(|| Error::new(field.span(), "Record fields must be named"))?;
            let name = ident.to_string();
            let name = name.strip_prefix("r#").unwrap_or(&name);
            parse_sql_ident_with_span(name, ident.span(), "column")?
        }
    };

    Ok(Some(FieldAttrs {
        column,
        span: list.column_span,
        omitempty: list.omitempty,
        nullable: list.nullable,
        skip: list.skip,
        raw: list.raw,
    }))
}
