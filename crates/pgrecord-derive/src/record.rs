//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

use crate::attrs::{FieldAttrs, parse_field};
use crate::sql_ident::ColumnSet;

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut columns = ColumnSet::default();
    let mut descriptors = Vec::new();
    let mut values = Vec::new();
    let mut arms = Vec::new();

    for field in fields {
        let Some(attrs) = parse_field(field)? else {
            continue;
        };
        columns.insert(&attrs.column, attrs.span)?;

        let ident = &field.ident;
        let column = &attrs.column;
        let flags = flags_tokens(&attrs);

        descriptors.push(quote! {
            ::pgrecord::FieldDescriptor::new(#column, #flags)
        });

        values.push(if attrs.skip {
            quote! { ::pgrecord::FieldValue::skipped() }
        } else if attrs.raw {
            quote! { ::pgrecord::FieldValue::raw(&self.#ident) }
        } else {
            quote! { ::pgrecord::FieldValue::bind(&self.#ident) }
        });

        // raw fields hold SQL text, not the column value
        if !attrs.raw {
            arms.push(quote! {
                #column => {
                    self.#ident = row
                        .try_get(idx)
                        .map_err(|e| ::pgrecord::OrmError::decode(column, e.to_string()))?;
                    ::core::result::Result::Ok(true)
                }
            });
        }
    }

    Ok(quote! {
        impl #impl_generics ::pgrecord::Record for #name #ty_generics #where_clause {
            const NAME: &'static str = #name_str;

            const FIELDS: &'static [::pgrecord::FieldDescriptor] = &[
                #(#descriptors),*
            ];

            fn values(&self) -> ::std::vec::Vec<::pgrecord::FieldValue<'_>> {
                ::std::vec![#(#values),*]
            }

            #[allow(unused_variables)]
            fn assign(
                &mut self,
                column: &str,
                row: &::pgrecord::tokio_postgres::Row,
                idx: usize,
            ) -> ::pgrecord::OrmResult<bool> {
                match column {
                    #(#arms)*
                    _ => ::core::result::Result::Ok(false),
                }
            }
        }
    })
}

fn flags_tokens(attrs: &FieldAttrs) -> TokenStream {
    let mut flags = quote! { ::pgrecord::FieldFlags::NONE };
    for (set, flag) in [
        (attrs.omitempty, quote! { OMIT_EMPTY }),
        (attrs.nullable, quote! { NULLABLE }),
        (attrs.skip, quote! { SKIP }),
        (attrs.raw, quote! { RAW }),
    ] {
        if set {
            flags = quote! { #flags.union(::pgrecord::FieldFlags::#flag) };
        }
    }
    flags
}
