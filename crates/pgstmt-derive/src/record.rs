//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

#[derive(Default)]
struct FieldAttrs {
    column: Option<String>,
    skip_insert: bool,
}

impl syn::parse::Parse for FieldAttrs {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attrs = FieldAttrs::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            match ident.to_string().as_str() {
                "skip_insert" => attrs.skip_insert = true,
                "column" => {
                    let _: syn::Token![=] = input.parse()?;
                    let value: syn::LitStr = input.parse()?;
                    attrs.column = Some(value.value());
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown record attribute `{other}`"),
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attrs)
    }
}

fn field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut merged = FieldAttrs::default();
    for attr in &field.attrs {
        if attr.path().is_ident("record") {
            let parsed: FieldAttrs = attr.parse_args()?;
            merged.column = parsed.column.or(merged.column);
            merged.skip_insert |= parsed.skip_insert;
        }
    }
    Ok(merged)
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

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

    let mut columns = Vec::new();
    let mut extracts = Vec::new();
    let mut inserts = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let attrs = field_attrs(field)?;
        let column = attrs.column.unwrap_or_else(|| field_name.to_string());

        extracts.push(quote! {
            #field_name: record.try_get(#column)?
        });
        if !attrs.skip_insert {
            inserts.push(quote! {
                fields.insert(#column, self.#field_name)?;
            });
        }
        columns.push(column);
    }

    Ok(quote! {
        impl #impl_generics ::pgstmt::FromRecord for #name #ty_generics #where_clause {
            const FIELDS: &'static [&'static str] = &[#(#columns),*];

            fn from_record(record: &::pgstmt::Record) -> ::pgstmt::StmtResult<Self> {
                Ok(Self {
                    #(#extracts),*
                })
            }
        }

        impl #impl_generics ::pgstmt::FieldSource for #name #ty_generics #where_clause {
            fn into_field_set(self) -> ::pgstmt::StmtResult<::pgstmt::FieldSet> {
                #[allow(unused_mut)]
                let mut fields = ::pgstmt::FieldSet::new();
                #(#inserts)*
                Ok(fields)
            }
        }
    })
}
