//! Proc macros for Gemini structured output.
//!
//! Provides `#[derive(ResponseSchema)]` to generate the `responseSchema`
//! a Gemini request needs from a plain struct definition.
//!
//! # Example
//!
//! ```ignore
//! /// A passive ability
//! #[derive(ResponseSchema)]
//! #[schema(rename_all = "camelCase")]
//! struct Trait {
//!     /// Trait name in Chinese
//!     name: String,
//!     /// Trait description in Chinese
//!     description: String,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Field, Lit, LitStr, Meta, Type};

/// Derive macro for generating Gemini response schemas.
///
/// # Attributes
///
/// - `#[schema(rename_all = "camelCase")]` on the struct - Rename every property
/// - `#[schema(rename = "...")]` on fields - Override the property name
/// - `#[schema(skip)]` on fields - Leave the field out of the schema
/// - `#[schema(optional)]` on fields - Do not list the field as required
#[proc_macro_derive(ResponseSchema, attributes(schema))]
pub fn derive_response_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_schema(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

#[derive(Default)]
struct FieldOptions {
    rename: Option<String>,
    skip: bool,
    optional: bool,
}

fn expand_schema(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let description = get_doc_comment(&input.attrs);
    let camel_case = uses_camel_case(&input)?;

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "ResponseSchema derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "ResponseSchema derive only supports structs",
            ))
        }
    };

    let mut property_tokens = Vec::new();
    let mut ordering = Vec::new();
    let mut required_fields = Vec::new();

    for field in fields {
        let options = get_field_options(field)?;
        if options.skip {
            continue;
        }

        let property_name = property_name(field, &options, camel_case)?;
        let field_desc = get_doc_comment(&field.attrs);
        let type_schema = type_to_schema(&field.ty);

        let desc_token = if field_desc.is_empty() {
            quote! {}
        } else {
            quote! { property["description"] = serde_json::json!(#field_desc); }
        };

        property_tokens.push(quote! {
            {
                let mut property = #type_schema;
                #desc_token
                properties.insert(#property_name.to_string(), property);
            }
        });

        if !options.optional && !is_option_type(&field.ty) {
            required_fields.push(property_name.clone());
        }
        ordering.push(property_name);
    }

    let desc_token = if description.is_empty() {
        quote! {}
    } else {
        quote! { schema["description"] = serde_json::json!(#description); }
    };

    Ok(quote! {
        impl #struct_name {
            /// Gemini `responseSchema` describing this type.
            pub fn response_schema() -> serde_json::Value {
                let mut properties = serde_json::Map::new();
                #(#property_tokens)*

                let required: Vec<&str> = vec![#(#required_fields),*];
                let ordering: Vec<&str> = vec![#(#ordering),*];

                let mut schema = serde_json::json!({
                    "type": "OBJECT",
                    "properties": properties,
                    "required": required,
                    "propertyOrdering": ordering
                });
                #desc_token
                schema
            }
        }
    })
}

fn uses_camel_case(input: &DeriveInput) -> syn::Result<bool> {
    let mut camel = false;
    for attr in &input.attrs {
        if attr.path().is_ident("schema") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename_all") {
                    let value: LitStr = meta.value()?.parse()?;
                    match value.value().as_str() {
                        "camelCase" => camel = true,
                        "snake_case" => camel = false,
                        other => {
                            return Err(meta.error(format!("unsupported rename_all style `{other}`")))
                        }
                    }
                    Ok(())
                } else {
                    Err(meta.error("unknown schema attribute"))
                }
            })?;
        }
    }
    Ok(camel)
}

fn get_field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in &field.attrs {
        if attr.path().is_ident("schema") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    options.rename = Some(value.value());
                } else if meta.path.is_ident("skip") {
                    options.skip = true;
                } else if meta.path.is_ident("optional") {
                    options.optional = true;
                } else {
                    return Err(meta.error("unknown schema attribute"));
                }
                Ok(())
            })?;
        }
    }
    Ok(options)
}

fn property_name(field: &Field, options: &FieldOptions, camel_case: bool) -> syn::Result<String> {
    if let Some(rename) = &options.rename {
        return Ok(rename.clone());
    }

    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
    let name = ident.to_string();
    let name = name.strip_prefix("r#").unwrap_or(&name).to_string();

    Ok(if camel_case { to_camel_case(&name) } else { name })
}

fn get_doc_comment(attrs: &[syn::Attribute]) -> String {
    let mut docs = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("doc") {
            if let Meta::NameValue(nv) = &attr.meta {
                if let syn::Expr::Lit(expr_lit) = &nv.value {
                    if let Lit::Str(s) = &expr_lit.lit {
                        docs.push(s.value().trim().to_string());
                    }
                }
            }
        }
    }
    docs.join(" ")
}

fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

fn first_generic(segment: &syn::PathSegment) -> Option<&Type> {
    if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
        if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
            return Some(inner);
        }
    }
    None
}

fn type_to_schema(ty: &Type) -> TokenStream2 {
    let Type::Path(type_path) = ty else {
        return quote! { serde_json::json!({"type": "STRING"}) };
    };
    let Some(segment) = type_path.path.segments.last() else {
        return quote! { serde_json::json!({"type": "STRING"}) };
    };

    match segment.ident.to_string().as_str() {
        "String" | "str" => quote! { serde_json::json!({"type": "STRING"}) },
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            quote! { serde_json::json!({"type": "INTEGER"}) }
        }
        "f32" | "f64" => quote! { serde_json::json!({"type": "NUMBER"}) },
        "bool" => quote! { serde_json::json!({"type": "BOOLEAN"}) },
        "Option" => match first_generic(segment) {
            Some(inner) => {
                let inner_schema = type_to_schema(inner);
                quote! {
                    {
                        let mut inner = #inner_schema;
                        inner["nullable"] = serde_json::json!(true);
                        inner
                    }
                }
            }
            None => quote! { serde_json::json!({"type": "STRING", "nullable": true}) },
        },
        "Vec" => match first_generic(segment) {
            Some(inner) => {
                let inner_schema = type_to_schema(inner);
                quote! {
                    serde_json::json!({
                        "type": "ARRAY",
                        "items": #inner_schema
                    })
                }
            }
            None => quote! { serde_json::json!({"type": "ARRAY"}) },
        },
        // Nested types carry their own derived schema.
        _ => quote! { <#ty>::response_schema() },
    }
}

fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' {
            upper_next = !result.is_empty();
        } else if upper_next {
            result.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }
    result
}
