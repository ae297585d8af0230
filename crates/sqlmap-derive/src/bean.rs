//! Bean derive macro implementation

use crate::common::syn_types::{is_bool, last_ident, option_inner, vec_inner};
use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

#[derive(Clone, Copy)]
enum RenameRule {
    CamelCase,
    SnakeCase,
    PascalCase,
    ScreamingSnakeCase,
    None,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> Result<Self> {
        match lit.value().as_str() {
            "camelCase" => Ok(Self::CamelCase),
            "snake_case" => Ok(Self::SnakeCase),
            "PascalCase" => Ok(Self::PascalCase),
            "SCREAMING_SNAKE_CASE" => Ok(Self::ScreamingSnakeCase),
            "none" => Ok(Self::None),
            other => Err(syn::Error::new_spanned(
                lit,
                format!("unknown rename_all rule '{other}'"),
            )),
        }
    }

    fn apply(self, field: &str) -> String {
        let field = field.trim_start_matches("r#");
        match self {
            Self::CamelCase => field.to_lower_camel_case(),
            Self::SnakeCase => field.to_snake_case(),
            Self::PascalCase => field.to_upper_camel_case(),
            Self::ScreamingSnakeCase => field.to_shouty_snake_case(),
            Self::None => field.to_string(),
        }
    }
}

struct StructAttr {
    name: Option<String>,
    rename_all: RenameRule,
    default: bool,
}

fn parse_struct_attr(input: &DeriveInput) -> Result<StructAttr> {
    let mut attr = StructAttr {
        name: None,
        rename_all: RenameRule::CamelCase,
        default: false,
    };
    for a in input.attrs.iter().filter(|a| a.path().is_ident("bean")) {
        a.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                attr.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("rename_all") {
                attr.rename_all = RenameRule::parse(&meta.value()?.parse::<LitStr>()?)?;
            } else if meta.path.is_ident("default") {
                attr.default = true;
            } else {
                return Err(meta.error("unsupported bean attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attr)
}

#[derive(Default)]
struct FieldAttr {
    rename: Option<String>,
    read_only: bool,
    skip: bool,
}

fn parse_field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut attr = FieldAttr::default();
    for a in field.attrs.iter().filter(|a| a.path().is_ident("bean")) {
        a.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                attr.rename = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("read_only") {
                attr.read_only = true;
            } else if meta.path.is_ident("skip") {
                attr.skip = true;
            } else {
                return Err(meta.error("unsupported bean field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attr)
}

/// `TypeDesc` constructor for a field type, judged from its spelling.
fn type_desc(ty: &syn::Type) -> TokenStream {
    if let Some(inner) = option_inner(ty) {
        return type_desc(inner);
    }
    if let Some(inner) = vec_inner(ty) {
        return if last_ident(inner).as_deref() == Some("u8") {
            quote!(::sqlmap::reflection::TypeDesc::bytes())
        } else {
            quote!(::sqlmap::reflection::TypeDesc::list())
        };
    }
    let ctor = match last_ident(ty).as_deref() {
        Some("bool") => quote!(boolean),
        Some("i8" | "i16" | "i32" | "i64" | "u16" | "u32") => quote!(integer),
        Some("f32" | "f64") => quote!(float),
        Some("String") => quote!(text),
        Some("NaiveDateTime") => quote!(timestamp),
        Some("Uuid") => quote!(uuid),
        Some("JsonValue") => quote!(json),
        Some("Value") if is_json_value(ty) => quote!(json),
        Some("BTreeMap" | "HashMap") => quote!(map),
        _ => quote!(object),
    };
    quote!(::sqlmap::reflection::TypeDesc::#ctor())
}

fn is_json_value(ty: &syn::Type) -> bool {
    let syn::Type::Path(p) = ty else {
        return false;
    };
    p.path.segments.iter().any(|s| s.ident == "serde_json")
}

/// Accessor suffix for `property`, or `None` when `get<suffix>` would not
/// map back to the same property name.
fn accessor_suffix(property: &str) -> Option<String> {
    let mut chars = property.chars();
    let first = chars.next()?;
    let second_upper = chars.next().is_some_and(char::is_uppercase);
    if second_upper && !first.is_uppercase() {
        return None;
    }
    let mut suffix: String = first.to_uppercase().collect();
    suffix.push_str(&property[first.len_utf8()..]);
    if !second_upper && first.is_uppercase() {
        // `getName` reads back as `name`, not `Name`
        return None;
    }
    Some(suffix)
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Bean cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Bean can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Bean can only be derived for structs",
            ));
        }
    };

    let attr = parse_struct_attr(&input)?;
    let class_name = attr.name.unwrap_or_else(|| name.to_string());

    let mut accessors = Vec::new();
    for field in fields {
        let field_attr = parse_field_attr(field)?;
        if field_attr.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let property = field_attr
            .rename
            .unwrap_or_else(|| attr.rename_all.apply(&ident.to_string()));
        let desc = type_desc(ty);
        let get = quote! {
            |bean: &#name| ::sqlmap::value::Value::from(::std::clone::Clone::clone(&bean.#ident))
        };
        let set = quote! {
            |bean: &mut #name, value: ::sqlmap::value::Value| {
                bean.#ident = <#ty as ::sqlmap::value::FromValue>::from_value(value)?;
                ::std::result::Result::Ok(())
            }
        };

        match accessor_suffix(&property) {
            Some(suffix) => {
                let getter = if is_bool(ty) {
                    format!("is{suffix}")
                } else {
                    format!("get{suffix}")
                };
                accessors.push(quote!(.getter(#getter, #desc, #get)));
                if !field_attr.read_only {
                    let setter = format!("set{suffix}");
                    accessors.push(quote!(.setter(#setter, #desc, #set)));
                }
            }
            None if field_attr.read_only => {
                accessors.push(quote!(.read_only_field(#property, #desc, #get)));
            }
            None => {
                accessors.push(quote!(.field(#property, #desc, #get, #set)));
            }
        }
    }

    let constructor = attr
        .default
        .then(|| quote!(.default_constructor(<#name as ::std::default::Default>::default)));

    Ok(quote! {
        impl ::sqlmap::reflection::Bean for #name {
            fn class() -> ::std::sync::Arc<::sqlmap::reflection::ClassDef> {
                static CLASS: ::std::sync::OnceLock<::std::sync::Arc<::sqlmap::reflection::ClassDef>> =
                    ::std::sync::OnceLock::new();
                ::std::sync::Arc::clone(CLASS.get_or_init(|| {
                    ::sqlmap::reflection::ClassDef::builder::<#name>(#class_name)
                        #(#accessors)*
                        #constructor
                        .build()
                }))
            }

            fn class_def(&self) -> ::std::sync::Arc<::sqlmap::reflection::ClassDef> {
                <Self as ::sqlmap::reflection::Bean>::class()
            }
        }
    })
}
