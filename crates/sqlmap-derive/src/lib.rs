//! Derive macros for sqlmap
//!
//! Provides `#[derive(Bean)]`, which describes a struct's properties to the
//! sqlmap reflector.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod bean;
mod common;

/// Derive `Bean` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use sqlmap::Bean;
///
/// #[derive(Bean, Default)]
/// #[bean(default)]
/// struct User {
///     id: i64,
///     user_name: String,
///     active: bool,
///     #[bean(rename = "mail")]
///     email: Option<String>,
///     #[bean(skip)]
///     cache: Vec<String>,
/// }
/// ```
///
/// # Generated
///
/// - `getX`/`setX` accessors per field (`isX` for `bool` fields), with the
///   property named in lowerCamelCase (`user_name` becomes `userName`)
/// - a plain field accessor instead when the property name would not survive
///   the getter naming rules (for example `aValue` stays `aValue`)
///
/// # Attributes
///
/// - `#[bean(name = "Name")]` - Class name (defaults to the struct name)
/// - `#[bean(rename_all = "snake_case")]` - Property naming: `camelCase`
///   (default), `snake_case`, `PascalCase`, `SCREAMING_SNAKE_CASE` or `none`
/// - `#[bean(default)]` - Register `Default::default` as the constructor
/// - `#[bean(rename = "name")]` - Property name of one field
/// - `#[bean(read_only)]` - Expose a getter but no setter
/// - `#[bean(skip)]` - Leave the field out
#[proc_macro_derive(Bean, attributes(bean))]
pub fn derive_bean(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bean::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
