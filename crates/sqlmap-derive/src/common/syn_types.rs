//! Type helper utilities for syn type analysis.

/// The single generic argument of `Wrapper<T>` when the last path segment
/// is `wrapper`.
fn single_arg<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    let syn::GenericArgument::Type(inner) = args.args.first()? else {
        return None;
    };
    Some(inner)
}

/// Extract the inner type T from Option<T>, or return None if not an Option type.
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_arg(ty, "Option")
}

/// Extract the inner type T from Vec<T>, or return None if not a Vec type.
pub fn vec_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_arg(ty, "Vec")
}

/// Last path segment name, e.g. `NaiveDateTime` for `chrono::NaiveDateTime`.
pub fn last_ident(ty: &syn::Type) -> Option<String> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    type_path.path.segments.last().map(|s| s.ident.to_string())
}

/// Whether the type is spelled `bool`.
pub fn is_bool(ty: &syn::Type) -> bool {
    last_ident(ty).is_some_and(|name| name == "bool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_option_and_vec() {
        let ty: syn::Type = syn::parse_quote!(std::option::Option<Vec<i64>>);
        let inner = option_inner(&ty).unwrap();
        assert_eq!(last_ident(vec_inner(inner).unwrap()).as_deref(), Some("i64"));
        assert!(vec_inner(&ty).is_none());
    }

    #[test]
    fn detects_bool() {
        assert!(is_bool(&syn::parse_quote!(bool)));
        assert!(!is_bool(&syn::parse_quote!(Option<bool>)));
    }
}
