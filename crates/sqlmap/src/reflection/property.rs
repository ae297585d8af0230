//! Property names derived from accessor method names.

use crate::error::{MapperError, MapperResult};

/// `getUserName` -> `userName`, `isActive` -> `active`, `getURL` -> `URL`.
pub fn method_to_property(name: &str) -> MapperResult<String> {
    let stripped = if let Some(rest) = name.strip_prefix("is") {
        rest
    } else if let Some(rest) = name.strip_prefix("get").or_else(|| name.strip_prefix("set")) {
        rest
    } else {
        return Err(MapperError::configuration(format!(
            "Error parsing property name '{name}'. Didn't start with 'is', 'get' or 'set'."
        )));
    };

    let mut chars = stripped.chars();
    let Some(first) = chars.next() else {
        return Ok(String::new());
    };
    // Leading acronyms keep their case.
    let keep_case = chars.next().is_some_and(|second| second.is_uppercase());
    if keep_case {
        Ok(stripped.to_string())
    } else {
        let mut out = String::with_capacity(stripped.len());
        out.extend(first.to_lowercase());
        out.push_str(&stripped[first.len_utf8()..]);
        Ok(out)
    }
}

pub fn is_getter(name: &str) -> bool {
    (name.starts_with("get") && name.len() > 3) || (name.starts_with("is") && name.len() > 2)
}

pub fn is_setter(name: &str) -> bool {
    name.starts_with("set") && name.len() > 3
}

/// Names reserved by the runtime never become properties.
pub fn is_valid_property_name(name: &str) -> bool {
    match name.chars().next() {
        Some(c) if c.is_alphanumeric() => name != "serialVersionUID" && name != "class",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accessor_prefixes() {
        assert_eq!(method_to_property("getUserName").unwrap(), "userName");
        assert_eq!(method_to_property("isActive").unwrap(), "active");
        assert_eq!(method_to_property("setId").unwrap(), "id");
        assert_eq!(method_to_property("getURL").unwrap(), "URL");
        assert_eq!(method_to_property("getX").unwrap(), "x");
    }

    #[test]
    fn rejects_non_accessor_names() {
        assert!(method_to_property("name").unwrap_err().is_configuration());
    }

    #[test]
    fn reserved_names_are_invalid() {
        assert!(!is_valid_property_name("class"));
        assert!(!is_valid_property_name("serialVersionUID"));
        assert!(!is_valid_property_name("$jacocoData"));
        assert!(!is_valid_property_name("_hidden"));
        assert!(is_valid_property_name("name"));
    }
}
