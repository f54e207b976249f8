//! DOMStringMap (dataset) key mapping
//!
//! Converts between `dataset` camelCase keys and `data-*` attribute names.

/// `hovercardReferrer` -> `data-hovercard-referrer`
pub fn dataset_key_to_attribute(key: &str) -> String {
    let mut result = String::with_capacity(key.len() + 8);
    result.push_str("data-");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            result.push('-');
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// `data-hovercard-referrer` -> `hovercardReferrer`; `None` for non-data attributes
pub fn attribute_to_dataset_key(name: &str) -> Option<String> {
    let key = name.strip_prefix("data-")?;
    let mut result = String::with_capacity(key.len());
    let mut capitalize_next = false;
    for c in key.chars() {
        if c == '-' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_to_attribute() {
        assert_eq!(dataset_key_to_attribute("ft"), "data-ft");
        assert_eq!(dataset_key_to_attribute("hovercardReferrer"), "data-hovercard-referrer");
    }

    #[test]
    fn test_attribute_to_key() {
        assert_eq!(attribute_to_dataset_key("data-user-id").as_deref(), Some("userId"));
        assert_eq!(attribute_to_dataset_key("data-hovercard").as_deref(), Some("hovercard"));
        assert_eq!(attribute_to_dataset_key("class"), None);
    }
}
