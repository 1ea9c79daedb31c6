//! Identifier case conversion: shape and field names (PascalCase or camelCase) to snake_case storage names.

/// Convert an identifier to snake_case.
/// e.g. "User" -> "user", "EmailActivationKey" -> "email_activation_key", "UserID" -> "user_id",
/// "User_Create" -> "user_create". Already snake_case input is returned unchanged.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
                if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                    out.push('_');
                }
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::to_snake_case;

    #[test]
    fn converts_pascal_and_camel_case() {
        assert_eq!(to_snake_case("User"), "user");
        assert_eq!(to_snake_case("EmailActivationKey"), "email_activation_key");
        assert_eq!(to_snake_case("lastModifiedAt"), "last_modified_at");
    }

    #[test]
    fn handles_acronyms_and_existing_underscores() {
        assert_eq!(to_snake_case("ID"), "id");
        assert_eq!(to_snake_case("UserID"), "user_id");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("User_Create"), "user_create");
        assert_eq!(to_snake_case("created_at"), "created_at");
    }
}
