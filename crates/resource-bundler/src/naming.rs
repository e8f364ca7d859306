//! Identifier helpers for generated code

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Whether `name` can be used verbatim as a Rust identifier
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if name == "_" || KEYWORDS.contains(&name) {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a name into lowercase words at underscores and case boundaries
fn words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous: Option<char> = None;
    for c in name.chars() {
        if c == '_' || c == '-' || c == '.' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous = None;
            continue;
        }
        let boundary = matches!(previous, Some(p) if c.is_ascii_uppercase()
            && (p.is_ascii_lowercase() || p.is_ascii_digit()));
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c.to_ascii_lowercase());
        previous = Some(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

pub fn to_snake_case(name: &str) -> String {
    words(name).join("_")
}

pub fn to_screaming_snake_case(name: &str) -> String {
    to_snake_case(name).to_ascii_uppercase()
}

pub fn to_upper_camel_case(name: &str) -> String {
    words(name)
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                format!("{}{}", first.to_ascii_uppercase(), chars.as_str())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("logo"));
        assert!(is_valid_identifier("_private2"));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("fn"));
        assert!(!is_valid_identifier("_"));
        assert!(!is_valid_identifier("with-dash"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_snake_case("IconsImpl"), "icons_impl");
        assert_eq!(to_snake_case("Outer_Icons_fr_CA_Impl"), "outer_icons_fr_ca_impl");
        assert_eq!(to_screaming_snake_case("externalImage"), "EXTERNAL_IMAGE");
        assert_eq!(to_screaming_snake_case("logo_2x"), "LOGO_2X");
        assert_eq!(to_upper_camel_case("main_logo"), "MainLogo");
        assert_eq!(to_upper_camel_case("mainLogo"), "MainLogo");
    }
}
