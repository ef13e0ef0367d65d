/// Turns a heading title into a path segment.
///
/// ASCII letters and digits are kept (lowercased). Whitespace, `-`, `.` and
/// `_` separate words; everything else is dropped. Separator runs collapse
/// to a single `-` and never lead or trail. A title with nothing left becomes
/// `section`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || matches!(ch, '-' | '.' | '_') {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("Introduction", "introduction")]
    #[case("Getting Started", "getting-started")]
    #[case("A.1", "a-1")]
    #[case("Section 2.1", "section-2-1")]
    #[case("snake_case_title", "snake-case-title")]
    #[case("  Padded   Title  ", "padded-title")]
    #[case("Don't Panic!", "dont-panic")]
    #[case("--leading and trailing--", "leading-and-trailing")]
    #[case("Kapitel 2: Über uns!", "kapitel-2-ber-uns")]
    #[case("C++ & Rust", "c-rust")]
    #[case("???", "section")]
    #[case("", "section")]
    fn slugs_titles(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(slugify(title), expected);
    }

    proptest! {
        #[test]
        fn slugs_are_path_safe_and_deterministic(title in ".{0,40}") {
            let slug = slugify(&title);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert_eq!(slug, slugify(&title));
        }
    }
}
