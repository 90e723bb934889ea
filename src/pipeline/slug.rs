//! URL slugs derived from unit labels

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::constants::pipeline::MAX_SLUG_LEN;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

/// Fallback when a label has no usable characters
const EMPTY_SLUG: &str = "page";

/// Lowercase ASCII slug with `-` separators
///
/// Accents are stripped through NFD decomposition; any other character that
/// is not an ASCII letter or digit becomes a separator.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_dash = false;

    for c in label.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_LEN && SLUG_RE.is_match(slug)
}

/// `slug`, or `slug-2`, `slug-3`... when already taken
pub(crate) fn claim_unique(taken: &mut HashSet<String>, slug: String) -> String {
    if taken.insert(slug.clone()) {
        return slug;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", slug, n);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_slugify_examples() {
        assert_eq!(slugify("Dental Clinic"), "dental-clinic");
        assert_eq!(slugify("  Clinică dentară  Brașov "), "clinica-dentara-brasov");
        assert_eq!(slugify("Café & Bäckerei"), "cafe-backerei");
        assert_eq!(slugify("--Hello__World--"), "hello-world");
        assert_eq!(slugify("!!!"), "page");
        assert_eq!(slugify(""), "page");
    }

    #[test]
    fn test_slug_length_bounded() {
        let slug = slugify(&"word ".repeat(100));
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(is_valid_slug(&slug));
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("dental-clinic"));
        assert!(!is_valid_slug("Dental-Clinic"));
        assert!(!is_valid_slug("dental--clinic"));
        assert!(!is_valid_slug("-dental"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_claim_unique() {
        let mut taken = HashSet::new();
        assert_eq!(claim_unique(&mut taken, "a".to_string()), "a");
        assert_eq!(claim_unique(&mut taken, "a".to_string()), "a-2");
        assert_eq!(claim_unique(&mut taken, "a".to_string()), "a-3");
    }

    proptest! {
        #[test]
        fn prop_slugify_output_is_valid(label in "\\PC{0,120}") {
            let slug = slugify(&label);
            prop_assert!(is_valid_slug(&slug), "invalid slug {:?} from {:?}", slug, label);
        }

        #[test]
        fn prop_slugify_idempotent(label in "\\PC{0,60}") {
            let once = slugify(&label);
            prop_assert_eq!(slugify(&once), once);
        }
    }
}
