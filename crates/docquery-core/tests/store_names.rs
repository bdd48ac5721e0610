use docquery_core::store_names::{
    build_store_name, generate_random_id, validate_prefix, STORE_NAME_PREFIX,
};

fn assert_suffix_shape(name: &str, prefix: &str) {
    let suffix = name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or_else(|| panic!("{name} should start with {prefix}-"));
    assert_eq!(suffix.len(), 8, "suffix of {name} should be 8 chars");
    assert!(
        suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
        "suffix of {name} should be lowercase alphanumeric"
    );
}

#[test]
fn default_prefix_followed_by_eight_char_suffix() {
    for _ in 0..200 {
        let name = build_store_name(STORE_NAME_PREFIX);
        assert_suffix_shape(&name, STORE_NAME_PREFIX);
    }
}

#[test]
fn custom_prefix_is_kept_verbatim() {
    let name = build_store_name("my-session");
    assert_suffix_shape(&name, "my-session");
}

#[test]
fn names_differ_between_calls() {
    let a = build_store_name(STORE_NAME_PREFIX);
    let b = build_store_name(STORE_NAME_PREFIX);
    assert_ne!(a, b);
}

#[test]
fn random_id_respects_requested_length() {
    assert_eq!(generate_random_id(0), "");
    assert_eq!(generate_random_id(32).len(), 32);
}

#[test]
fn prefix_validation() {
    assert!(validate_prefix(STORE_NAME_PREFIX).is_ok());
    assert!(validate_prefix("docs-2024").is_ok());
    assert!(validate_prefix("").is_err());
    assert!(validate_prefix("Upper").is_err());
    assert!(validate_prefix("with space").is_err());
}
