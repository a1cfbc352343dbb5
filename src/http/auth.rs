use subtle::ConstantTimeEq;

/// Shared-secret token check for producers and viewers.
///
/// No configured token means open access (the deployment gates access
/// elsewhere). With a token configured, the comparison is constant-time so
/// the check does not leak prefix information.
pub fn authenticated(expected: Option<&str>, provided: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => provided
            .map(|token| expected.as_bytes().ct_eq(token.as_bytes()).into())
            .unwrap_or(false),
    }
}
