//! Connection profile validation.
//!
//! Runs before every remote call. A failure here means no request is built.

use crate::error::ClassifiedError;
use crate::models::ConnectionProfile;

/// Check that host, port, and core name are all present.
///
/// Whitespace-only values count as empty. The profile is never modified.
pub fn validate(profile: &ConnectionProfile) -> Result<(), ClassifiedError> {
    let missing: Vec<&str> = [
        ("host", &profile.host),
        ("port", &profile.port),
        ("core name", &profile.core_name),
    ]
    .iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| *name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ClassifiedError::local(format!(
            "Please fill in all connection details (missing: {})",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn complete_profile_passes_unchanged() {
        let p = ConnectionProfile::new("localhost", "8983", "docs");
        let before = p.clone();
        assert!(validate(&p).is_ok());
        assert_eq!(p, before);
    }

    #[test]
    fn each_empty_field_fails() {
        let cases = [
            ConnectionProfile::new("", "8983", "docs"),
            ConnectionProfile::new("localhost", "", "docs"),
            ConnectionProfile::new("localhost", "8983", ""),
        ];
        for p in &cases {
            let err = validate(p).unwrap_err();
            assert_eq!(err.kind, ErrorKind::LocalValidation, "{:?}", p);
        }
    }

    #[test]
    fn whitespace_counts_as_empty() {
        let err = validate(&ConnectionProfile::new("  ", "\t", "docs")).unwrap_err();
        assert!(err.message.contains("host, port"));
    }

    #[test]
    fn all_missing_named() {
        let err = validate(&ConnectionProfile::default()).unwrap_err();
        assert!(err.message.contains("host, port, core name"));
    }
}
