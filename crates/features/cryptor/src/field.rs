use crate::error::CryptorError;
use crate::permutation::{Permutation, permutations_for};
use std::fmt;
use std::sync::Arc;

/// A logical dotted path declared sensitive, with its permutations computed once.
///
/// Cloning is cheap: the path and the permutation list are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct FieldSpec {
    path: Arc<str>,
    permutations: Arc<[Permutation]>,
}

impl FieldSpec {
    /// # Errors
    /// Returns [`CryptorError::InvalidFieldPath`] if the path is not a valid dotted path.
    pub fn new(path: impl AsRef<str>) -> Result<Self, CryptorError> {
        let path = path.as_ref();
        let permutations = permutations_for(path)?;
        Ok(Self { path: Arc::from(path), permutations: permutations.into() })
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Candidate storage locations, nested-first.
    #[must_use]
    pub fn permutations(&self) -> &[Permutation] {
        &self.permutations
    }

    /// Whether writing a whole value at the dotted `path` replaces this field: `path` names the
    /// field itself or one of its ancestors.
    #[must_use]
    pub fn is_overwritten_at(&self, path: &str) -> bool {
        self.path
            .strip_prefix(path)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    }

    /// The top-level storage key for each permutation, deduplicated in order.
    #[must_use]
    pub fn top_level_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for key in self.permutations.iter().filter_map(|p| p.first()) {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("path", &self.path)
            .field("permutations", &self.permutations.len())
            .finish()
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precomputes_permutations() {
        let spec = FieldSpec::new("deeply.nested.secret").unwrap();
        assert_eq!(spec.path(), "deeply.nested.secret");
        assert_eq!(spec.permutations().len(), 4);
        assert_eq!(spec.top_level_keys(), ["deeply", "deeply.nested", "deeply.nested.secret"]);
    }

    #[test]
    fn test_overwritten_at_self_and_ancestors() {
        let spec = FieldSpec::new("deeply.nested.secret").unwrap();
        assert!(spec.is_overwritten_at("deeply.nested.secret"));
        assert!(spec.is_overwritten_at("deeply.nested"));
        assert!(spec.is_overwritten_at("deeply"));
        assert!(!spec.is_overwritten_at("deep"));
        assert!(!spec.is_overwritten_at("deeply.nested.secret.x"));
        assert!(!spec.is_overwritten_at("plain"));
    }

    #[test]
    fn test_debug_shows_count() {
        let spec = FieldSpec::new("a.b").unwrap();
        assert_eq!(format!("{spec:?}"), "FieldSpec { path: \"a.b\", permutations: 2 }");
    }
}
