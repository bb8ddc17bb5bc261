//! # Path Permutations
//!
//! Storage keys may legally contain dots, so a logical path such as `a.b.c` can live at
//! `{a: {b: {c}}}`, `{"a.b": {c}}`, `{a: {"b.c"}}` or `{"a.b.c"}`. A path of `N` dot-separated
//! tokens has `N - 1` boundaries, each either kept (a nesting level) or merged (a literal dot),
//! giving `2^(N-1)` permutations.
//!
//! Boundaries are enumerated as a binary counter whose most significant bit is the first
//! boundary. Counter `0` keeps every boundary (fully nested) and the last value merges them all
//! (one literal key), so the order is deterministic and nested-first.

use crate::error::CryptorError;

/// One way of splitting a logical path into storage-level keys.
pub type Permutation = Vec<String>;

/// Upper bound on dot-separated tokens in a sensitive path (`2^15` permutations).
pub const MAX_PATH_TOKENS: usize = 16;

/// Produces every segment grouping of `path`, fully nested first and single literal key last.
///
/// # Errors
/// Returns [`CryptorError::InvalidFieldPath`] for an empty path, empty tokens (leading, trailing
/// or doubled dots), tokens starting with `$`, NUL characters, or more than
/// [`MAX_PATH_TOKENS`] tokens.
///
/// ### Example
/// ```rust
/// use fcrypt_cryptor::permutations_for;
///
/// let permutations = permutations_for("a.b.c").unwrap();
/// assert_eq!(permutations.first().unwrap(), &["a", "b", "c"]);
/// assert_eq!(permutations.last().unwrap(), &["a.b.c"]);
/// assert_eq!(permutations.len(), 4);
/// ```
pub fn permutations_for(path: &str) -> Result<Vec<Permutation>, CryptorError> {
    let tokens = tokenize(path)?;
    let boundaries = tokens.len() - 1;

    let permutations = (0..1usize << boundaries)
        .map(|counter| {
            let mut segments = Vec::with_capacity(tokens.len());
            let mut current = tokens[0].to_owned();
            for (index, token) in tokens.iter().enumerate().skip(1) {
                let merged = counter & (1 << (boundaries - index)) != 0;
                if merged {
                    current.push('.');
                    current.push_str(token);
                } else {
                    segments.push(std::mem::replace(&mut current, (*token).to_owned()));
                }
            }
            segments.push(current);
            segments
        })
        .collect();

    Ok(permutations)
}

fn tokenize(path: &str) -> Result<Vec<&str>, CryptorError> {
    if path.is_empty() {
        return Err(CryptorError::invalid_path(path, "path is empty"));
    }
    if path.contains('\0') {
        return Err(CryptorError::invalid_path(path, "path contains a NUL character"));
    }

    let tokens: Vec<&str> = path.split('.').collect();
    if tokens.iter().any(|token| token.is_empty()) {
        return Err(CryptorError::invalid_path(path, "path has an empty segment"));
    }
    if tokens.iter().any(|token| token.starts_with('$')) {
        return Err(CryptorError::invalid_path(path, "segments must not start with `$`"));
    }
    if tokens.len() > MAX_PATH_TOKENS {
        return Err(CryptorError::invalid_path(
            path,
            format!("path has more than {MAX_PATH_TOKENS} segments"),
        ));
    }
    Ok(tokens)
}
