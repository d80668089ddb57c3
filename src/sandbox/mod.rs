//! Path sandbox: confines caller-supplied paths to one storage root.
//!
//! Resolution is purely lexical; no filesystem access happens here. Every
//! file operation in the crate routes its paths through [`Sandbox::resolve`]
//! or [`Sandbox::resolve_absolute`] before touching the disk.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("path {path:?} is not inside of {root:?}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("home directory is not available")]
    NoHome,
}

#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: clean(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a caller-supplied path to its relative form inside the root.
    ///
    /// Steps: join onto the root, substitute a leading `~` with the home
    /// directory, expand `$VAR`/`${VAR}` references, normalize lexically,
    /// then relativize against the root. The empty request resolves to the
    /// root itself (empty relative path). Anything that would land outside
    /// the root fails with [`PathError::OutsideRoot`].
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, PathError> {
        // A leading separator must not replace the root on join.
        let requested = requested.trim_start_matches('/');
        let mut joined = self
            .root
            .join(requested)
            .to_string_lossy()
            .into_owned();

        if let Some(rest) = joined.strip_prefix('~') {
            let home = std::env::var("HOME").map_err(|_| PathError::NoHome)?;
            joined = format!("{}/{}", home, rest.trim_start_matches('/'));
        }

        let expanded = expand_env(&joined);
        let cleaned = clean(Path::new(&expanded));

        match relative(&self.root, &cleaned) {
            Some(rel) if !rel.starts_with("..") => Ok(rel),
            _ => Err(PathError::OutsideRoot {
                path: cleaned,
                root: self.root.clone(),
            }),
        }
    }

    /// Resolve to an absolute filesystem path rooted at the sandbox.
    pub fn resolve_absolute(&self, requested: &str) -> Result<PathBuf, PathError> {
        Ok(self.root.join(self.resolve(requested)?))
    }
}

/// Lexical normalization: collapse `.` and `..`, drop redundant
/// separators. A `..` at the root of an absolute path is clamped away.
fn clean(path: &Path) -> PathBuf {
    let absolute = path.has_root();
    let mut stack: Vec<OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => match stack.last() {
                Some(top) if top.as_os_str() != ".." => {
                    stack.pop();
                }
                _ => {
                    if !absolute {
                        stack.push(OsString::from(".."));
                    }
                }
            },
            Component::Normal(part) => stack.push(part.to_os_string()),
        }
    }

    let mut out = PathBuf::new();
    if absolute {
        out.push("/");
    }
    for part in stack {
        out.push(part);
    }
    out
}

/// Lexical relative path from `base` to `target`; both must already be
/// cleaned. `None` when no purely lexical relation exists (mixed
/// absoluteness, or `..` remaining in the base).
fn relative(base: &Path, target: &Path) -> Option<PathBuf> {
    if base.has_root() != target.has_root() {
        return None;
    }

    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();

    let mut shared = 0;
    while shared < base_parts.len()
        && shared < target_parts.len()
        && base_parts[shared] == target_parts[shared]
    {
        shared += 1;
    }

    let mut out = PathBuf::new();
    for component in &base_parts[shared..] {
        if matches!(component, Component::ParentDir) {
            return None;
        }
        out.push("..");
    }
    for component in &target_parts[shared..] {
        out.push(component.as_os_str());
    }
    Some(out)
}

/// Expand `$NAME` and `${NAME}` references from the process environment.
/// Unset variables expand to the empty string; a `$` not followed by a
/// variable name is kept literally.
fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut ii = 0;

    while ii < input.len() {
        let ch = input[ii..].chars().next().unwrap_or('$');
        if ch != '$' {
            out.push(ch);
            ii += ch.len_utf8();
            continue;
        }

        let rest = &input[ii + 1..];
        if let Some(stripped) = rest.strip_prefix('{') {
            if let Some(end) = stripped.find('}') {
                let name = &stripped[..end];
                out.push_str(&std::env::var(name).unwrap_or_default());
                ii += name.len() + 3;
                continue;
            }
        }

        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if name_len == 0 {
            out.push('$');
            ii += 1;
            continue;
        }
        out.push_str(&std::env::var(&rest[..name_len]).unwrap_or_default());
        ii += name_len + 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Sandbox {
        Sandbox::new("/srv/daybook/uploads")
    }

    #[test]
    fn empty_request_resolves_to_root() {
        let rel = sandbox().resolve("").unwrap();
        assert!(rel.as_os_str().is_empty());
        assert_eq!(
            sandbox().resolve_absolute("").unwrap(),
            PathBuf::from("/srv/daybook/uploads")
        );
    }

    #[test]
    fn plain_subpath_resolves() {
        let rel = sandbox().resolve("photos/2024/a.jpg").unwrap();
        assert_eq!(rel, PathBuf::from("photos/2024/a.jpg"));
    }

    #[test]
    fn leading_separator_does_not_replace_the_root() {
        let rel = sandbox().resolve("/photos").unwrap();
        assert_eq!(rel, PathBuf::from("photos"));
    }

    #[test]
    fn traversal_is_rejected() {
        let err = sandbox().resolve("../../etc/passwd").unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }));
    }

    #[test]
    fn dotdot_inside_the_root_is_collapsed() {
        let rel = sandbox().resolve("photos/../docs/./a.txt").unwrap();
        assert_eq!(rel, PathBuf::from("docs/a.txt"));
    }

    #[test]
    fn resolved_path_never_keeps_a_parent_prefix() {
        for requested in ["a/../..", "..", "a/../../b", "../uploads"] {
            match sandbox().resolve(requested) {
                Ok(rel) => assert!(!rel.starts_with(".."), "leaked {:?}", rel),
                Err(PathError::OutsideRoot { .. }) => {}
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
    }

    #[test]
    fn env_expansion_cannot_smuggle_an_escape() {
        std::env::set_var("DAYBOOK_TEST_ESCAPE", "../../etc");
        let err = sandbox().resolve("$DAYBOOK_TEST_ESCAPE/passwd").unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }));
    }

    #[test]
    fn unset_variables_expand_to_nothing() {
        std::env::remove_var("DAYBOOK_TEST_UNSET");
        let rel = sandbox().resolve("photos/$DAYBOOK_TEST_UNSET").unwrap();
        assert_eq!(rel, PathBuf::from("photos"));
    }

    #[test]
    fn clean_matches_lexical_rules() {
        assert_eq!(clean(Path::new("/a/b/../c//./d")), PathBuf::from("/a/c/d"));
        assert_eq!(clean(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(clean(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn relative_escapes_are_visible() {
        let rel = relative(Path::new("/srv/files"), Path::new("/etc/passwd")).unwrap();
        assert_eq!(rel, PathBuf::from("../../etc/passwd"));
        assert!(relative(Path::new("/srv"), Path::new("relative")).is_none());
    }

    #[test]
    fn expand_env_handles_braced_and_bare_names() {
        std::env::set_var("DAYBOOK_TEST_VAL", "v");
        assert_eq!(expand_env("a/$DAYBOOK_TEST_VAL/b"), "a/v/b");
        assert_eq!(expand_env("a/${DAYBOOK_TEST_VAL}b"), "a/vb");
        assert_eq!(expand_env("100$"), "100$");
    }
}
