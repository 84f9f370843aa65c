use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};

use crate::error::{Result, SelectionError};

/// One parsed selection pattern, normalized to a `/`-separated path relative
/// to the selector root.
#[derive(Debug)]
pub(crate) struct Pattern {
    pub(crate) raw:     String,
    pub(crate) negated: bool,
    /// Leading segments free of wildcards; the walk starts here.
    pub(crate) base:    String,
    normalized:         String,
    matcher:            Option<GlobMatcher>,
}

impl Pattern {
    /// Parse one input line. Blank lines and `#` comments yield `None`.
    pub(crate) fn parse(raw: &str, root: &Path) -> Result<Option<Self>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let body = body.replace('\\', "/");
        let normalized = relativize(trimmed, &body, root)?;

        let segments: Vec<&str> = split(&normalized).collect();
        let literal_len = segments.iter().take_while(|s| !has_meta(s)).count();
        let base = segments[..literal_len].join("/");

        let matcher = if literal_len == segments.len() {
            None
        } else {
            let glob = GlobBuilder::new(&normalized)
                .literal_separator(true)
                .backslash_escape(false)
                .build()
                .map_err(|source| SelectionError::InvalidPattern {
                    pattern: trimmed.to_string(),
                    source,
                })?;
            Some(glob.compile_matcher())
        };

        Ok(Some(Self {
            raw: trimmed.to_string(),
            negated,
            base,
            normalized,
            matcher,
        }))
    }

    pub(crate) fn is_literal(&self) -> bool { self.matcher.is_none() }

    pub(crate) fn matches(&self, relative: &str) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.is_match(relative),
            None => relative == self.normalized,
        }
    }

    /// True if `relative` or one of its ancestor directories matches.
    pub(crate) fn covers(&self, relative: &str) -> bool {
        if self.normalized.is_empty() {
            return true;
        }
        let mut prefix = String::with_capacity(relative.len());
        for segment in split(relative) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            if self.matches(&prefix) {
                return true;
            }
        }
        false
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> { path.split('/').filter(|s| !s.is_empty()) }

fn has_meta(segment: &str) -> bool { segment.contains(['*', '?', '[', '{']) }

/// Turn a pattern body into a normalized path relative to `root`.
///
/// `..` segments are resolved lexically and may not climb above the root.
fn relativize(raw: &str, body: &str, root: &Path) -> Result<String> {
    let escapes = |path: PathBuf| SelectionError::EscapesRoot {
        pattern: raw.to_string(),
        path,
        root: root.to_path_buf(),
    };

    if Path::new(body).is_absolute() {
        let absolute = normalize_absolute(Path::new(body));
        if let Ok(rest) = absolute.strip_prefix(root) {
            return Ok(to_slash(rest));
        }

        // The root is canonical; the pattern's literal prefix may not be.
        let mut literal = PathBuf::new();
        let mut rest: Vec<String> = Vec::new();
        for component in Path::new(body).components() {
            let text = component.as_os_str().to_string_lossy();
            if rest.is_empty() && !has_meta(&text) {
                literal.push(component.as_os_str());
            } else {
                rest.push(text.into_owned());
            }
        }
        if let Ok(canonical) = literal.canonicalize()
            && let Ok(inside) = canonical.strip_prefix(root)
        {
            let mut parts = vec![to_slash(inside)];
            parts.extend(rest);
            return normalize_relative(&parts.join("/")).ok_or_else(|| escapes(absolute));
        }
        return Err(escapes(absolute));
    }

    normalize_relative(body).ok_or_else(|| escapes(root.join(body)))
}

fn normalize_relative(body: &str) -> Option<String> {
    let mut stack: Vec<&str> = Vec::new();
    for segment in split(body) {
        match segment {
            "." => {}
            ".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }
    Some(stack.join("/"))
}

fn normalize_absolute(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
