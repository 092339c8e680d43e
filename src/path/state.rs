use std::fmt;

/// Marker that ends a URI-scheme anchor.
const SCHEME_MARKER: &str = "://";

/// Structural form of a location: anchor, parent segments, leaf name.
///
/// A `PathState` is never edited in place. Every `with_*` method returns a new
/// value and leaves the receiver untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathState {
    /// `""` (relative), the separator (absolute) or `scheme://`
    anchor: String,
    /// Segments between the anchor and the leaf, root first
    parents: Vec<String>,
    /// Leaf segment, empty for an anchor-only path
    name: String,
    separator: char,
}

impl PathState {
    /// Parse a raw location. Never fails: input without recognizable markers
    /// becomes a relative path.
    pub fn parse(separator: char, raw: &str) -> Self {
        let (anchor, remainder) = split_anchor(separator, raw);

        let mut segments: Vec<String> = remainder
            .split(separator)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        let name = segments.pop().unwrap_or_default();

        PathState {
            anchor: anchor.to_string(),
            parents: segments,
            name,
            separator,
        }
    }

    /// Build a state from parts. Empty parent segments are dropped.
    pub fn new<I, S>(separator: char, anchor: &str, parents: I, name: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PathState {
            anchor: anchor.to_string(),
            parents: parents
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
            name: name.to_string(),
            separator,
        }
    }

    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Everything after the first `.` of the leaf, or `""`.
    pub fn ext(&self) -> &str {
        match self.name.split_once('.') {
            Some((_, ext)) => ext,
            None => "",
        }
    }

    /// The leaf up to its first `.`.
    pub fn stem(&self) -> &str {
        match self.name.split_once('.') {
            Some((stem, _)) => stem,
            None => &self.name,
        }
    }

    /// True when there is nothing after the anchor.
    pub fn is_anchor_only(&self) -> bool {
        self.parents.is_empty() && self.name.is_empty()
    }

    /// All non-empty segments after the anchor, leaf included.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.parents
            .iter()
            .map(String::as_str)
            .chain(Some(self.name.as_str()).filter(|n| !n.is_empty()))
    }

    pub fn with_name(&self, name: &str) -> Self {
        PathState {
            name: name.to_string(),
            ..self.clone()
        }
    }

    /// Replace everything after the stem with `.ext`. A leaf without an
    /// extension gets one appended, and an empty `ext` leaves a bare trailing
    /// dot (`archive.tar.gz` becomes `archive.`).
    pub fn with_ext(&self, ext: &str) -> Self {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        self.with_name(&format!("{}.{}", self.stem(), ext))
    }

    /// Append segments, each of which may contain separators.
    pub fn join<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added: Vec<String> = Vec::new();
        for segment in segments {
            added.extend(
                segment
                    .as_ref()
                    .split(self.separator)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
            );
        }

        let Some(name) = added.pop() else {
            return self.clone();
        };

        let mut parents = self.parents.clone();
        if !self.name.is_empty() {
            parents.push(self.name.clone());
        }
        parents.extend(added);

        PathState {
            anchor: self.anchor.clone(),
            parents,
            name,
            separator: self.separator,
        }
    }

    /// The containing location. An anchor-only path is its own parent.
    pub fn parent(&self) -> Self {
        if self.name.is_empty() && self.parents.is_empty() {
            return self.clone();
        }
        let mut parents = self.parents.clone();
        let name = if self.name.is_empty() {
            // trailing empty leaf: drop the last parent as well
            parents.pop();
            parents.pop().unwrap_or_default()
        } else {
            parents.pop().unwrap_or_default()
        };
        PathState {
            anchor: self.anchor.clone(),
            parents,
            name,
            separator: self.separator,
        }
    }

    /// `anchor` followed by the segments joined with the separator.
    pub fn full_path(&self) -> String {
        let mut out = self.anchor.clone();
        let mut first = true;
        for segment in self.segments() {
            if !first {
                out.push(self.separator);
            }
            out.push_str(segment);
            first = false;
        }
        out
    }
}

impl fmt::Display for PathState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

/// Split the anchor off `raw`, returning `(anchor, remainder)`.
fn split_anchor(separator: char, raw: &str) -> (&str, &str) {
    if let Some(pos) = raw.find(SCHEME_MARKER) {
        let scheme = &raw[..pos];
        let valid = !scheme.is_empty()
            && !scheme.contains([':', '/']);
        if valid {
            let end = pos + SCHEME_MARKER.len();
            return (&raw[..end], &raw[end..]);
        }
    }

    let mut cwd = String::from(".");
    cwd.push(separator);
    if let Some(rest) = raw.strip_prefix(cwd.as_str()) {
        return ("", rest);
    }

    if raw.starts_with(separator) {
        let len = separator.len_utf8();
        return (&raw[..len], &raw[len..]);
    }

    ("", raw)
}
