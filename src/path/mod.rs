pub mod glob;
pub mod state;

pub use glob::Pattern;
pub use state::PathState;

/// Backend-agnostic path algebra.
///
/// Implementors supply the wrapped [`PathState`] and a factory that rewraps a
/// new state with the receiver's backend identity. Every edit below goes
/// through [`PurePath::create_new`], so a bucket binding or root handle
/// survives any chain of `with_name` / `with_ext` / `join` calls.
pub trait PurePath: Sized {
    fn state(&self) -> &PathState;

    /// Wrap `state` in a path value bound to the same backend as `self`.
    fn create_new(&self, state: PathState) -> Self;

    fn anchor(&self) -> &str {
        self.state().anchor()
    }

    fn parents(&self) -> &[String] {
        self.state().parents()
    }

    fn name(&self) -> &str {
        self.state().name()
    }

    fn ext(&self) -> &str {
        self.state().ext()
    }

    fn stem(&self) -> &str {
        self.state().stem()
    }

    fn separator(&self) -> char {
        self.state().separator()
    }

    /// Rendered form, valid input to the parser for the same separator.
    fn full_path(&self) -> String {
        self.state().full_path()
    }

    fn with_name(&self, name: &str) -> Self {
        self.create_new(self.state().with_name(name))
    }

    /// Swap the extension, appending one when the leaf has none.
    fn with_ext(&self, ext: &str) -> Self {
        self.create_new(self.state().with_ext(ext))
    }

    /// `p.join([a]).join([b])` and `p.join([a, b])` yield equal states.
    fn join<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.create_new(self.state().join(segments))
    }

    fn parent(&self) -> Self {
        self.create_new(self.state().parent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Minimal backend: the identity is an `Arc` whose pointer must survive
    /// every edit.
    #[derive(Debug, Clone)]
    struct TaggedPath {
        state: PathState,
        tag: Arc<String>,
    }

    impl PurePath for TaggedPath {
        fn state(&self) -> &PathState {
            &self.state
        }

        fn create_new(&self, state: PathState) -> Self {
            TaggedPath {
                state,
                tag: Arc::clone(&self.tag),
            }
        }
    }

    fn tagged(raw: &str) -> TaggedPath {
        TaggedPath {
            state: PathState::parse('/', raw),
            tag: Arc::new("bucket".to_string()),
        }
    }

    #[test]
    fn test_identity_survives_chain() {
        let root = tagged("gs://bucket/data");
        let derived = root
            .join(["2024", "01"])
            .with_name("events")
            .with_ext("json")
            .join(["nested/leaf.csv"])
            .with_ext(".parquet")
            .parent();

        assert!(Arc::ptr_eq(&root.tag, &derived.tag));
        assert_eq!(derived.anchor(), "gs://");
        assert_eq!(derived.full_path(), "gs://bucket/data/2024/events.json/nested");
    }

    #[test]
    fn test_rename_twice_leaves_originals_alone() {
        let original = tagged("first/second/third");
        let first = original.with_name("one");
        let second = first.with_name("two");

        assert_eq!(original.name(), "third");
        assert_eq!(first.name(), "one");
        assert_eq!(second.name(), "two");
        for p in [&original, &first, &second] {
            assert_eq!(p.parents(), &["first", "second"]);
        }
    }

    #[test]
    fn test_with_name_same_name_is_equal() {
        let p = tagged("/x/y.tar.gz");
        assert_eq!(p.with_name(p.name()).state(), p.state());
    }

    #[test]
    fn test_with_ext_on_bare_leaf() {
        let p = tagged("a/b");
        let q = p.with_ext("txt");
        assert_eq!(q.name(), "b.txt");
        assert_eq!(q.ext(), "txt");
        assert_eq!(q.stem(), "b");
    }

    #[test]
    fn test_join_associative_through_trait() {
        let p = tagged("a/b/c");
        assert_eq!(
            p.join(["d"]).join(["e"]).state(),
            p.join(["d", "e"]).state()
        );
        assert_eq!(p.join(["d", "e"]).full_path(), "a/b/c/d/e");
    }
}
