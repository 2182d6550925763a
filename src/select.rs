//! Dot-path query selector, shared between the tag layer and the typed layer.
//!
//! Path syntax: segments separated by `.`. A leading `.` anchors the path to the top level
//! (roots); a double `.` anywhere means "descendant" (any depth below the current position); a
//! single `.` means "direct child". A path with a leading non-`.` character matches its first
//! segment at any depth in the forest. `.HEAD.GEDC` selects the `GEDC` child of a top-level
//! `HEAD`; `HEAD..VERS` selects any `VERS` descendant of any `HEAD` found at any depth.
//!
//! The traversal algorithm is written once, against the [`NodeStore`] trait, and reused
//! unmodified by [`crate::tag::Forest`] (where "children" is a flat, ordered list) and the
//! typed-layer dataset (where "children" is grouped by type but still traversed as one ordered
//! sequence) — this is exactly what the design spec asks for in §4.6.

/// How a path segment relates to the position(s) matched by the previous segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Relation {
    /// The very first segment of an anchored path: must be a root.
    Root,
    /// The very first segment of an unanchored path: matches at any depth.
    AnyDepth,
    /// A direct child of the previous position.
    Child,
    /// Any descendant (not necessarily direct) of the previous position.
    Descendant,
}

/// A store of nodes addressable by an opaque id, with a string key used for path matching (a
/// tag in the tag layer, a type URI or tag in the typed layer) and an ordered list of children.
pub trait NodeStore {
    /// The opaque per-node identifier (an index into the owning arena).
    type Id: Copy + Eq;

    /// The string path segments are matched against for this node.
    fn key(&self, id: Self::Id) -> &str;

    /// This node's children, in document order.
    fn children(&self, id: Self::Id) -> Vec<Self::Id>;

    /// The forest's top-level nodes, in document order.
    fn roots(&self) -> Vec<Self::Id>;
}

/// A parsed dot-path, ready to be evaluated against any [`NodeStore`].
pub struct Selector {
    segments: Vec<(Relation, String)>,
}

impl Selector {
    /// Parses a dot-path. An empty path yields a selector matching nothing.
    #[must_use]
    pub fn parse(path: &str) -> Selector {
        let mut chars = path.chars().peekable();
        let mut segments = Vec::new();
        let mut first = true;

        loop {
            let mut dots = 0usize;
            while chars.peek() == Some(&'.') {
                chars.next();
                dots += 1;
            }

            let mut tag = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                tag.push(c);
                chars.next();
            }

            if tag.is_empty() {
                break;
            }

            let relation = if first {
                if dots >= 1 {
                    Relation::Root
                } else {
                    Relation::AnyDepth
                }
            } else if dots >= 2 {
                Relation::Descendant
            } else {
                Relation::Child
            };

            segments.push((relation, tag));
            first = false;

            if chars.peek().is_none() {
                break;
            }
        }

        Selector { segments }
    }

    /// Evaluates the path against `store`, returning every matching node in document order.
    pub fn select<S: NodeStore>(&self, store: &S) -> Vec<S::Id> {
        let Some((first_relation, first_tag)) = self.segments.first() else {
            return Vec::new();
        };

        let mut current: Vec<S::Id> = match first_relation {
            Relation::Root => store
                .roots()
                .into_iter()
                .filter(|&id| store.key(id) == first_tag)
                .collect(),
            Relation::AnyDepth => all_nodes(store)
                .into_iter()
                .filter(|&id| store.key(id) == first_tag)
                .collect(),
            Relation::Child | Relation::Descendant => unreachable!("first segment is always Root or AnyDepth"),
        };

        for (relation, tag) in &self.segments[1..] {
            current = match relation {
                Relation::Child => current
                    .iter()
                    .flat_map(|&id| store.children(id))
                    .filter(|&cid| store.key(cid) == tag)
                    .collect(),
                Relation::Descendant => current
                    .iter()
                    .flat_map(|&id| descendants(store, id))
                    .filter(|&cid| store.key(cid) == tag)
                    .collect(),
                Relation::Root | Relation::AnyDepth => unreachable!("only the first segment is Root/AnyDepth"),
            };
        }

        current
    }

    /// Evaluates the path and returns only the first match, in document order.
    pub fn select_one<S: NodeStore>(&self, store: &S) -> Option<S::Id> {
        self.select(store).into_iter().next()
    }
}

/// Every node in the forest, in document order (pre-order over each root's subtree).
fn all_nodes<S: NodeStore>(store: &S) -> Vec<S::Id> {
    let mut out = Vec::new();
    for root in store.roots() {
        out.push(root);
        out.extend(descendants(store, root));
    }
    out
}

/// Every descendant of `id` (not including `id` itself), in document order.
fn descendants<S: NodeStore>(store: &S, id: S::Id) -> Vec<S::Id> {
    fn walk<S: NodeStore>(store: &S, id: S::Id, out: &mut Vec<S::Id>) {
        for child in store.children(id) {
            out.push(child);
            walk(store, child, out);
        }
    }
    let mut out = Vec::new();
    walk(store, id, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tree {
        keys: Vec<&'static str>,
        children: Vec<Vec<usize>>,
        roots: Vec<usize>,
    }

    impl NodeStore for Tree {
        type Id = usize;
        fn key(&self, id: usize) -> &str {
            self.keys[id]
        }
        fn children(&self, id: usize) -> Vec<usize> {
            self.children[id].clone()
        }
        fn roots(&self) -> Vec<usize> {
            self.roots.clone()
        }
    }

    fn sample() -> Tree {
        // 0 HEAD
        //   1 GEDC
        //     2 VERS
        // 3 INDI
        //   4 NAME
        Tree {
            keys: vec!["HEAD", "GEDC", "VERS", "INDI", "NAME"],
            children: vec![vec![1], vec![2], vec![], vec![4], vec![]],
            roots: vec![0, 3],
        }
    }

    #[test]
    fn anchored_child_path() {
        let tree = sample();
        let sel = Selector::parse(".HEAD.GEDC");
        assert_eq!(sel.select(&tree), vec![1]);
    }

    #[test]
    fn descendant_path() {
        let tree = sample();
        let sel = Selector::parse("HEAD..VERS");
        assert_eq!(sel.select(&tree), vec![2]);
    }

    #[test]
    fn unanchored_matches_any_depth() {
        let tree = sample();
        let sel = Selector::parse("VERS");
        assert_eq!(sel.select(&tree), vec![2]);
    }
}
