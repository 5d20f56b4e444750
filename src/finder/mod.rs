//! Finder: an immutable, composable description of which accessibility nodes
//! to locate.
//!
//! ## Example
//!
//! ```rust
//! use uiauto_sidecar::finder::{Finder, Role};
//!
//! let window = Finder::new().has_class("BrowserFrame").role(Role::Window);
//! let button = Finder::new()
//!     .has_class("NewTabButton")
//!     .role(Role::Button)
//!     .visible()
//!     .first()
//!     .ancestor(&window);
//!
//! assert!(button.validate().is_ok());
//! ```
//!
//! Every refinement returns a new Finder and leaves the receiver untouched, so a
//! base Finder can be shared between flows.

use regex::Regex;
use std::fmt;

use crate::error::{Result, UiError};
use crate::tree::NodeInfo;

/// Generates a closed enum with a camelCase tag per variant, lookup tables,
/// the derived CONSTANT_CASE wire spelling and serde impls over the tag.
macro_rules! tag_table {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $tag:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $tag,)+
                }
            }

            pub fn from_tag(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn to_wire(self) -> String {
                $crate::finder::case::to_const_case(self.as_str())
            }

            /// Only the canonical CONSTANT_CASE spelling is accepted.
            pub fn from_wire(wire: &str) -> Option<Self> {
                let value = Self::from_tag(&$crate::finder::case::to_camel_case(wire))?;
                (value.to_wire() == wire).then_some(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let tag = String::deserialize(deserializer)?;
                Self::from_tag(&tag).ok_or_else(|| {
                    serde::de::Error::custom(format!("unknown {} `{}`", stringify!($name), tag))
                })
            }
        }
    };
}

pub mod case;
pub mod role;
pub mod state;

pub use case::{to_camel_case, to_const_case};
pub use role::Role;
pub use state::{Flag, StateKind};

/// Deepest ancestor chain accepted from untrusted input.
pub const MAX_ANCESTOR_DEPTH: usize = 32;

/// One constraint within a Finder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    HasClass(String),
    Name(String),
    /// Pattern source; compiled when the Finder is validated.
    NameRegex(String),
    NameStartingWith(String),
    NameContaining(String),
    Role(Role),
    State(StateKind, bool),
    Flag(Flag),
    Nth(usize),
    First,
    Root,
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::HasClass(c) => write!(f, "hasClass: {:?}", c),
            Atom::Name(n) => write!(f, "name: {:?}", n),
            Atom::NameRegex(p) => write!(f, "name: /{}/", p.replace('/', "\\/")),
            Atom::NameStartingWith(n) => write!(f, "nameStartingWith: {:?}", n),
            Atom::NameContaining(n) => write!(f, "nameContaining: {:?}", n),
            Atom::Role(r) => write!(f, "role: {}", r),
            Atom::State(k, v) => write!(f, "state: {{{}: {}}}", k, v),
            Atom::Flag(flag) => write!(f, "{}", flag),
            Atom::Nth(n) => write!(f, "nth: {}", n),
            Atom::First => f.write_str("first"),
            Atom::Root => f.write_str("root"),
        }
    }
}

/// Immutable node predicate: ordered atoms plus at most one ancestor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Finder {
    atoms: Vec<Atom>,
    ancestor: Option<Box<Finder>>,
}

macro_rules! flag_methods {
    ($($method:ident => $flag:ident,)+) => {
        $(
            #[doc = concat!("Adds the `", stringify!($method), "` flag atom.")]
            pub fn $method(&self) -> Finder {
                self.with(Atom::Flag(Flag::$flag))
            }
        )+
    };
}

impl Finder {
    /// An unconstrained Finder; matches every node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finder for the tree root. Adding anything else makes it invalid.
    pub fn root() -> Self {
        Self::new().with(Atom::Root)
    }

    /// Validating constructor used for atom lists coming from outside the
    /// builder (wire form, fixtures).
    pub fn from_atoms(atoms: Vec<Atom>, ancestor: Option<Finder>) -> Result<Self> {
        let finder = Self {
            atoms,
            ancestor: ancestor.map(Box::new),
        };
        finder.validate()?;
        Ok(finder)
    }

    /// Returns a copy with `atom` appended.
    pub fn with(&self, atom: Atom) -> Finder {
        let mut copy = self.clone();
        copy.atoms.push(atom);
        copy
    }

    pub fn has_class(&self, class: impl Into<String>) -> Finder {
        self.with(Atom::HasClass(class.into()))
    }

    pub fn name(&self, name: impl Into<String>) -> Finder {
        self.with(Atom::Name(name.into()))
    }

    pub fn name_regex(&self, pattern: impl Into<String>) -> Finder {
        self.with(Atom::NameRegex(pattern.into()))
    }

    pub fn name_starting_with(&self, prefix: impl Into<String>) -> Finder {
        self.with(Atom::NameStartingWith(prefix.into()))
    }

    pub fn name_containing(&self, part: impl Into<String>) -> Finder {
        self.with(Atom::NameContaining(part.into()))
    }

    pub fn role(&self, role: Role) -> Finder {
        self.with(Atom::Role(role))
    }

    pub fn state(&self, kind: StateKind, value: bool) -> Finder {
        self.with(Atom::State(kind, value))
    }

    pub fn nth(&self, n: usize) -> Finder {
        self.with(Atom::Nth(n))
    }

    pub fn first(&self) -> Finder {
        self.with(Atom::First)
    }

    /// Returns a copy scoped to descendants of `ancestor`, replacing any
    /// previous ancestor.
    pub fn ancestor(&self, ancestor: &Finder) -> Finder {
        let mut copy = self.clone();
        copy.ancestor = Some(Box::new(ancestor.clone()));
        copy
    }

    /// Returns a copy of the whole ancestor chain with its deepest link scoped
    /// to `ancestor`.
    pub fn final_ancestor(&self, ancestor: &Finder) -> Finder {
        let mut copy = self.clone();
        copy.ancestor = Some(Box::new(match self.ancestor.as_deref() {
            Some(inner) => inner.final_ancestor(ancestor),
            None => ancestor.clone(),
        }));
        copy
    }

    flag_methods! {
        autofill_available => AutofillAvailable,
        collapsed => Collapsed,
        default_state => Default,
        editable => Editable,
        expanded => Expanded,
        focusable => Focusable,
        focused => Focused,
        horizontal => Horizontal,
        hovered => Hovered,
        ignored => Ignored,
        invisible => Invisible,
        linked => Linked,
        multiline => Multiline,
        multiselectable => Multiselectable,
        offscreen => Offscreen,
        onscreen => Onscreen,
        protected => Protected,
        required => Required,
        richly_editable => RichlyEditable,
        vertical => Vertical,
        visible => Visible,
        visited => Visited,
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn ancestor_finder(&self) -> Option<&Finder> {
        self.ancestor.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.atoms.contains(&Atom::Root)
    }

    /// Length of the ancestor chain.
    pub fn depth(&self) -> usize {
        self.ancestor.as_deref().map_or(0, |a| 1 + a.depth())
    }

    /// Stable human-readable form used in error messages.
    pub fn pretty(&self) -> String {
        self.to_string()
    }

    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    /// Validates the Finder and compiles it into the form a tree adapter
    /// resolves.
    pub fn compile(&self) -> Result<Query> {
        if self.depth() > MAX_ANCESTOR_DEPTH {
            return Err(UiError::invalid_finder(format!(
                "ancestor chain deeper than {}",
                MAX_ANCESTOR_DEPTH
            ))
            .with_finder(&self.pretty()));
        }
        self.compile_inner()
    }

    fn compile_inner(&self) -> Result<Query> {
        let pretty = self.pretty();

        if self.is_root() {
            if self.atoms.len() > 1 || self.ancestor.is_some() {
                return Err(
                    UiError::invalid_finder("root must be the only atom").with_finder(&pretty)
                );
            }
            return Ok(Query {
                pretty,
                kind: QueryKind::Root,
            });
        }

        let ancestor = match self.ancestor.as_deref() {
            Some(a) => Some(Box::new(a.compile_inner().map_err(|e| {
                UiError::invalid_finder(format!("invalid ancestor: {}", e)).with_finder(&pretty)
            })?)),
            None => None,
        };

        let mut filters = Vec::with_capacity(self.atoms.len());
        let mut pick = Pick::All;
        for atom in &self.atoms {
            match atom {
                Atom::HasClass(c) => filters.push(Filter::Class(c.clone())),
                Atom::Name(n) => filters.push(Filter::Name(n.clone())),
                Atom::NameRegex(p) => {
                    let re = Regex::new(p).map_err(|e| {
                        UiError::invalid_finder(format!("bad name pattern /{}/: {}", p, e))
                            .with_finder(&pretty)
                    })?;
                    filters.push(Filter::NameRegex(re));
                }
                Atom::NameStartingWith(n) => filters.push(Filter::NamePrefix(n.clone())),
                Atom::NameContaining(n) => filters.push(Filter::NameContains(n.clone())),
                Atom::Role(r) => filters.push(Filter::Role(*r)),
                Atom::State(k, v) => filters.push(Filter::State(*k, *v)),
                Atom::Flag(flag) => {
                    let (k, v) = flag.state();
                    filters.push(Filter::State(k, v));
                }
                // Last selector wins.
                Atom::Nth(n) => pick = Pick::Nth(*n),
                Atom::First => pick = Pick::Nth(0),
                Atom::Root => {}
            }
        }

        Ok(Query {
            pretty,
            kind: QueryKind::Filtered {
                filters,
                pick,
                ancestor,
            },
        })
    }
}

impl fmt::Display for Finder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut sep = "";
        for atom in &self.atoms {
            write!(f, "{}{}", sep, atom)?;
            sep = ", ";
        }
        if let Some(ancestor) = &self.ancestor {
            write!(f, "{}ancestor: {}", sep, ancestor)?;
        }
        f.write_str("}")
    }
}

/// Which of the filtered candidates a query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    All,
    /// Index into the candidates in tree preorder. `First` is `Nth(0)`.
    Nth(usize),
}

#[derive(Debug, Clone)]
enum Filter {
    Class(String),
    Name(String),
    NameRegex(Regex),
    NamePrefix(String),
    NameContains(String),
    Role(Role),
    State(StateKind, bool),
}

impl Filter {
    fn accepts(&self, node: &NodeInfo) -> bool {
        match self {
            Filter::Class(c) => node.class_name == *c,
            Filter::Name(n) => node.name == *n,
            Filter::NameRegex(re) => re.is_match(&node.name),
            Filter::NamePrefix(p) => node.name.starts_with(p.as_str()),
            Filter::NameContains(p) => node.name.contains(p.as_str()),
            Filter::Role(r) => node.role == Some(*r),
            Filter::State(k, v) => node.state_flag(*k) == *v,
        }
    }
}

#[derive(Debug, Clone)]
enum QueryKind {
    Root,
    Filtered {
        filters: Vec<Filter>,
        pick: Pick,
        ancestor: Option<Box<Query>>,
    },
}

/// A validated, compiled Finder. This is what a tree adapter resolves.
#[derive(Debug, Clone)]
pub struct Query {
    pretty: String,
    kind: QueryKind,
}

impl Query {
    pub fn pretty(&self) -> &str {
        &self.pretty
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, QueryKind::Root)
    }

    pub fn ancestor(&self) -> Option<&Query> {
        match &self.kind {
            QueryKind::Filtered { ancestor, .. } => ancestor.as_deref(),
            QueryKind::Root => None,
        }
    }

    pub fn pick(&self) -> Pick {
        match &self.kind {
            QueryKind::Filtered { pick, .. } => *pick,
            QueryKind::Root => Pick::Nth(0),
        }
    }

    /// Whether a single node passes every attribute filter. Ancestor scoping
    /// and Nth/First selection are applied by the caller over the candidate
    /// sequence.
    pub fn accepts(&self, node: &NodeInfo) -> bool {
        match &self.kind {
            QueryKind::Root => false,
            QueryKind::Filtered { filters, .. } => filters.iter().all(|f| f.accepts(node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_builder_does_not_mutate_receiver() {
        let base = Finder::new().role(Role::Button);
        let named = base.name("OK");
        assert_eq!(base.atoms().len(), 1);
        assert_eq!(named.atoms().len(), 2);
        assert_eq!(base.pretty(), "{role: button}");
    }

    #[test]
    fn test_pretty_compound() {
        let finder = Finder::new()
            .has_class("myTextArea")
            .name("NAME")
            .role(Role::AlertDialog)
            .nth(2)
            .focused()
            .required()
            .state(StateKind::Default, false);
        assert_eq!(
            finder.pretty(),
            "{hasClass: \"myTextArea\", name: \"NAME\", role: alertDialog, nth: 2, focused, required, state: {default: false}}"
        );

        let direct = Finder::from_atoms(finder.atoms().to_vec(), None).unwrap();
        assert_eq!(direct.pretty(), finder.pretty());
    }

    #[test]
    fn test_pretty_with_ancestor_and_regex() {
        let finder = Finder::new()
            .name_regex("a/b")
            .ancestor(&Finder::new().role(Role::Window));
        assert_eq!(finder.pretty(), "{name: /a\\/b/, ancestor: {role: window}}");
    }

    #[test]
    fn test_root_exclusivity() {
        assert!(Finder::root().validate().is_ok());

        let err = Finder::from_atoms(vec![Atom::Root, Atom::Name("NAME".into())], None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFinder);

        let err = Finder::root().name("NAME").validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFinder);
        assert_eq!(err.finder(), Some("{root, name: \"NAME\"}"));

        let err = Finder::root().ancestor(&Finder::new()).validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFinder);
    }

    #[test]
    fn test_bad_regex_is_invalid_finder() {
        let err = Finder::new().name_regex("(unclosed").validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFinder);
    }

    #[test]
    fn test_invalid_ancestor_is_invalid_finder() {
        let bad = Finder::root().role(Role::Window);
        let err = Finder::new().role(Role::Button).ancestor(&bad).validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFinder);
        assert!(err.to_string().contains("invalid ancestor"));
    }

    #[test]
    fn test_last_selector_wins() {
        let q = Finder::new().nth(3).first().compile().unwrap();
        assert_eq!(q.pick(), Pick::Nth(0));
        let q = Finder::new().first().nth(3).compile().unwrap();
        assert_eq!(q.pick(), Pick::Nth(3));
        let q = Finder::new().role(Role::Tab).compile().unwrap();
        assert_eq!(q.pick(), Pick::All);
    }

    #[test]
    fn test_final_ancestor_scopes_deepest_link() {
        let scope = Finder::new().role(Role::Dialog);
        let finder = Finder::new()
            .role(Role::Button)
            .ancestor(&Finder::new().role(Role::Group));
        let scoped = finder.final_ancestor(&scope);
        assert_eq!(scoped.depth(), 2);
        assert_eq!(
            scoped.pretty(),
            "{role: button, ancestor: {role: group, ancestor: {role: dialog}}}"
        );
        assert_eq!(finder.depth(), 1);
    }

    #[test]
    fn test_ancestor_depth_is_bounded() {
        let mut finder = Finder::new();
        for _ in 0..=MAX_ANCESTOR_DEPTH {
            finder = Finder::new().role(Role::Group).ancestor(&finder);
        }
        let err = finder.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFinder);
    }
}
