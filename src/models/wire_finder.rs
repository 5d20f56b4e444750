//! Wire form of a Finder: `{"node_withs": [...]}` where every entry is a
//! tagged union over the atom kinds. Roles, states and flags travel in their
//! CONSTANT_CASE spelling.
//!
//! ```json
//! {"node_withs": [
//!     {"has_class": "NewTabButton"},
//!     {"role": "BUTTON"},
//!     {"flag": "VISIBLE"},
//!     "first",
//!     {"ancestor": {"node_withs": [{"role": "WINDOW"}]}}
//! ]}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, UiError};
use crate::finder::{Atom, Finder, Flag, Role, StateKind, MAX_ANCESTOR_DEPTH};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireFinder {
    #[serde(default)]
    pub node_withs: Vec<NodeWith>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireState {
    pub state: String,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeWith {
    HasClass(String),
    Name(String),
    NameRegex(String),
    NameStartingWith(String),
    NameContaining(String),
    Role(String),
    State(WireState),
    Flag(String),
    Nth(u64),
    First,
    Root,
    Ancestor(Box<WireFinder>),
}

impl From<&Finder> for WireFinder {
    fn from(finder: &Finder) -> Self {
        let mut node_withs: Vec<NodeWith> = finder
            .atoms()
            .iter()
            .map(|atom| match atom {
                Atom::HasClass(c) => NodeWith::HasClass(c.clone()),
                Atom::Name(n) => NodeWith::Name(n.clone()),
                Atom::NameRegex(p) => NodeWith::NameRegex(p.clone()),
                Atom::NameStartingWith(n) => NodeWith::NameStartingWith(n.clone()),
                Atom::NameContaining(n) => NodeWith::NameContaining(n.clone()),
                Atom::Role(r) => NodeWith::Role(r.to_wire()),
                Atom::State(k, v) => NodeWith::State(WireState {
                    state: k.to_wire(),
                    value: *v,
                }),
                Atom::Flag(f) => NodeWith::Flag(f.to_wire()),
                Atom::Nth(n) => NodeWith::Nth(u64::try_from(*n).unwrap_or(u64::MAX)),
                Atom::First => NodeWith::First,
                Atom::Root => NodeWith::Root,
            })
            .collect();
        if let Some(ancestor) = finder.ancestor_finder() {
            node_withs.push(NodeWith::Ancestor(Box::new(WireFinder::from(ancestor))));
        }
        Self { node_withs }
    }
}

impl WireFinder {
    /// Rebuilds the in-process Finder. Malformed input (unknown spellings,
    /// root combined with anything else, runaway nesting) is rejected as
    /// `InvalidArgument`; a pattern that does not compile is `InvalidFinder`.
    pub fn to_finder(&self) -> Result<Finder> {
        self.to_finder_at(0)
    }

    fn to_finder_at(&self, depth: usize) -> Result<Finder> {
        if depth > MAX_ANCESTOR_DEPTH {
            return Err(UiError::InvalidArgument(format!(
                "ancestor nesting deeper than {}",
                MAX_ANCESTOR_DEPTH
            )));
        }

        let mut atoms = Vec::with_capacity(self.node_withs.len());
        let mut ancestor = None;
        for node_with in &self.node_withs {
            let atom = match node_with {
                NodeWith::HasClass(c) => Atom::HasClass(c.clone()),
                NodeWith::Name(n) => Atom::Name(n.clone()),
                NodeWith::NameRegex(p) => Atom::NameRegex(p.clone()),
                NodeWith::NameStartingWith(n) => Atom::NameStartingWith(n.clone()),
                NodeWith::NameContaining(n) => Atom::NameContaining(n.clone()),
                NodeWith::Role(r) => Atom::Role(
                    Role::from_wire(r)
                        .ok_or_else(|| UiError::InvalidArgument(format!("unknown role `{}`", r)))?,
                ),
                NodeWith::State(s) => Atom::State(
                    StateKind::from_wire(&s.state).ok_or_else(|| {
                        UiError::InvalidArgument(format!("unknown state `{}`", s.state))
                    })?,
                    s.value,
                ),
                NodeWith::Flag(f) => Atom::Flag(
                    Flag::from_wire(f)
                        .ok_or_else(|| UiError::InvalidArgument(format!("unknown flag `{}`", f)))?,
                ),
                NodeWith::Nth(n) => Atom::Nth(usize::try_from(*n).map_err(|_| {
                    UiError::InvalidArgument(format!("nth index {} out of range", n))
                })?),
                NodeWith::First => Atom::First,
                NodeWith::Root => Atom::Root,
                NodeWith::Ancestor(inner) => {
                    // Last one wins, matching the builder.
                    ancestor = Some(inner.to_finder_at(depth + 1)?);
                    continue;
                }
            };
            atoms.push(atom);
        }

        if atoms.contains(&Atom::Root) && (atoms.len() > 1 || ancestor.is_some()) {
            return Err(UiError::InvalidArgument(
                "root cannot be combined with other node_withs".to_string(),
            ));
        }

        Finder::from_atoms(atoms, ancestor)
    }
}
