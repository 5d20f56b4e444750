use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{broadcast, RwLock};

use super::matcher;
use super::types::{NodeInfo, Rect};
use super::{AdapterError, TreeAdapter, TreeEvent};
use crate::finder::{Query, Role, StateKind};

/// Index of a node inside an `AccessibilityTree` arena.
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct TreeNode {
    info: NodeInfo,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed accessibility tree snapshot. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct AccessibilityTree {
    nodes: Vec<TreeNode>,
}

impl AccessibilityTree {
    pub fn new(root: NodeInfo) -> Self {
        Self {
            nodes: vec![TreeNode {
                info: root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends `info` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, info: NodeInfo) -> Result<NodeId> {
        anyhow::ensure!(parent < self.nodes.len(), "no node with id {}", parent);
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            info,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeInfo> {
        self.nodes.get(id).map(|n| &n.info)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeInfo> {
        self.nodes.get_mut(id).map(|n| &mut n.info)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id) {
            Some(n) => &n.children,
            None => &[],
        }
    }

    /// All nodes in document preorder.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.preorder_from(self.root())
    }

    /// Strict descendants of `id` in preorder.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = self.preorder_from(id);
        if !out.is_empty() {
            out.remove(0);
        }
        out
    }

    fn preorder_from(&self, start: NodeId) -> Vec<NodeId> {
        if start >= self.nodes.len() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }

    /// Builds a tree from its nested document form.
    pub fn from_spec(spec: TreeNodeSpec) -> Self {
        let (root_info, children) = spec.split();
        let mut tree = Self::new(root_info);
        let mut pending: Vec<(NodeId, Vec<TreeNodeSpec>)> = vec![(0, children)];
        while let Some((parent, specs)) = pending.pop() {
            for child in specs {
                let (info, grandchildren) = child.split();
                let id = tree.nodes.len();
                tree.nodes.push(TreeNode {
                    info,
                    parent: Some(parent),
                    children: Vec::new(),
                });
                tree.nodes[parent].children.push(id);
                pending.push((id, grandchildren));
            }
        }
        tree
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let spec: TreeNodeSpec = serde_json::from_str(json).context("invalid tree document")?;
        Ok(Self::from_spec(spec))
    }
}

/// Nested JSON form of a tree snapshot.
///
/// ```json
/// {"role": "window", "className": "BrowserFrame", "location": {"x": 0, "y": 0, "width": 800, "height": 600},
///  "children": [{"role": "button", "name": "New Tab", "state": {"focusable": true}}]}
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNodeSpec {
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub location: Rect,
    #[serde(default)]
    pub state: BTreeMap<StateKind, bool>,
    #[serde(default)]
    pub children: Vec<TreeNodeSpec>,
}

impl TreeNodeSpec {
    fn split(self) -> (NodeInfo, Vec<TreeNodeSpec>) {
        let info = NodeInfo {
            class_name: self.class_name,
            name: self.name,
            value: self.value,
            role: self.role,
            location: self.location,
            state: self.state,
        };
        (info, self.children)
    }
}

/// `TreeAdapter` over an in-memory snapshot that can be swapped or edited at
/// runtime. Supports fault injection for exercising the poll engine.
pub struct SnapshotAdapter {
    tree: RwLock<AccessibilityTree>,
    revision: AtomicU64,
    available: AtomicBool,
    transient_failures: AtomicUsize,
    events: broadcast::Sender<TreeEvent>,
}

impl SnapshotAdapter {
    pub fn new(tree: AccessibilityTree) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            tree: RwLock::new(tree),
            revision: AtomicU64::new(0),
            available: AtomicBool::new(true),
            transient_failures: AtomicUsize::new(0),
            events,
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tree file {}", path.display()))?;
        Ok(Self::new(AccessibilityTree::from_json(&json)?))
    }

    pub async fn replace_tree(&self, tree: AccessibilityTree) {
        *self.tree.write().await = tree;
        self.notify_changed();
    }

    /// Edits the snapshot in place and announces the change.
    pub async fn update<F>(&self, edit: F)
    where
        F: FnOnce(&mut AccessibilityTree),
    {
        edit(&mut *self.tree.write().await);
        self.notify_changed();
    }

    pub async fn snapshot(&self) -> AccessibilityTree {
        self.tree.read().await.clone()
    }

    pub fn set_available(&self, available: bool) {
        let was = self.available.swap(available, Ordering::SeqCst);
        if was && !available {
            let _ = self.events.send(TreeEvent::Disconnected {
                reason: "snapshot marked unavailable".to_string(),
            });
        }
    }

    /// The next `count` resolve calls fail with `AdapterError::Transient`.
    pub fn inject_transient(&self, count: usize) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    fn notify_changed(&self) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Tree snapshot changed (revision {})", revision);
        // No subscribers is fine.
        let _ = self.events.send(TreeEvent::Changed { revision });
    }
}

#[async_trait]
impl TreeAdapter for SnapshotAdapter {
    async fn resolve(&self, query: &Query) -> Result<Vec<NodeInfo>, AdapterError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(AdapterError::Unavailable(
                "snapshot marked unavailable".to_string(),
            ));
        }
        let injected = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(AdapterError::Transient("injected failure".to_string()));
        }

        let tree = self.tree.read().await;
        Ok(matcher::resolve_infos(&tree, query))
    }

    fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::Finder;

    fn sample() -> AccessibilityTree {
        AccessibilityTree::from_json(
            r#"{
                "role": "desktop",
                "children": [
                    {"role": "window", "className": "BrowserFrame", "children": [
                        {"role": "button", "name": "A"},
                        {"role": "group", "children": [{"role": "button", "name": "B"}]}
                    ]},
                    {"role": "button", "name": "C"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_preorder_follows_document_order() {
        let tree = sample();
        let names: Vec<_> = tree
            .preorder()
            .into_iter()
            .filter_map(|id| tree.node(id))
            .filter(|n| n.role == Some(Role::Button))
            .map(|n| n.name.clone())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_descendants_exclude_self() {
        let tree = sample();
        let window = tree.children(tree.root())[0];
        let desc = tree.descendants(window);
        assert_eq!(desc.len(), 3);
        assert!(!desc.contains(&window));
        assert_eq!(tree.parent(desc[0]), Some(window));
    }

    #[test]
    fn test_add_child_rejects_unknown_parent() {
        let mut tree = AccessibilityTree::new(NodeInfo::default());
        assert!(tree.add_child(7, NodeInfo::default()).is_err());
        assert_eq!(tree.add_child(0, NodeInfo::default()).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_injected_transient_failures_are_consumed() {
        let adapter = SnapshotAdapter::new(sample());
        let query = Finder::new().role(Role::Button).compile().unwrap();
        adapter.inject_transient(2);
        assert!(matches!(
            adapter.resolve(&query).await,
            Err(AdapterError::Transient(_))
        ));
        assert!(matches!(
            adapter.resolve(&query).await,
            Err(AdapterError::Transient(_))
        ));
        assert_eq!(adapter.resolve(&query).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_events_on_change_and_disconnect() {
        let adapter = SnapshotAdapter::new(sample());
        let mut rx = adapter.subscribe();

        adapter
            .update(|tree| {
                if let Some(root) = tree.node_mut(0) {
                    root.name = "renamed".to_string();
                }
            })
            .await;
        assert_eq!(rx.recv().await.unwrap(), TreeEvent::Changed { revision: 1 });

        adapter.set_available(false);
        assert!(matches!(
            rx.recv().await.unwrap(),
            TreeEvent::Disconnected { .. }
        ));
        let query = Finder::root().compile().unwrap();
        assert!(matches!(
            adapter.resolve(&query).await,
            Err(AdapterError::Unavailable(_))
        ));
    }
}
