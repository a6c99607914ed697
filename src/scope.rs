//! Scope tree built during registration.
//!
//! Nodes live in a persistent arena (`im::Vector`), so a registration snapshot can be cloned
//! in O(1) and extended without disturbing readers of the previous snapshot. Node `0` is the
//! implicit trunk; every other branch records its parent.
//!
//! A branch contributes its `child_prefix`, when it has one, to the names of everything
//! below it, and its `description` otherwise. The full name of a test is the contributions
//! of its enclosing branches, outermost first, followed by the test text, joined by spaces.

use crate::errors::Location;
use crate::suite::TestBody;
use crate::tags::TagSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Style-defined kind of a branch (`describe`, `feature`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeKind(pub &'static str);

impl ScopeKind {
    pub const TRUNK: ScopeKind = ScopeKind("trunk");

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub kind: ScopeKind,
    pub description: String,
    pub child_prefix: Option<String>,
    pub children: im::Vector<NodeId>,
    pub parent: Option<NodeId>,
    pub location: Option<Location>,
}

impl Branch {
    /// Text this branch adds to the names of its descendants.
    pub fn naming_text(&self) -> &str {
        self.child_prefix.as_deref().unwrap_or(&self.description)
    }
}

/// One registered test. Immutable once created.
#[derive(Clone)]
pub struct TestEntry {
    /// Scope-prefixed, unique within the suite.
    pub name: String,
    /// Leaf text without scope prefixes.
    pub text: String,
    /// Registration order, starting at 0.
    pub ordinal: usize,
    pub tags: TagSet,
    pub location: Location,
    pub body: TestBody,
}

impl fmt::Debug for TestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestEntry")
            .field("name", &self.name)
            .field("text", &self.text)
            .field("ordinal", &self.ordinal)
            .field("tags", &self.tags)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct InfoLeaf {
    pub text: String,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum Node {
    Branch(Branch),
    Test(TestEntry),
    Info(InfoLeaf),
}

/// Item produced by [`ScopeTree::walk`].
#[derive(Debug, Clone, Copy)]
pub enum Visit<'a> {
    Open(NodeId, &'a Branch),
    Test(&'a TestEntry),
    Info(&'a InfoLeaf),
    Close(NodeId, &'a Branch),
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    nodes: im::Vector<Node>,
}

impl ScopeTree {
    pub const TRUNK: NodeId = NodeId(0);

    pub fn new() -> Self {
        let trunk = Node::Branch(Branch {
            kind: ScopeKind::TRUNK,
            description: String::new(),
            child_prefix: None,
            children: im::Vector::new(),
            parent: None,
            location: None,
        });
        Self {
            nodes: im::vector![trunk],
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn branch(&self, id: NodeId) -> Option<&Branch> {
        match self.node(id) {
            Some(Node::Branch(branch)) => Some(branch),
            _ => None,
        }
    }

    pub fn test(&self, id: NodeId) -> Option<&TestEntry> {
        match self.node(id) {
            Some(Node::Test(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Appends `node` as the last child of `parent`, which must be a branch.
    pub fn push(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push_back(node);
        if let Some(Node::Branch(branch)) = self.nodes.get_mut(parent.0) {
            branch.children.push_back(id);
        }
        id
    }

    /// Kinds of the branches enclosing `id` (inclusive), outermost first, trunk excluded.
    pub fn enclosing_kinds(&self, id: NodeId) -> Vec<ScopeKind> {
        self.ancestry(id).iter().map(|b| b.kind).collect()
    }

    /// Full name of a leaf with text `text` placed under `parent`.
    pub fn full_name(&self, parent: NodeId, text: &str) -> String {
        self.ancestry(parent)
            .iter()
            .map(|b| b.naming_text())
            .chain(std::iter::once(text))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Depth-first traversal in registration order. The trunk itself is not visited.
    pub fn walk(&self) -> Vec<Visit<'_>> {
        let mut out = Vec::new();
        if let Some(trunk) = self.branch(Self::TRUNK) {
            for child in &trunk.children {
                self.walk_node(*child, &mut out);
            }
        }
        out
    }

    /// Whether any test below `id` satisfies `pred`.
    pub fn any_test_below(&self, id: NodeId, pred: &dyn Fn(&TestEntry) -> bool) -> bool {
        match self.node(id) {
            Some(Node::Test(entry)) => pred(entry),
            Some(Node::Branch(branch)) => branch.children.iter().any(|c| self.any_test_below(*c, pred)),
            _ => false,
        }
    }

    fn walk_node<'a>(&'a self, id: NodeId, out: &mut Vec<Visit<'a>>) {
        match self.node(id) {
            Some(Node::Branch(branch)) => {
                out.push(Visit::Open(id, branch));
                for child in &branch.children {
                    self.walk_node(*child, out);
                }
                out.push(Visit::Close(id, branch));
            }
            Some(Node::Test(entry)) => out.push(Visit::Test(entry)),
            Some(Node::Info(info)) => out.push(Visit::Info(info)),
            None => {}
        }
    }

    // Branches from the outermost (below the trunk) down to `id`.
    fn ancestry(&self, id: NodeId) -> Vec<&Branch> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(branch) = self.branch(node_id) else { break };
            if node_id != Self::TRUNK {
                chain.push(branch);
            }
            current = branch.parent;
        }
        chain.reverse();
        chain
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(parent: NodeId, description: &str, prefix: Option<&str>) -> Node {
        Node::Branch(Branch {
            kind: ScopeKind("describe"),
            description: description.to_string(),
            child_prefix: prefix.map(str::to_string),
            children: im::Vector::new(),
            parent: Some(parent),
            location: None,
        })
    }

    #[test]
    fn full_name_joins_enclosing_texts() {
        let mut tree = ScopeTree::new();
        let outer = tree.push(ScopeTree::TRUNK, branch(ScopeTree::TRUNK, "A Stack", None));
        let inner = tree.push(outer, branch(outer, "when empty", None));
        assert_eq!(tree.full_name(inner, "should be empty"), "A Stack when empty should be empty");
        assert_eq!(tree.full_name(ScopeTree::TRUNK, "top"), "top");
    }

    #[test]
    fn child_prefix_replaces_description_in_names() {
        let mut tree = ScopeTree::new();
        let outer = tree.push(ScopeTree::TRUNK, branch(ScopeTree::TRUNK, "A Stack", Some("A Stack should")));
        assert_eq!(tree.full_name(outer, "pop"), "A Stack should pop");
        assert_eq!(tree.branch(outer).unwrap().description, "A Stack");
    }

    #[test]
    fn walk_brackets_children_with_open_and_close() {
        let mut tree = ScopeTree::new();
        let outer = tree.push(ScopeTree::TRUNK, branch(ScopeTree::TRUNK, "outer", None));
        tree.push(
            outer,
            Node::Info(InfoLeaf {
                text: "note".to_string(),
                location: Location::caller(),
            }),
        );
        let shape: Vec<&str> = tree
            .walk()
            .iter()
            .map(|v| match v {
                Visit::Open(..) => "open",
                Visit::Close(..) => "close",
                Visit::Test(_) => "test",
                Visit::Info(_) => "info",
            })
            .collect();
        assert_eq!(shape, ["open", "info", "close"]);
        assert_eq!(tree.enclosing_kinds(outer), [ScopeKind("describe")]);
    }
}
