//! Arena-backed view of a rendered chapter.
//!
//! The rendering surface mirrors its document into a `ContentTree`: elements
//! with their tag and attributes, and text runs in document order. Progress
//! geometry only ever looks at text runs handed out by [`TextWalker`], which
//! skips phonetic annotations.

/// Elements whose text is pronunciation guidance, not prose.
const ANNOTATION_TAGS: [&str; 2] = ["rt", "rp"];

/// Index of a node in a [`ContentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone)]
pub enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ContentTree {
    nodes: Vec<Node>,
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentTree {
    /// Empty tree with a `body` root element.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Element {
                    tag: "body".to_string(),
                    attrs: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn alloc(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(parent) = self.nodes.get_mut(parent.0 as usize) {
            parent.children.push(id);
        }
        id
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.alloc(
            parent,
            NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attrs: Vec::new(),
            },
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.alloc(parent, NodeData::Text(text.to_string()))
    }

    /// Set an attribute on an element; ignored for text runs.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(Node {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.nodes.get_mut(id.0 as usize)
        else {
            return;
        };
        match attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// True when the node sits inside an `rt`/`rp` annotation element.
    pub fn is_annotation(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if self
                .tag(node_id)
                .is_some_and(|tag| ANNOTATION_TAGS.contains(&tag))
            {
                return true;
            }
            current = self.node(node_id).and_then(|node| node.parent);
        }
        false
    }

    /// First element in document order whose `id` attribute matches.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_by_attr("id", id)
    }

    /// First element in document order whose `name` attribute matches.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.find_by_attr("name", name)
    }

    fn find_by_attr(&self, attr: &str, value: &str) -> Option<NodeId> {
        PreOrder::new(self, self.root()).find(|node| self.attr(*node, attr) == Some(value))
    }
}

/// Pre-order traversal over every node under (and including) a root.
struct PreOrder<'a> {
    tree: &'a ContentTree,
    stack: Vec<NodeId>,
}

impl<'a> PreOrder<'a> {
    fn new(tree: &'a ContentTree, root: NodeId) -> Self {
        let stack = if tree.node(root).is_some() {
            vec![root]
        } else {
            Vec::new()
        };
        Self { tree, stack }
    }
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Some(node) = self.tree.node(id) {
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(id)
    }
}

/// Lazy, restartable sequence of prose text runs in reading order.
///
/// Runs inside `rt`/`rp` are rejected, so annotation text is never counted
/// or used as a progress anchor.
pub struct TextWalker<'a> {
    tree: &'a ContentTree,
    root: NodeId,
    inner: PreOrder<'a>,
}

impl<'a> TextWalker<'a> {
    pub fn new(tree: &'a ContentTree, root: NodeId) -> Self {
        Self {
            tree,
            root,
            inner: PreOrder::new(tree, root),
        }
    }

    /// Start again from the first run under the root.
    pub fn reset(&mut self) {
        self.inner = PreOrder::new(self.tree, self.root);
    }
}

impl Iterator for TextWalker<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let id = self.inner.next()?;
            if self.tree.text(id).is_some() && !self.tree.is_annotation(id) {
                return Some(id);
            }
        }
    }
}
