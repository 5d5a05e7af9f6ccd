/*!
# Persistent Syntax Tree

Nodes own their children through `Arc`, so cloning a [`SyntaxTree`] is cheap
and every edit copies only the nodes on the path from the root to the edit
site. Each edit method takes `&self` and returns a new tree; the receiver is
left untouched.

Nodes are addressed by [`NodePath`], the child indices from the root. Paths
are only meaningful for the tree value they were computed against, so
callers re-resolve a node (by tracking token or by span) after every edit
instead of holding on to paths.
*/

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::annotation::TrackingToken;
use super::kind::SyntaxKind;
use super::token::{contains_newline, SyntaxToken, TextSpan, Trivia};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("no node at path {0}")]
    InvalidPath(NodePath),

    #[error("the root node cannot be removed")]
    RemoveRoot,

    #[error("{0:?} node has no tokens")]
    EmptyNode(SyntaxKind),
}

/// Child indices leading from the root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parent(&self) -> Option<NodePath> {
        if self.0.is_empty() {
            None
        } else {
            Some(NodePath(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn child(&self, index: usize) -> NodePath {
        let mut indices = self.0.clone();
        indices.push(index);
        NodePath(indices)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Strict prefix test.
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxElement {
    Node(Arc<SyntaxNode>),
    Token(SyntaxToken),
}

impl SyntaxElement {
    pub fn as_node(&self) -> Option<&SyntaxNode> {
        match self {
            SyntaxElement::Node(node) => Some(node),
            SyntaxElement::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&SyntaxToken> {
        match self {
            SyntaxElement::Token(token) => Some(token),
            SyntaxElement::Node(_) => None,
        }
    }

    /// Mutable access to a child node, copying it first when shared.
    pub fn as_node_mut(&mut self) -> Option<&mut SyntaxNode> {
        match self {
            SyntaxElement::Node(node) => Some(Arc::make_mut(node)),
            SyntaxElement::Token(_) => None,
        }
    }

    pub fn is_token(&self, text: &str) -> bool {
        self.as_token().is_some_and(|t| t.is(text))
    }

    pub fn last_token_mut(&mut self) -> Option<&mut SyntaxToken> {
        match self {
            SyntaxElement::Token(token) => Some(token),
            SyntaxElement::Node(node) => Arc::make_mut(node).last_token_mut(),
        }
    }

    fn has_tokens(&self) -> bool {
        match self {
            SyntaxElement::Token(_) => true,
            SyntaxElement::Node(node) => node.first_token().is_some(),
        }
    }
}

impl From<SyntaxNode> for SyntaxElement {
    fn from(node: SyntaxNode) -> Self {
        SyntaxElement::Node(Arc::new(node))
    }
}

impl From<SyntaxToken> for SyntaxElement {
    fn from(token: SyntaxToken) -> Self {
        SyntaxElement::Token(token)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    kind: SyntaxKind,
    children: Vec<SyntaxElement>,
    span: Option<TextSpan>,
    annotations: Vec<TrackingToken>,
}

impl SyntaxNode {
    /// Builds a node; its span covers its first and last token when both
    /// came from parsed source.
    pub fn new(kind: SyntaxKind, children: Vec<SyntaxElement>) -> Self {
        let mut node = Self {
            kind,
            children,
            span: None,
            annotations: Vec::new(),
        };
        node.span = node.first_token().and_then(|t| t.span).and_then(|first| {
            node.last_token()
                .and_then(|t| t.span)
                .map(|last| first.cover(last))
        });
        node
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn span(&self) -> Option<TextSpan> {
        self.span
    }

    pub fn children(&self) -> &[SyntaxElement] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<SyntaxElement> {
        &mut self.children
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter_map(SyntaxElement::as_node)
    }

    pub fn child_tokens(&self) -> impl Iterator<Item = &SyntaxToken> {
        self.children.iter().filter_map(SyntaxElement::as_token)
    }

    pub fn child_node(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.child_nodes().find(|n| n.kind == kind)
    }

    pub fn child_nodes_of(&self, kind: SyntaxKind) -> impl Iterator<Item = &SyntaxNode> {
        self.child_nodes().filter(move |n| n.kind == kind)
    }

    /// Index (among all children) of the first child node of `kind`.
    pub fn position_of(&self, kind: SyntaxKind) -> Option<usize> {
        self.children
            .iter()
            .position(|e| e.as_node().is_some_and(|n| n.kind == kind))
    }

    /// Index of the first child token with this text.
    pub fn position_of_token(&self, text: &str) -> Option<usize> {
        self.children.iter().position(|e| e.is_token(text))
    }

    pub fn has_token(&self, text: &str) -> bool {
        self.position_of_token(text).is_some()
    }

    pub fn annotations(&self) -> &[TrackingToken] {
        &self.annotations
    }

    pub fn has_annotation(&self, token: TrackingToken) -> bool {
        self.annotations.contains(&token)
    }

    pub fn with_annotation(mut self, token: TrackingToken) -> Self {
        self.annotations.push(token);
        self
    }

    pub fn first_token(&self) -> Option<&SyntaxToken> {
        self.children.iter().find_map(|child| match child {
            SyntaxElement::Token(token) => Some(token),
            SyntaxElement::Node(node) => node.first_token(),
        })
    }

    pub fn last_token(&self) -> Option<&SyntaxToken> {
        self.children.iter().rev().find_map(|child| match child {
            SyntaxElement::Token(token) => Some(token),
            SyntaxElement::Node(node) => node.last_token(),
        })
    }

    pub fn first_token_mut(&mut self) -> Option<&mut SyntaxToken> {
        let index = self.children.iter().position(SyntaxElement::has_tokens)?;
        match &mut self.children[index] {
            SyntaxElement::Token(token) => Some(token),
            SyntaxElement::Node(node) => Arc::make_mut(node).first_token_mut(),
        }
    }

    pub fn last_token_mut(&mut self) -> Option<&mut SyntaxToken> {
        let index = self.children.iter().rposition(SyntaxElement::has_tokens)?;
        match &mut self.children[index] {
            SyntaxElement::Token(token) => Some(token),
            SyntaxElement::Node(node) => Arc::make_mut(node).last_token_mut(),
        }
    }

    pub fn tokens(&self) -> Vec<&SyntaxToken> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a SyntaxToken>) {
        for child in &self.children {
            match child {
                SyntaxElement::Token(token) => out.push(token),
                SyntaxElement::Node(node) => node.collect_tokens(out),
            }
        }
    }

    pub fn leading_trivia(&self) -> &[Trivia] {
        self.first_token().map(|t| t.leading.as_slice()).unwrap_or(&[])
    }

    pub fn trailing_trivia(&self) -> &[Trivia] {
        self.last_token().map(|t| t.trailing.as_slice()).unwrap_or(&[])
    }

    pub fn with_leading_trivia(mut self, trivia: Vec<Trivia>) -> Self {
        if let Some(token) = self.first_token_mut() {
            token.leading = trivia;
        }
        self
    }

    pub fn with_trailing_trivia(mut self, trivia: Vec<Trivia>) -> Self {
        if let Some(token) = self.last_token_mut() {
            token.trailing = trivia;
        }
        self
    }

    /// Source text without the outer leading and trailing trivia.
    pub fn text(&self) -> String {
        let tokens = self.tokens();
        let last = tokens.len().saturating_sub(1);
        let mut out = String::new();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                token.leading.iter().for_each(|t| out.push_str(t.text()));
            }
            out.push_str(&token.text);
            if i < last {
                token.trailing.iter().for_each(|t| out.push_str(t.text()));
            }
        }
        out
    }

    /// Identifier text of the first direct identifier token, if any.
    pub fn identifier(&self) -> Option<&str> {
        self.child_tokens()
            .find(|t| t.kind == super::TokenKind::Identifier)
            .map(|t| t.text.as_str())
    }

    pub(crate) fn write_source(&self, out: &mut String) {
        for child in &self.children {
            match child {
                SyntaxElement::Token(token) => token.write_full(out),
                SyntaxElement::Node(node) => node.write_source(out),
            }
        }
    }
}

fn node_at<'a>(root: &'a SyntaxNode, path: &[usize]) -> Option<&'a SyntaxNode> {
    let mut node = root;
    for &index in path {
        node = node.children.get(index)?.as_node()?;
    }
    Some(node)
}

/// Depth-first search that leaves the child indices of the match in `path`.
fn find_annotated_in<'a>(node: &'a SyntaxNode, token: TrackingToken, path: &mut Vec<usize>) -> Option<&'a SyntaxNode> {
    if node.has_annotation(token) {
        return Some(node);
    }
    for (index, child) in node.children.iter().enumerate() {
        let Some(child) = child.as_node() else {
            continue;
        };
        path.push(index);
        if let Some(found) = find_annotated_in(child, token, path) {
            return Some(found);
        }
        path.pop();
    }
    None
}

fn node_at_mut<'a>(root: &'a mut Arc<SyntaxNode>, path: &[usize]) -> Option<&'a mut SyntaxNode> {
    let mut node = Arc::make_mut(root);
    for &index in path {
        node = match node.children.get_mut(index)? {
            SyntaxElement::Node(child) => Arc::make_mut(child),
            SyntaxElement::Token(_) => return None,
        };
    }
    Some(node)
}

/// Locates the child slot holding the token adjacent to the node at `path`.
fn adjacent_slot(root: &SyntaxNode, path: &[usize], forward: bool) -> Option<(Vec<usize>, usize)> {
    for depth in (1..=path.len()).rev() {
        let parent_path = &path[..depth - 1];
        let index = path[depth - 1];
        let parent = node_at(root, parent_path)?;
        let found = if forward {
            (index + 1..parent.children.len()).find(|&j| parent.children[j].has_tokens())
        } else {
            (0..index).rev().find(|&j| parent.children[j].has_tokens())
        };
        if let Some(j) = found {
            return Some((parent_path.to_vec(), j));
        }
    }
    None
}

/// How the trivia of a removed node is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOptions {
    /// Leading and trailing trivia disappear with the node.
    KeepNoTrivia,
    /// Leading trivia moves onto the following token.
    KeepLeadingTrivia,
    /// The line break ending the node survives on the preceding token when
    /// that token does not already end its line.
    KeepTrailingTrivia,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    root: Arc<SyntaxNode>,
}

impl SyntaxTree {
    pub fn new(root: SyntaxNode) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    pub fn root_ref(&self) -> SyntaxRef<'_> {
        SyntaxRef {
            root: &self.root,
            node: &self.root,
            path: NodePath::root(),
        }
    }

    /// True when both values share the same root allocation.
    pub fn is_same(&self, other: &SyntaxTree) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    pub fn node_at(&self, path: &NodePath) -> Option<&SyntaxNode> {
        node_at(&self.root, path.as_slice())
    }

    pub fn get(&self, path: &NodePath) -> Option<SyntaxRef<'_>> {
        self.node_at(path).map(|node| SyntaxRef {
            root: &self.root,
            node,
            path: path.clone(),
        })
    }

    /// All nodes in document order, root first.
    pub fn descendants(&self) -> Vec<SyntaxRef<'_>> {
        self.root_ref().descendants_and_self()
    }

    /// First node in document order carrying `token`. Stops at the match.
    pub fn find_annotated(&self, token: TrackingToken) -> Option<SyntaxRef<'_>> {
        let mut indices = Vec::new();
        let node = find_annotated_in(&self.root, token, &mut indices)?;
        Some(SyntaxRef {
            root: &self.root,
            node,
            path: NodePath(indices),
        })
    }

    pub fn count_annotated(&self, token: TrackingToken) -> usize {
        self.descendants()
            .iter()
            .filter(|n| n.node.has_annotation(token))
            .count()
    }

    /// First node in document order with this kind and source span.
    pub fn find_by_span(&self, kind: SyntaxKind, span: TextSpan) -> Option<SyntaxRef<'_>> {
        fn search(node: &SyntaxNode, path: &mut Vec<usize>, kind: SyntaxKind, span: TextSpan) -> bool {
            if node.kind == kind && node.span == Some(span) {
                return true;
            }
            for (i, child) in node.children.iter().enumerate() {
                if let SyntaxElement::Node(child) = child {
                    if child.span.map_or(true, |s| s.contains(&span)) {
                        path.push(i);
                        if search(child, path, kind, span) {
                            return true;
                        }
                        path.pop();
                    }
                }
            }
            false
        }

        let mut path = Vec::new();
        if search(&self.root, &mut path, kind, span) {
            self.get(&NodePath(path))
        } else {
            None
        }
    }

    /// Applies `edit` to a copy of the node at `path`.
    pub fn try_update<E, F>(&self, path: &NodePath, edit: F) -> Result<SyntaxTree, E>
    where
        E: From<TreeError>,
        F: FnOnce(&mut SyntaxNode) -> Result<(), E>,
    {
        let mut root = Arc::clone(&self.root);
        let node = node_at_mut(&mut root, path.as_slice())
            .ok_or_else(|| TreeError::InvalidPath(path.clone()))?;
        edit(node)?;
        Ok(SyntaxTree { root })
    }

    pub fn update<F>(&self, path: &NodePath, edit: F) -> Result<SyntaxTree, TreeError>
    where
        F: FnOnce(&mut SyntaxNode),
    {
        self.try_update(path, |node| {
            edit(node);
            Ok(())
        })
    }

    pub fn annotate(&self, path: &NodePath, token: TrackingToken) -> Result<SyntaxTree, TreeError> {
        self.update(path, |node| node.annotations.push(token))
    }

    pub fn replace_node(&self, path: &NodePath, replacement: SyntaxNode) -> Result<SyntaxTree, TreeError> {
        self.replace_node_with_many(path, vec![replacement])
    }

    /// Replaces one node with zero or more siblings. Replacing the root
    /// requires exactly one replacement.
    pub fn replace_node_with_many(
        &self,
        path: &NodePath,
        replacements: Vec<SyntaxNode>,
    ) -> Result<SyntaxTree, TreeError> {
        let (parent, index) = match (path.parent(), path.last_index()) {
            (Some(parent), Some(index)) => (parent, index),
            _ => {
                let mut replacements = replacements;
                return match (replacements.pop(), replacements.is_empty()) {
                    (Some(root), true) => Ok(SyntaxTree::new(root)),
                    _ => Err(TreeError::RemoveRoot),
                };
            }
        };
        let target = path.clone();
        self.try_update(&parent, move |node| {
            if !matches!(node.children.get(index), Some(SyntaxElement::Node(_))) {
                return Err(TreeError::InvalidPath(target));
            }
            let elements = replacements.into_iter().map(SyntaxElement::from);
            node.children.splice(index..=index, elements);
            Ok(())
        })
    }

    pub fn insert_children(
        &self,
        parent: &NodePath,
        index: usize,
        elements: Vec<SyntaxElement>,
    ) -> Result<SyntaxTree, TreeError> {
        let target = parent.clone();
        self.try_update(parent, move |node| {
            if index > node.children.len() {
                return Err(TreeError::InvalidPath(target.child(index)));
            }
            node.children.splice(index..index, elements);
            Ok(())
        })
    }

    pub fn remove_node(&self, path: &NodePath, options: RemoveOptions) -> Result<SyntaxTree, TreeError> {
        let parent = path.parent().ok_or(TreeError::RemoveRoot)?;
        let index = path.last_index().ok_or(TreeError::RemoveRoot)?;
        let removed = self
            .node_at(path)
            .ok_or_else(|| TreeError::InvalidPath(path.clone()))?;

        let mut tree = self.clone();
        match options {
            RemoveOptions::KeepNoTrivia => {}
            RemoveOptions::KeepLeadingTrivia => {
                let residual = removed.leading_trivia().to_vec();
                if !residual.is_empty() {
                    tree = tree.update_token_after(path, move |token| {
                        let mut leading = residual;
                        leading.append(&mut token.leading);
                        token.leading = leading;
                    })?;
                }
            }
            RemoveOptions::KeepTrailingTrivia => {
                let residual: Vec<Trivia> = removed
                    .trailing_trivia()
                    .iter()
                    .skip_while(|t| t.is_whitespace())
                    .cloned()
                    .collect();
                if contains_newline(&residual) {
                    tree = tree.update_token_before(path, move |token| {
                        if !contains_newline(&token.trailing) {
                            token.trailing.extend(residual);
                        }
                    })?;
                }
            }
        }

        tree.try_update(&parent, |node| {
            if index >= node.children.len() {
                return Err(TreeError::InvalidPath(path.clone()));
            }
            node.children.remove(index);
            Ok(())
        })
    }

    /// Removes an item from a comma-separated list together with the
    /// separator that belongs to it. Removing the last item hands its
    /// trailing trivia to the item before it.
    pub fn remove_list_item(&self, path: &NodePath) -> Result<SyntaxTree, TreeError> {
        let parent = path.parent().ok_or(TreeError::RemoveRoot)?;
        let index = path.last_index().ok_or(TreeError::RemoveRoot)?;
        self.try_update(&parent, |node| {
            if index >= node.children.len() {
                return Err(TreeError::InvalidPath(path.clone()));
            }
            let comma_after = node.children.get(index + 1).is_some_and(|e| e.is_token(","));
            let comma_before = index > 0 && node.children[index - 1].is_token(",");
            if comma_after {
                node.children.drain(index..=index + 1);
            } else if comma_before {
                let trailing = match &node.children[index] {
                    SyntaxElement::Node(item) => item.trailing_trivia().to_vec(),
                    SyntaxElement::Token(item) => item.trailing.clone(),
                };
                node.children.drain(index - 1..=index);
                if let Some(token) = index
                    .checked_sub(2)
                    .and_then(|previous| node.children.get_mut(previous))
                    .and_then(SyntaxElement::last_token_mut)
                {
                    token.trailing = trailing;
                }
            } else {
                node.children.remove(index);
            }
            Ok(())
        })
    }

    /// Edits the last token before the node at `path`. No-op when the node
    /// starts the tree.
    pub fn update_token_before<F>(&self, path: &NodePath, edit: F) -> Result<SyntaxTree, TreeError>
    where
        F: FnOnce(&mut SyntaxToken),
    {
        self.update_adjacent_token(path, false, edit)
    }

    /// Edits the first token after the node at `path`. No-op when the node
    /// ends the tree.
    pub fn update_token_after<F>(&self, path: &NodePath, edit: F) -> Result<SyntaxTree, TreeError>
    where
        F: FnOnce(&mut SyntaxToken),
    {
        self.update_adjacent_token(path, true, edit)
    }

    fn update_adjacent_token<F>(&self, path: &NodePath, forward: bool, edit: F) -> Result<SyntaxTree, TreeError>
    where
        F: FnOnce(&mut SyntaxToken),
    {
        let Some((parent, index)) = adjacent_slot(&self.root, path.as_slice(), forward) else {
            return Ok(self.clone());
        };
        let slot = NodePath(parent.clone()).child(index);
        self.try_update(&NodePath(parent), |node| {
            let token = match node.children.get_mut(index) {
                Some(SyntaxElement::Token(token)) => Some(token),
                Some(SyntaxElement::Node(child)) => {
                    let child = Arc::make_mut(child);
                    if forward {
                        child.first_token_mut()
                    } else {
                        child.last_token_mut()
                    }
                }
                None => None,
            };
            let token = token.ok_or(TreeError::InvalidPath(slot))?;
            edit(token);
            Ok(())
        })
    }
}

/// Borrowed view of a node that knows where it sits in its tree.
#[derive(Debug, Clone)]
pub struct SyntaxRef<'a> {
    root: &'a SyntaxNode,
    node: &'a SyntaxNode,
    path: NodePath,
}

impl<'a> SyntaxRef<'a> {
    pub fn node(&self) -> &'a SyntaxNode {
        self.node
    }

    pub fn root(&self) -> &'a SyntaxNode {
        self.root
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// True when this view was taken from a tree rooted at `root`.
    pub fn belongs_to(&self, root: &SyntaxNode) -> bool {
        std::ptr::eq(self.root, root)
    }

    pub fn parent(&self) -> Option<SyntaxRef<'a>> {
        let path = self.path.parent()?;
        node_at(self.root, path.as_slice()).map(|node| SyntaxRef {
            root: self.root,
            node,
            path,
        })
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxRef<'a>> + '_ {
        let root = self.root;
        (0..self.path.len()).rev().filter_map(move |len| {
            let path = NodePath(self.path.0[..len].to_vec());
            node_at(root, path.as_slice()).map(|node| SyntaxRef { root, node, path })
        })
    }

    pub fn first_ancestor(&self, kind: SyntaxKind) -> Option<SyntaxRef<'a>> {
        self.ancestors().find(|a| a.kind() == kind)
    }

    pub fn first_ancestor_where(&self, pred: impl Fn(SyntaxKind) -> bool) -> Option<SyntaxRef<'a>> {
        self.ancestors().find(|a| pred(a.kind()))
    }

    pub fn children(&self) -> Vec<SyntaxRef<'a>> {
        self.node
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, child)| {
                child.as_node().map(|node| SyntaxRef {
                    root: self.root,
                    node,
                    path: self.path.child(i),
                })
            })
            .collect()
    }

    pub fn child(&self, kind: SyntaxKind) -> Option<SyntaxRef<'a>> {
        self.children().into_iter().find(|c| c.kind() == kind)
    }

    /// All descendant nodes in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<SyntaxRef<'a>> {
        let mut out = self.descendants_and_self();
        out.remove(0);
        out
    }

    fn descendants_and_self(&self) -> Vec<SyntaxRef<'a>> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(current) = stack.pop() {
            let mut children = current.children();
            children.reverse();
            stack.extend(children);
            out.push(current);
        }
        out
    }
}

impl<'a> Deref for SyntaxRef<'a> {
    type Target = SyntaxNode;

    fn deref(&self) -> &SyntaxNode {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::parse_compilation_unit;
    use crate::syntax::ToSource;

    const SOURCE: &str = "class A\n{\n    int x;\n\n    int y;\n}\n";

    #[test]
    fn test_edit_leaves_previous_tree_untouched() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let field = tree
            .descendants()
            .into_iter()
            .find(|n| n.kind() == SyntaxKind::FieldDeclaration)
            .unwrap();
        let path = field.path().clone();
        let edited = tree.remove_node(&path, RemoveOptions::KeepTrailingTrivia).unwrap();

        assert_eq!(tree.to_source(), SOURCE);
        assert_eq!(edited.to_source(), "class A\n{\n\n    int y;\n}\n");
    }

    #[test]
    fn test_annotation_survives_unrelated_edits() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let fields: Vec<_> = tree
            .descendants()
            .into_iter()
            .filter(|n| n.kind() == SyntaxKind::FieldDeclaration)
            .map(|n| n.path().clone())
            .collect();
        let token = TrackingToken::fresh();
        let tree = tree.annotate(&fields[1], token).unwrap();
        let tree = tree.remove_node(&fields[0], RemoveOptions::KeepNoTrivia).unwrap();

        assert_eq!(tree.count_annotated(token), 1);
        assert_eq!(tree.find_annotated(token).unwrap().text(), "int y;");
    }

    #[test]
    fn test_find_annotated_returns_first_match_with_path() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let nodes = tree.descendants();
        let class = nodes.iter().find(|n| n.kind() == SyntaxKind::ClassDeclaration).unwrap();
        let type_of_y = nodes
            .iter()
            .filter(|n| n.kind() == SyntaxKind::PredefinedType)
            .nth(1)
            .unwrap();
        let token = TrackingToken::fresh();
        let tree = tree.annotate(type_of_y.path(), token).unwrap();
        let tree = tree.annotate(class.path(), token).unwrap();

        let found = tree.find_annotated(token).unwrap();
        assert_eq!(found.kind(), SyntaxKind::ClassDeclaration);
        assert_eq!(found.path(), class.path());

        let other = TrackingToken::fresh();
        let tree = tree.annotate(type_of_y.path(), other).unwrap();
        let found = tree.find_annotated(other).unwrap();
        assert_eq!(found.path(), type_of_y.path());
        assert_eq!(found.text(), "int");
        assert_eq!(found.parent().unwrap().kind(), SyntaxKind::VariableDeclaration);
        assert!(tree.find_annotated(TrackingToken::fresh()).is_none());
    }

    #[test]
    fn test_find_by_span_matches_kind() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let field = tree
            .descendants()
            .into_iter()
            .find(|n| n.kind() == SyntaxKind::FieldDeclaration)
            .unwrap();
        let span = field.span().unwrap();
        let found = tree.find_by_span(SyntaxKind::FieldDeclaration, span).unwrap();
        assert_eq!(found.path(), field.path());
        assert!(tree.find_by_span(SyntaxKind::MethodDeclaration, span).is_none());
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let field = tree
            .descendants()
            .into_iter()
            .find(|n| n.kind() == SyntaxKind::FieldDeclaration)
            .unwrap();
        let kinds: Vec<_> = field.ancestors().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![SyntaxKind::ClassDeclaration, SyntaxKind::CompilationUnit]);
    }

    #[test]
    fn test_remove_root_is_rejected() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        assert_eq!(
            tree.remove_node(&NodePath::root(), RemoveOptions::KeepNoTrivia),
            Err(TreeError::RemoveRoot)
        );
    }
}
