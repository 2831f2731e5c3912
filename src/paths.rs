//! Leaf-depth checks over plain binary trees.

#[cfg(feature = "alloc")]
use alloc::boxed::Box;

use crate::{Links, NodeRef, TreeNode};

/// A handle to a node of a binary tree, able to reach its children.
pub trait BinaryNode: Sized {
    fn left(&self) -> Option<Self>;

    fn right(&self) -> Option<Self>;
}

/// Returns `true` if every leaf below `root` is at the same depth.
///
/// An empty tree trivially satisfies this.
pub fn equal_paths<N: BinaryNode>(root: Option<N>) -> bool {
    match root {
        Some(root) => leaf_depth(&root).is_some(),
        None => true,
    }
}

// Returns the distance from `node` down to each of its leaves, or `None` if the distances differ.
//
// A missing child does not count as a leaf: a node with a single child takes that child's depth.
fn leaf_depth<N: BinaryNode>(node: &N) -> Option<usize> {
    match (node.left(), node.right()) {
        (None, None) => Some(0),
        (Some(child), None) | (None, Some(child)) => leaf_depth(&child).map(|depth| depth + 1),
        (Some(left), Some(right)) => {
            let left = leaf_depth(&left)?;
            let right = leaf_depth(&right)?;
            (left == right).then_some(left + 1)
        }
    }
}

impl<'tree, T> BinaryNode for NodeRef<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn left(&self) -> Option<Self> {
        NodeRef::left(self)
    }

    fn right(&self) -> Option<Self> {
        NodeRef::right(self)
    }
}

/// A node of a plain, unbalanced binary tree that owns its children.
#[cfg(feature = "alloc")]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlainNode<T> {
    pub value: T,
    pub left: Option<Box<PlainNode<T>>>,
    pub right: Option<Box<PlainNode<T>>>,
}

#[cfg(feature = "alloc")]
impl<T> PlainNode<T> {
    /// Returns a node with no children.
    pub fn leaf(value: T) -> Self {
        PlainNode {
            value,
            left: None,
            right: None,
        }
    }

    /// Returns a node with the given subtrees.
    pub fn with_children(
        value: T,
        left: Option<PlainNode<T>>,
        right: Option<PlainNode<T>>,
    ) -> Self {
        PlainNode {
            value,
            left: left.map(Box::new),
            right: right.map(Box::new),
        }
    }

    pub fn set_left(&mut self, left: PlainNode<T>) -> Option<Box<PlainNode<T>>> {
        self.left.replace(Box::new(left))
    }

    pub fn set_right(&mut self, right: PlainNode<T>) -> Option<Box<PlainNode<T>>> {
        self.right.replace(Box::new(right))
    }
}

#[cfg(feature = "alloc")]
impl<'a, T> BinaryNode for &'a PlainNode<T> {
    fn left(&self) -> Option<Self> {
        let node: &'a PlainNode<T> = *self;
        node.left.as_deref()
    }

    fn right(&self) -> Option<Self> {
        let node: &'a PlainNode<T> = *self;
        node.right.as_deref()
    }
}
