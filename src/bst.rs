//! Plain binary search tree operations shared by the balancing code, the cursors and iteration.
//!
//! Nothing here reads or writes balances.

use core::{borrow::Borrow, cmp::Ordering, fmt, pin::Pin, ptr::NonNull};

use crate::{AvlTree, Dir, Link, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = self.links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = self.links(cur).right(),
                }
            }
        }
    }

    pub(crate) fn first_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.extreme_in_subtree(root, Dir::Left) })
    }

    pub(crate) fn last_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.extreme_in_subtree(root, Dir::Right) })
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent.
    #[inline]
    pub(crate) unsafe fn min_in_subtree(&self, root: NonNull<T>) -> (NonNull<T>, Link<T>) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = unsafe { self.links(cur).left() } {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    // Returns the node reached by following `dir` links from `root` for as long as possible.
    #[inline]
    pub(crate) unsafe fn extreme_in_subtree(&self, root: NonNull<T>, dir: Dir) -> NonNull<T> {
        let mut cur = root;

        while let Some(child) = unsafe { self.links(cur).child(dir) } {
            cur = child;
        }

        cur
    }

    /// Returns the in-order predecessor of `node`.
    pub(crate) unsafe fn predecessor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe { self.neighbor_raw(node, Dir::Left) }
    }

    /// Returns the in-order successor of `node`.
    pub(crate) unsafe fn successor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe { self.neighbor_raw(node, Dir::Right) }
    }

    // Returns the nearest node on the `dir` side of `node` in key order.
    unsafe fn neighbor_raw(&self, node: NonNull<T>, dir: Dir) -> Link<T> {
        unsafe {
            // The neighbor is the innermost node of the `dir` subtree, if there is one.
            if let Some(child) = self.links(node).child(dir) {
                return Some(self.extreme_in_subtree(child, !dir));
            }

            // Otherwise it is the first ancestor reached from its `!dir` side.
            let mut cur = node;
            while let Some(parent) = self.links(cur).parent() {
                if self.which_child(parent, cur) == !dir {
                    return Some(parent);
                }

                cur = parent;
            }

            None
        }
    }

    #[inline]
    pub(crate) unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        if unsafe { self.links(parent).left() } == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }

    #[inline]
    pub(crate) unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { self.links_mut(node).set_parent(parent) };
    }

    #[inline]
    pub(crate) unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    pub(crate) unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            debug_assert_eq!(
                self.links(parent).child(dir),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );

            if let Some(new_child) = new_child {
                debug_assert_ne!(
                    self.links(parent).child(!dir),
                    Some(new_child),
                    "`new_child` must not be a child of `parent`"
                );
            }

            self.links_mut(parent).set_child(dir, new_child);
        }
    }

    // Exchanges the tree positions of `a` and `b`.
    //
    // Only links move; keys, values and balances stay with their nodes. Adjacent nodes (one the
    // parent of the other) are handled.
    pub(crate) unsafe fn swap_positions(&mut self, a: NonNull<T>, b: NonNull<T>) {
        if a == b {
            return;
        }

        unsafe {
            let a_parent = self.links(a).parent();
            let b_parent = self.links(b).parent();
            let a_from = a_parent.map(|p| self.which_child(p, a));
            let b_from = b_parent.map(|p| self.which_child(p, b));

            // A link from one node to the other must point back at the first after the swap.
            let swap_ref = |link: Link<T>, from: NonNull<T>, to: NonNull<T>| {
                if link == Some(from) {
                    Some(to)
                } else {
                    link
                }
            };

            let a_children = [self.links(a).left(), self.links(a).right()];
            let b_children = [self.links(b).left(), self.links(b).right()];

            for dir in [Dir::Left, Dir::Right] {
                let a_child = swap_ref(b_children[dir as usize], a, b);
                let b_child = swap_ref(a_children[dir as usize], b, a);
                self.links_mut(a).set_child(dir, a_child);
                self.links_mut(b).set_child(dir, b_child);
            }

            let a_new_parent = swap_ref(b_parent, a, b);
            let b_new_parent = swap_ref(a_parent, b, a);
            self.links_mut(a).set_parent(a_new_parent);
            self.links_mut(b).set_parent(b_new_parent);

            for node in [a, b] {
                for dir in [Dir::Left, Dir::Right] {
                    let child = self.links(node).child(dir);
                    self.maybe_set_parent(child, Some(node));
                }
            }

            match (a_new_parent, b_from) {
                (Some(parent), Some(dir)) if parent != b => {
                    self.links_mut(parent).set_child(dir, Some(a));
                }
                (None, _) => self.root = Some(a),
                _ => {}
            }

            match (b_new_parent, a_from) {
                (Some(parent), Some(dir)) if parent != a => {
                    self.links_mut(parent).set_child(dir, Some(b));
                }
                (None, _) => self.root = Some(b),
                _ => {}
            }
        }
    }
}

/// A read-only view of a node in an [`AvlTree`], with access to its neighbors.
pub struct NodeRef<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    tree: &'tree AvlTree<T>,
    ptr: NonNull<T>,
}

impl<'tree, T> NodeRef<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn new(tree: &'tree AvlTree<T>, ptr: NonNull<T>) -> Self {
        NodeRef { tree, ptr }
    }

    fn at(&self, link: Link<T>) -> Option<NodeRef<'tree, T>> {
        link.map(|ptr| NodeRef::new(self.tree, ptr))
    }

    /// Returns the item at this node.
    pub fn get(&self) -> Pin<&'tree T> {
        // SAFETY: the tree is borrowed for `'tree`, and items are pinned by contract with `Linked`.
        unsafe { Pin::new_unchecked(self.ptr.as_ref()) }
    }

    /// Returns the key of the item at this node.
    pub fn key(&self) -> &'tree T::Key {
        unsafe { self.ptr.as_ref().key() }
    }

    /// Returns the height of the left subtree minus the height of the right subtree.
    pub fn balance(&self) -> i8 {
        unsafe { self.tree.links(self.ptr).balance() }
    }

    /// Returns `true` if this node has no children.
    pub fn is_leaf(&self) -> bool {
        unsafe { self.tree.links(self.ptr).is_leaf() }
    }

    /// Returns the parent of this node, or `None` at the root.
    pub fn parent(&self) -> Option<NodeRef<'tree, T>> {
        self.at(unsafe { self.tree.links(self.ptr).parent() })
    }

    /// Returns the root of the left subtree.
    pub fn left(&self) -> Option<NodeRef<'tree, T>> {
        self.at(unsafe { self.tree.links(self.ptr).left() })
    }

    /// Returns the root of the right subtree.
    pub fn right(&self) -> Option<NodeRef<'tree, T>> {
        self.at(unsafe { self.tree.links(self.ptr).right() })
    }

    /// Returns the node with the greatest key less than this node's key.
    pub fn predecessor(&self) -> Option<NodeRef<'tree, T>> {
        self.at(unsafe { self.tree.predecessor_raw(self.ptr) })
    }

    /// Returns the node with the least key greater than this node's key.
    pub fn successor(&self) -> Option<NodeRef<'tree, T>> {
        self.at(unsafe { self.tree.successor_raw(self.ptr) })
    }
}

impl<T> Clone for NodeRef<'_, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> where T: TreeNode<Links<T>> + ?Sized {}

impl<T> fmt::Debug for NodeRef<'_, T>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", self.key())
            .field("balance", &self.balance())
            .finish()
    }
}
