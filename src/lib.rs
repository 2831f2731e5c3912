//! An intrusive AVL tree.
#![no_std]

// Conventions used in comments:
// - The height of a node `x` is denoted `h(x)`; a missing subtree has height 0 and a leaf has
//   height 1.
// - The balance of a node `x` is given by `b(x) = h(left(x)) - h(right(x))`.
// - A node is left-heavy if `b(x) > 0` and right-heavy if `b(x) < 0`.
//
// The fundamental invariants of an AVL tree are:
// 1. Every node is ordered after each node in its left subtree and before each node in its right
//    subtree.
// 2. The balance of every node is -1, 0 or 1.
// 3. The balance stored in a node's links always equals its true height difference.
//
// Between a single insertion or removal and the rebalance that follows it, exactly one node at a
// time may hold a balance of -2 or 2.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

use core::{
    borrow::Borrow, cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not,
    pin::Pin, ptr::NonNull,
};

use cordyceps::Linked;

mod bst;
mod cursor;
#[cfg(feature = "alloc")]
mod debug;
mod error;
mod iter;
#[cfg(feature = "alloc")]
pub mod map;
#[cfg(any(test, feature = "model"))]
pub mod model;
pub mod paths;

#[cfg(test)]
mod tests;

pub use bst::NodeRef;
pub use cursor::{Cursor, CursorMut};
pub use error::KeyNotFound;
pub use iter::Iter;
#[cfg(feature = "alloc")]
pub use map::AvlMap;

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree.
///
/// Items embed a [`Links`] value and are owned by the tree through their [`Linked::Handle`] from
/// insertion until removal. Child links own the subtree below them; parent links are only used to
/// walk back up during rebalancing and iteration.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Dir {
    // The change in the parent's balance when the subtree on this side grows by one.
    #[inline]
    fn balance_delta(self) -> i8 {
        match self {
            Dir::Left => 1,
            Dir::Right => -1,
        }
    }
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    balance: i8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

// Outcome of inserting into a subtree.
enum Growth<T: ?Sized> {
    // The subtree is one level taller.
    Grew,
    // The subtree kept its height.
    Unchanged,
    // An item with an equal key was found and replaced in place.
    Replaced(NonNull<T>),
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns a view of the root node, or `None` if the tree is empty.
    pub fn root(&self) -> Option<NodeRef<'_, T>> {
        self.root.map(|ptr| NodeRef::new(self, ptr))
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self)
    where
        T::Key: fmt::Debug,
    {
        let mut count = 0;

        if let Some(root) = self.root {
            unsafe {
                assert_eq!(self.links(root).parent(), None, "root has a parent pointer");
                self.assert_invariants_at(root, None, None, &mut count);
            }
        }

        assert_eq!(count, self.len, "`len` does not match the number of reachable nodes");
    }

    // Checks the subtree rooted at `node`, whose keys must lie strictly between `lower` and `upper`.
    //
    // Returns the height of the subtree.
    #[allow(clippy::only_used_in_recursion)]
    unsafe fn assert_invariants_at(
        &self,
        node: NonNull<T>,
        lower: Option<&T::Key>,
        upper: Option<&T::Key>,
        count: &mut usize,
    ) -> i32
    where
        T::Key: fmt::Debug,
    {
        unsafe {
            let key = node.as_ref().key();

            if let Some(lower) = lower {
                assert!(lower < key, "{key:?} is in the right subtree of {lower:?}");
            }

            if let Some(upper) = upper {
                assert!(key < upper, "{key:?} is in the left subtree of {upper:?}");
            }

            *count += 1;

            let links = self.links(node);
            let mut heights = [0; 2];

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = links.child(dir) {
                    // Ensure child's parent link points to this node.
                    let parent = self
                        .links(child)
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent);

                    let (lower, upper) = match dir {
                        Dir::Left => (lower, Some(key)),
                        Dir::Right => (Some(key), upper),
                    };

                    heights[dir as usize] = self.assert_invariants_at(child, lower, upper, count);
                }
            }

            let balance = heights[Dir::Left as usize] - heights[Dir::Right as usize];
            assert_eq!(
                i32::from(links.balance()),
                balance,
                "stored balance of {key:?} does not match its subtree heights"
            );
            assert!((-1..=1).contains(&balance), "{key:?} is out of balance");

            1 + heights[0].max(heights[1])
        }
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to the node corresponding to `key`.
    ///
    /// The key of the returned node must not be modified in a way that changes its ordering.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    /// Returns `true` if the tree contains a node corresponding to `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.first_raw()
            .map(|first| unsafe { Pin::new_unchecked(first.as_ref()) })
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.last_raw()
            .map(|last| unsafe { Pin::new_unchecked(last.as_ref()) })
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = self.first_raw()?;
        unsafe { Some(self.remove_at(first)) }
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = self.last_raw()?;
        unsafe { Some(self.remove_at(last)) }
    }

    /// Returns an iterator over the elements of the tree in key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Returns a cursor pointing at the minimum element of the tree.
    pub fn cursor_first(&self) -> Cursor<'_, T> {
        Cursor::first(self)
    }

    /// Returns a cursor pointing at the maximum element of the tree.
    pub fn cursor_last(&self) -> Cursor<'_, T> {
        Cursor::last(self)
    }

    /// Returns an editing cursor pointing at the minimum element of the tree.
    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::first(self)
    }

    /// Returns an editing cursor pointing at the maximum element of the tree.
    pub fn cursor_last_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::last(self)
    }

    /// Returns a cursor pointing at the element corresponding to `key`.
    ///
    /// If no element matches, the cursor starts on the "ghost" position.
    pub fn cursor_at<Q>(&self, key: &Q) -> Cursor<'_, T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key);
        Cursor::at(self, ptr)
    }

    /// Returns an editing cursor pointing at the element corresponding to `key`.
    ///
    /// If no element matches, the cursor starts on the "ghost" position.
    pub fn cursor_at_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key);
        CursorMut::at(self, ptr)
    }

    #[inline]
    unsafe fn links<'a>(&self, node: NonNull<T>) -> &'a Links<T> {
        unsafe { T::links(node).as_ref() }
    }

    #[inline]
    unsafe fn links_mut<'a>(&mut self, node: NonNull<T>) -> &'a mut Links<T> {
        unsafe { T::links(node).as_mut() }
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already holds an item with an equal key, `item` takes over its position and the
    /// previous item is returned. The shape of the tree is unchanged in that case.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        unsafe {
            self.links_mut(ptr).clear();

            let (root, growth) = self.insert_at(self.root, None, ptr);
            self.root = Some(root);

            match growth {
                Growth::Replaced(old) => Some(T::from_ptr(old)),
                Growth::Grew | Growth::Unchanged => {
                    self.len += 1;
                    None
                }
            }
        }
    }

    // Inserts `new` into the subtree rooted at `opt_node`, whose parent is `parent`.
    //
    // Returns the root of the resulting subtree and whether its height changed. A single rotation
    // always absorbs the growth, so nothing above a rebalanced node needs to be revisited.
    unsafe fn insert_at(
        &mut self,
        opt_node: Link<T>,
        parent: Link<T>,
        new: NonNull<T>,
    ) -> (NonNull<T>, Growth<T>) {
        unsafe {
            let Some(node) = opt_node else {
                self.links_mut(new).set_parent(parent);
                return (new, Growth::Grew);
            };

            let dir = match new.as_ref().key().cmp(node.as_ref().key()) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => {
                    self.replace_item(node, new);
                    return (new, Growth::Replaced(node));
                }
                Ordering::Greater => Dir::Right,
            };

            let child = self.links(node).child(dir);
            let (subtree, growth) = self.insert_at(child, Some(node), new);
            self.links_mut(node).set_child(dir, Some(subtree));
            self.links_mut(subtree).set_parent(Some(node));

            if !matches!(growth, Growth::Grew) {
                return (node, growth);
            }

            match self.adjust_balance(node, dir.balance_delta()) {
                0 => (node, Growth::Unchanged),
                1 | -1 => (node, Growth::Grew),
                _ => (self.rebalance(node), Growth::Unchanged),
            }
        }
    }

    // Puts `new` in the position of `old`, taking over its links and balance.
    unsafe fn replace_item(&mut self, old: NonNull<T>, new: NonNull<T>) {
        unsafe {
            let old_links = self.links(old);
            let parent = old_links.parent();
            let left = old_links.left();
            let right = old_links.right();
            let balance = old_links.balance();

            self.replace_child_or_set_root(parent, old, Some(new));
            self.maybe_set_parent(left, Some(new));
            self.maybe_set_parent(right, Some(new));

            let new_links = self.links_mut(new);
            new_links.set_parent(parent);
            new_links.set_left(left);
            new_links.set_right(right);
            new_links.set_balance(balance);

            self.links_mut(old).clear();

            tracing::trace!(balance, "replaced item with equal key");
        }
    }

    // Rotates the subtree rooted at `down` towards `dir`.
    //
    // `down`'s `!dir` child `up` takes its place, and `down` becomes `up`'s `dir` child. Balances of
    // both nodes are derived from their balances before the rotation, so rotations that leave a
    // residual lean (as happens during removal) stay exact.
    //
    // Returns the new subtree root, which is `down` itself if it has no `!dir` child.
    fn rotate(&mut self, down: NonNull<T>, dir: Dir) -> NonNull<T> {
        unsafe {
            let Some(up) = self.links(down).child(!dir) else {
                tracing::trace!(?dir, "rotation has no pivot child; skipping");
                return down;
            };

            // `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let across = self.links(up).child(dir);
            self.links_mut(down).set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            self.links_mut(up).set_child(dir, Some(down));
            let parent = self.links_mut(down).set_parent(Some(up));
            self.links_mut(up).set_parent(parent);
            self.replace_child_or_set_root(parent, down, Some(up));

            let down_balance = self.links(down).balance();
            let up_balance = self.links(up).balance();

            let (down_balance, up_balance) = match dir {
                Dir::Left => {
                    let down_balance = down_balance + 1 - up_balance.min(0);
                    (down_balance, up_balance + 1 + down_balance.max(0))
                }
                Dir::Right => {
                    let down_balance = down_balance - 1 - up_balance.max(0);
                    (down_balance, up_balance - 1 + down_balance.min(0))
                }
            };

            self.links_mut(down).set_balance(down_balance);
            self.links_mut(up).set_balance(up_balance);

            tracing::trace!(?dir, down_balance, up_balance, "rotated");

            up
        }
    }

    // Restores the balance rule at `node` if its balance has reached -2 or 2.
    //
    // Returns the root of the rebalanced subtree.
    fn rebalance(&mut self, node: NonNull<T>) -> NonNull<T> {
        unsafe {
            let balance = self.links(node).balance();

            let heavy = if balance > 1 {
                Dir::Left
            } else if balance < -1 {
                Dir::Right
            } else {
                return node;
            };

            // If the heavy child leans the other way, straighten it first.
            if let Some(child) = self.links(node).child(heavy) {
                if self.links(child).balance() * heavy.balance_delta() < 0 {
                    tracing::trace!(?heavy, "double rotation");
                    self.rotate(child, heavy);
                }
            }

            self.rotate(node, !heavy)
        }
    }

    #[inline]
    unsafe fn adjust_balance(&mut self, node: NonNull<T>, diff: i8) -> i8 {
        unsafe {
            let links = self.links_mut(node);
            let balance = links.balance() + diff;
            debug_assert!((-2..=2).contains(&balance), "balance out of range: {balance}");
            links.set_balance(balance);
            balance
        }
    }

    /// Removes the item corresponding to `key` from the tree.
    ///
    /// Returns `None` and leaves the tree untouched if no item matches.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        unsafe { Some(self.remove_at(node)) }
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        unsafe {
            // A node with two children first trades places with its in-order predecessor, which has
            // no right child. Either way, `node` ends up with at most one child.
            if let (Some(left), Some(_)) = (self.links(node).left(), self.links(node).right()) {
                let predecessor = self.extreme_in_subtree(left, Dir::Right);
                self.node_swap(node, predecessor);
            }

            let links = self.links(node);
            let child = links.left().or(links.right());
            let parent = links.parent();
            let from = parent.map(|p| self.which_child(p, node));

            self.replace_child_or_set_root(parent, node, child);
            self.maybe_set_parent(child, parent);
            self.links_mut(node).clear();
            self.len -= 1;

            tracing::trace!(has_child = child.is_some(), "spliced out removed node");

            if let (Some(parent), Some(from)) = (parent, from) {
                self.rebalance_removed(parent, from);
            }

            T::from_ptr(node)
        }
    }

    // Walks up from `current`, whose `from` subtree just shrank by one, fixing balances until the
    // height of some subtree is known to be unchanged.
    unsafe fn rebalance_removed(&mut self, mut current: NonNull<T>, mut from: Dir) {
        unsafe {
            loop {
                let balance = self.adjust_balance(current, -from.balance_delta());
                tracing::trace!(?from, balance, "propagating removal");

                match balance {
                    // The subtree kept its height.
                    1 | -1 => return,

                    // The subtree shrank; keep going.
                    0 => {}

                    _ => {
                        current = self.rebalance(current);

                        if self.links(current).parent().is_none() {
                            self.root = Some(current);
                            return;
                        }

                        // A rotation that leaves a lean restores the previous height.
                        if self.links(current).balance() != 0 {
                            return;
                        }
                    }
                }

                let Some(parent) = self.links(current).parent() else {
                    return;
                };

                from = self.which_child(parent, current);
                current = parent;
            }
        }
    }

    // Exchanges the positions of `a` and `b`, keeping each position's balance where it was.
    unsafe fn node_swap(&mut self, a: NonNull<T>, b: NonNull<T>) {
        unsafe {
            self.swap_positions(a, b);

            let a_balance = self.links(a).balance();
            let b_balance = self.links(b).balance();
            self.links_mut(a).set_balance(b_balance);
            self.links_mut(b).set_balance(a_balance);
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let (cur, parent) = self.min_in_subtree(cur);
                let parent = parent.or_else(|| self.links(cur).parent());

                let right = self.links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                self.links_mut(cur).clear();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }
}

impl<T> Default for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        AvlTree::new()
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<'tree, T> IntoIterator for &'tree AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> fmt::Debug for AvlTree<T>
where
    T: TreeNode<Links<T>> + fmt::Debug + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                balance: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    fn balance(&self) -> i8 {
        unsafe { (*self.inner.get()).balance }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_balance(&mut self, balance: i8) {
        self.inner.get_mut().balance = balance;
    }

    // Detaches the links from any tree.
    #[inline]
    fn clear(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.balance = 0;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("balance", &self.balance())
            .finish()
    }
}
