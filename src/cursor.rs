use core::{marker::PhantomData, pin::Pin, ptr::NonNull};

use crate::{AvlTree, Link, Links, NodeRef, TreeNode};

/// A read-only cursor over an [`AvlTree`].
///
/// The cursor sits either on an element or on the "ghost" position between the last element and
/// the first. Stepping past either end lands on the ghost; stepping off the ghost wraps around.
pub struct Cursor<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    tree: &'tree AvlTree<T>,
    ptr: Link<T>,
}

impl<'tree, T> Cursor<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn first(tree: &'tree AvlTree<T>) -> Self {
        let ptr = tree.first_raw();
        Cursor { tree, ptr }
    }

    pub(crate) fn last(tree: &'tree AvlTree<T>) -> Self {
        let ptr = tree.last_raw();
        Cursor { tree, ptr }
    }

    pub(crate) fn at(tree: &'tree AvlTree<T>, ptr: Link<T>) -> Self {
        Cursor { tree, ptr }
    }

    /// Steps to the in-order successor.
    pub fn move_next(&mut self) {
        self.ptr = unsafe { step(self.tree, self.ptr, Step::Next) };
    }

    /// Steps to the in-order predecessor.
    pub fn move_prev(&mut self) {
        self.ptr = unsafe { step(self.tree, self.ptr, Step::Prev) };
    }

    /// Returns the current element, or `None` on the ghost position.
    pub fn get(&self) -> Option<&'tree T> {
        self.ptr.map(|p| unsafe { p.as_ref() })
    }

    /// Returns a view of the current node, including its balance and links.
    pub fn node(&self) -> Option<NodeRef<'tree, T>> {
        self.ptr.map(|p| NodeRef::new(self.tree, p))
    }

    /// Returns the element [`move_next`](Self::move_next) would land on.
    pub fn peek_next(&self) -> Option<&'tree T> {
        unsafe { step(self.tree, self.ptr, Step::Next).map(|p| p.as_ref()) }
    }

    /// Returns the element [`move_prev`](Self::move_prev) would land on.
    pub fn peek_prev(&self) -> Option<&'tree T> {
        unsafe { step(self.tree, self.ptr, Step::Prev).map(|p| p.as_ref()) }
    }
}

impl<T> Clone for Cursor<'_, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn clone(&self) -> Self {
        Cursor {
            tree: self.tree,
            ptr: self.ptr,
        }
    }
}

/// A cursor over an [`AvlTree`] that can remove elements.
///
/// Positions behave as for [`Cursor`].
pub struct CursorMut<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    tree: NonNull<AvlTree<T>>,
    ptr: Link<T>,
    _tree: PhantomData<&'tree mut AvlTree<T>>,
}

impl<'tree, T> CursorMut<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn first(tree: &'tree mut AvlTree<T>) -> Self {
        let ptr = tree.first_raw();
        CursorMut {
            tree: tree.into(),
            ptr,
            _tree: PhantomData,
        }
    }

    pub(crate) fn last(tree: &'tree mut AvlTree<T>) -> Self {
        let ptr = tree.last_raw();
        CursorMut {
            tree: tree.into(),
            ptr,
            _tree: PhantomData,
        }
    }

    pub(crate) fn at(tree: &'tree mut AvlTree<T>, ptr: Link<T>) -> Self {
        CursorMut {
            tree: tree.into(),
            ptr,
            _tree: PhantomData,
        }
    }

    #[inline]
    fn tree(&self) -> &AvlTree<T> {
        // SAFETY: the tree is mutably borrowed for `'tree` and only reachable through `self`.
        unsafe { self.tree.as_ref() }
    }

    /// Returns a read-only cursor at the current position.
    ///
    /// `self` stays borrowed for as long as the returned cursor lives.
    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor::at(self.tree(), self.ptr)
    }

    /// Steps to the in-order successor.
    pub fn move_next(&mut self) {
        self.ptr = unsafe { step(self.tree(), self.ptr, Step::Next) };
    }

    /// Steps to the in-order predecessor.
    pub fn move_prev(&mut self) {
        self.ptr = unsafe { step(self.tree(), self.ptr, Step::Prev) };
    }

    /// Returns the current element, or `None` on the ghost position.
    pub fn get(&self) -> Option<&T> {
        self.ptr.map(|p| unsafe { p.as_ref() })
    }

    /// Returns a pinned mutable reference to the current element.
    ///
    /// # Safety
    ///
    /// The caller must not change the element's key in a way that alters how it compares to the
    /// keys of other elements in the tree.
    pub unsafe fn get_mut(&mut self) -> Option<Pin<&mut T>> {
        self.ptr
            .map(|mut p| unsafe { Pin::new_unchecked(p.as_mut()) })
    }

    /// Returns the element [`move_next`](Self::move_next) would land on.
    pub fn peek_next(&self) -> Option<&T> {
        unsafe { step(self.tree(), self.ptr, Step::Next).map(|p| p.as_ref()) }
    }

    /// Returns the element [`move_prev`](Self::move_prev) would land on.
    pub fn peek_prev(&self) -> Option<&T> {
        unsafe { step(self.tree(), self.ptr, Step::Prev).map(|p| p.as_ref()) }
    }

    /// Removes the current element and moves to its successor.
    ///
    /// On the ghost position nothing is removed and `None` is returned.
    pub fn remove_current(&mut self) -> Option<T::Handle> {
        self.remove_and_step(Step::Next)
    }

    /// Removes the current element and moves to its predecessor.
    ///
    /// On the ghost position nothing is removed and `None` is returned.
    pub fn remove_current_and_move_prev(&mut self) -> Option<T::Handle> {
        self.remove_and_step(Step::Prev)
    }

    fn remove_and_step(&mut self, dir: Step) -> Option<T::Handle> {
        let current = self.ptr?;

        unsafe {
            // Removal relinks nodes but never moves them, so the neighbor found here stays valid.
            self.ptr = step(self.tree(), Some(current), dir);
            Some(self.tree.as_mut().remove_at(current))
        }
    }
}

#[derive(Copy, Clone)]
enum Step {
    Next,
    Prev,
}

unsafe fn step<T>(tree: &AvlTree<T>, from: Link<T>, dir: Step) -> Link<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        match (from, dir) {
            (Some(p), Step::Next) => tree.successor_raw(p),
            (Some(p), Step::Prev) => tree.predecessor_raw(p),
            (None, Step::Next) => tree.first_raw(),
            (None, Step::Prev) => tree.last_raw(),
        }
    }
}
