//! Intrusive doubly linked list recording usage order.
//!
//! The front of the list is the most recently used node and the back is the
//! least recently used. Nodes are heap allocated and addressed by raw pointer
//! so that the owning store can keep a key → node index and promote or unlink
//! a node in O(1).

use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

/// A node in the list.
///
/// Head and tail sentinels carry no value; every other node holds one.
pub(crate) struct Node<T> {
    val: mem::MaybeUninit<T>,
    prev: *mut Node<T>,
    next: *mut Node<T>,
}

impl<T> Node<T> {
    fn new(val: T) -> Self {
        Node {
            val: mem::MaybeUninit::new(val),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    fn new_sigil() -> Self {
        Node {
            val: mem::MaybeUninit::uninit(),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Borrows the value of a non-sentinel node.
    ///
    /// # Safety
    ///
    /// Must only be called on nodes created by [`UsageList::push_front`].
    pub(crate) unsafe fn value(&self) -> &T {
        // SAFETY: the caller guarantees this is not a sentinel, so `val` is initialized.
        unsafe { self.val.assume_init_ref() }
    }

    /// Mutably borrows the value of a non-sentinel node.
    ///
    /// # Safety
    ///
    /// Must only be called on nodes created by [`UsageList::push_front`].
    pub(crate) unsafe fn value_mut(&mut self) -> &mut T {
        // SAFETY: the caller guarantees this is not a sentinel, so `val` is initialized.
        unsafe { self.val.assume_init_mut() }
    }

    /// Consumes a detached, boxed node and returns its value.
    ///
    /// # Safety
    ///
    /// Must only be called on nodes created by [`UsageList::push_front`].
    pub(crate) unsafe fn into_value(self: Box<Self>) -> T {
        // SAFETY: the caller guarantees this is not a sentinel, so `val` is initialized.
        unsafe { self.val.assume_init_read() }
    }
}

/// Unbounded doubly linked list with head and tail sentinels.
///
/// The list owns every node it hands out a pointer to. A pointer stays valid
/// until the node is removed through [`UsageList::remove`],
/// [`UsageList::pop_back`] or [`UsageList::clear`].
pub(crate) struct UsageList<T> {
    len: usize,
    head: *mut Node<T>,
    tail: *mut Node<T>,
}

impl<T> UsageList<T> {
    pub(crate) fn new() -> Self {
        let head = Box::into_raw(Box::new(Node::new_sigil()));
        let tail = Box::into_raw(Box::new(Node::new_sigil()));

        // SAFETY: head and tail are freshly allocated and valid.
        unsafe {
            (*head).next = tail;
            (*tail).prev = head;
        }

        UsageList { len: 0, head, tail }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a value at the most recently used end and returns its node.
    pub(crate) fn push_front(&mut self, val: T) -> NonNull<Node<T>> {
        let node = Box::into_raw(Box::new(Node::new(val)));
        // SAFETY: node is newly allocated and not linked into any list yet.
        unsafe { self.attach_front(node) };
        self.len += 1;
        // SAFETY: Box::into_raw never returns null.
        unsafe { NonNull::new_unchecked(node) }
    }

    /// Returns the least recently used node without unlinking it.
    pub(crate) fn back(&self) -> Option<NonNull<Node<T>>> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: tail is valid for the lifetime of the list and, the list being
        // non-empty, its predecessor is a value node.
        NonNull::new(unsafe { (*self.tail).prev })
    }

    /// Unlinks and returns the least recently used node.
    pub(crate) fn pop_back(&mut self) -> Option<Box<Node<T>>> {
        let node = self.back()?;
        // SAFETY: node was just read from the list and is a value node.
        unsafe { self.remove(node) }
    }

    /// Unlinks `node` from the list and hands ownership back to the caller.
    ///
    /// # Safety
    ///
    /// `node` must be a value node currently linked into this list.
    pub(crate) unsafe fn remove(&mut self, node: NonNull<Node<T>>) -> Option<Box<Node<T>>> {
        let node = node.as_ptr();
        if self.is_empty() || node == self.head || node == self.tail {
            return None;
        }
        // SAFETY: the caller guarantees node is linked into this list.
        unsafe {
            self.detach(node);
            self.len -= 1;
            Some(Box::from_raw(node))
        }
    }

    /// Moves `node` to the most recently used end.
    ///
    /// # Safety
    ///
    /// `node` must be a value node currently linked into this list.
    pub(crate) unsafe fn move_to_front(&mut self, node: NonNull<Node<T>>) {
        let node = node.as_ptr();
        // SAFETY: head is valid and the caller guarantees node is linked into this list.
        unsafe {
            if (*self.head).next == node {
                return;
            }
            self.detach(node);
            self.attach_front(node);
        }
    }

    /// Drops every value node, keeping the sentinels.
    pub(crate) fn clear(&mut self) {
        self.drain_back().for_each(drop);
    }

    /// Drains every value, least recently used first.
    pub(crate) fn drain_back(&mut self) -> impl Iterator<Item = T> + '_ {
        // SAFETY: pop_back only yields value nodes.
        std::iter::from_fn(move || self.pop_back().map(|node| unsafe { node.into_value() }))
    }

    unsafe fn detach(&mut self, node: *mut Node<T>) {
        // SAFETY: node is linked, so both neighbours are valid nodes of this list.
        unsafe {
            (*(*node).prev).next = (*node).next;
            (*(*node).next).prev = (*node).prev;
        }
    }

    unsafe fn attach_front(&mut self, node: *mut Node<T>) {
        // SAFETY: head is valid and node is not linked into any list.
        unsafe {
            (*node).next = (*self.head).next;
            (*node).prev = self.head;
            (*self.head).next = node;
            (*(*node).next).prev = node;
        }
    }
}

impl<T> Drop for UsageList<T> {
    fn drop(&mut self) {
        self.clear();
        // SAFETY: the sentinels were allocated in `new` and are freed exactly once here.
        unsafe {
            drop(Box::from_raw(self.head));
            drop(Box::from_raw(self.tail));
        }
    }
}

impl<T> fmt::Debug for UsageList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageList").field("len", &self.len).finish()
    }
}
