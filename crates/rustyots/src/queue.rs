//! Bounded FIFO queue
//!
//! A fixed-capacity ring buffer used to park outbound work (indications,
//! read and write requests) while the transport is busy. Every operation is
//! performed under the queue's own lock, so producers running on another
//! thread never observe a partially updated head or count.
//!
//! When the queue is full, an optional overflow callback decides whether the
//! oldest entry may be discarded to make room for the new one.

use crate::error::{Error, Result};
use log::warn;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Decides whether the head entry may be dropped when the queue is full
pub type OverflowCallback<T> = Box<dyn FnMut(&T) -> bool + Send>;

struct QueueInner<T> {
    slots: Vec<Option<T>>,
    head: usize,
    count: usize,
    initialized: bool,
    overflow: Option<OverflowCallback<T>>,
}

impl<T> QueueInner<T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    fn tail(&self) -> usize {
        (self.head + self.count) % self.capacity()
    }

    fn pop_head(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        item
    }
}

/// Fixed-capacity FIFO guarded by a mutex
pub struct BoundedQueue<T> {
    inner: Mutex<QueueInner<T>>,
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BoundedQueue<T> {
    /// Create a queue that must be initialized before use
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                slots: Vec::new(),
                head: 0,
                count: 0,
                initialized: false,
                overflow: None,
            }),
        }
    }

    /// Create an initialized queue holding at most `capacity` items
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let queue = Self::new();
        queue.init(capacity)?;
        Ok(queue)
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_initialized(&self) -> Result<MutexGuard<'_, QueueInner<T>>> {
        let inner = self.lock();
        if !inner.initialized {
            return Err(Error::NotInitialized);
        }
        Ok(inner)
    }

    /// (Re)initialize the queue, dropping any queued items
    ///
    /// The overflow callback survives re-initialization.
    pub fn init(&self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(Error::InvalidParameter("queue capacity must be non-zero"));
        }
        let mut inner = self.lock();
        inner.slots = (0..capacity).map(|_| None).collect();
        inner.head = 0;
        inner.count = 0;
        inner.initialized = true;
        Ok(())
    }

    /// Install or remove the overflow callback
    pub fn set_overflow_callback(&self, callback: Option<OverflowCallback<T>>) -> Result<()> {
        let mut inner = self.lock_initialized()?;
        inner.overflow = callback;
        Ok(())
    }

    /// Append an item at the tail
    ///
    /// On a full queue the overflow callback is asked about the head item;
    /// if it agrees the head is discarded, otherwise (or without a callback)
    /// the queue is left unchanged and `Error::WouldOverflow` is returned.
    pub fn add(&self, item: T) -> Result<()> {
        let mut inner = self.lock_initialized()?;
        if inner.is_full() {
            let state = &mut *inner;
            let discard = match (state.overflow.as_mut(), state.slots[state.head].as_ref()) {
                (Some(callback), Some(oldest)) => callback(oldest),
                _ => false,
            };
            if !discard {
                return Err(Error::WouldOverflow);
            }
            warn!("Queue full, discarding oldest entry");
            inner.pop_head();
        }
        let tail = inner.tail();
        inner.slots[tail] = Some(item);
        inner.count += 1;
        Ok(())
    }

    /// Remove and return the head item
    pub fn remove(&self) -> Result<T> {
        let mut inner = self.lock_initialized()?;
        inner.pop_head().ok_or(Error::Empty)
    }

    /// Offer the head item to `send` and remove it only if `send` succeeds
    ///
    /// The peek, the call and the removal happen under one lock hold, so a
    /// concurrent `add` cannot interleave. The error of `send` is returned
    /// unchanged and the item stays queued.
    pub fn send_head<F>(&self, send: F) -> Result<()>
    where
        F: FnOnce(&T) -> Result<()>,
    {
        let mut inner = self.lock_initialized()?;
        let head = inner.head;
        let item = match inner.slots[head].as_ref() {
            Some(item) if inner.count > 0 => item,
            _ => return Err(Error::Empty),
        };
        send(item)?;
        inner.pop_head();
        Ok(())
    }

    /// Drop every queued item
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.lock_initialized()?;
        while inner.pop_head().is_some() {}
        inner.head = 0;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().count == 0
    }

    pub fn is_full(&self) -> bool {
        let inner = self.lock();
        inner.initialized && inner.is_full()
    }

    pub fn len(&self) -> usize {
        self.lock().count
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }
}

impl<T: Clone> BoundedQueue<T> {
    /// Return a copy of the head item without removing it
    pub fn peek(&self) -> Result<T> {
        let inner = self.lock_initialized()?;
        if inner.count == 0 {
            return Err(Error::Empty);
        }
        inner.slots[inner.head].clone().ok_or(Error::Empty)
    }
}
