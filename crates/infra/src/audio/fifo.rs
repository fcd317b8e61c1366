//! Lock-free single-producer single-consumer FIFO of fixed-size elements
//!
//! This is the one synchronization primitive crossing the real-time
//! boundary. Slots are allocated once at construction; `push` and `pull`
//! copy elements in and out with `clone_from`, which for equal-length
//! sample blocks reuses the slot's storage and never allocates.
//!
//! The single-writer/single-reader discipline is enforced by construction:
//! `split` hands out exactly one `Producer` and one `Consumer`, both `Send`
//! and neither cloneable, so a second writer cannot exist.
//!
//! Performance characteristics:
//! - Wait-free push/pull (no locks, no retries)
//! - Cache-padded counters to prevent false sharing between cores
//! - No allocations after construction

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

/// Shared FIFO storage.
///
/// The write counter is advanced only by the producer, the read counter
/// only by the consumer; both increase monotonically and index the slot
/// array modulo its length. The queue is full when they differ by the
/// capacity, so every slot is usable.
pub struct Fifo<T> {
    slots: Box<[UnsafeCell<T>]>,
    write: CachePadded<AtomicUsize>,
    read: CachePadded<AtomicUsize>,
}

// SAFETY: a slot is touched by the producer only while it is outside the
// readable window and by the consumer only while it is inside it; the
// acquire/release pairs on the counters order those accesses.
unsafe impl<T: Send> Sync for Fifo<T> {}

impl<T: Clone> Fifo<T> {
    /// Build a FIFO with `capacity` preallocated slots, each initialized
    /// from `template`, and split it into its two endpoint handles.
    pub fn split(capacity: usize, template: T) -> (Producer<T>, Consumer<T>) {
        assert!(capacity > 0, "FIFO capacity must be non-zero");

        let slots: Box<[UnsafeCell<T>]> = (0..capacity)
            .map(|_| UnsafeCell::new(template.clone()))
            .collect();

        let shared = Arc::new(Fifo {
            slots,
            write: CachePadded::new(AtomicUsize::new(0)),
            read: CachePadded::new(AtomicUsize::new(0)),
        });

        (
            Producer {
                shared: Arc::clone(&shared),
            },
            Consumer { shared },
        )
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Writing endpoint; exactly one exists per FIFO.
pub struct Producer<T> {
    shared: Arc<Fifo<T>>,
}

impl<T: Clone> Producer<T> {
    /// Copy `item` into the next free slot.
    ///
    /// Returns `false` without blocking when the queue is full.
    pub fn push(&mut self, item: &T) -> bool {
        let write = self.shared.write.load(Ordering::Relaxed);
        let read = self.shared.read.load(Ordering::Acquire);

        if write - read == self.shared.capacity() {
            return false;
        }

        let index = write % self.shared.capacity();
        unsafe {
            // SAFETY: this slot is outside the readable window until the
            // write counter below is published.
            (*self.shared.slots[index].get()).clone_from(item);
        }

        self.shared.write.store(write + 1, Ordering::Release);
        true
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Number of free slots from the producer's point of view.
    pub fn free_slots(&self) -> usize {
        let write = self.shared.write.load(Ordering::Relaxed);
        let read = self.shared.read.load(Ordering::Acquire);
        self.shared.capacity() - (write - read)
    }
}

/// Reading endpoint; exactly one exists per FIFO.
pub struct Consumer<T> {
    shared: Arc<Fifo<T>>,
}

impl<T: Clone> Consumer<T> {
    /// Copy the oldest queued element into `out`.
    ///
    /// Returns `false` without blocking when the queue is empty.
    pub fn pull(&mut self, out: &mut T) -> bool {
        let read = self.shared.read.load(Ordering::Relaxed);
        let write = self.shared.write.load(Ordering::Acquire);

        if write == read {
            return false;
        }

        let index = read % self.shared.capacity();
        unsafe {
            // SAFETY: the acquire load of the write counter made the
            // producer's writes to this slot visible.
            out.clone_from(&*self.shared.slots[index].get());
        }

        self.shared.read.store(read + 1, Ordering::Release);
        true
    }

    /// Number of elements ready to pull.
    pub fn len(&self) -> usize {
        let read = self.shared.read.load(Ordering::Relaxed);
        let write = self.shared.write.load(Ordering::Acquire);
        write - read
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}
