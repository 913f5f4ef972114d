//! Fixed-length slot ring shared by producers and workers.
//!
//! The slot array sits behind a single `parking_lot` mutex (the guard).
//! Read and write positions are only advanced while that guard is held,
//! but they are mirrored in atomics so [`SlotRing::depth`] can take a
//! lock-free, best-effort snapshot.
//!
//! Positions count every push and pop ever made; the slot index is the
//! position modulo capacity. Keeping them unwrapped lets a full ring report
//! `capacity` instead of aliasing to zero.

use super::task::Task;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Why [`SlotRing::push`] handed a task back.
#[derive(Debug)]
pub(crate) enum Rejected {
    /// The slot at the write index still holds an unclaimed task.
    Occupied(Task),
    /// The ring was closed.
    Closed(Task),
}

struct Slots {
    buf: Box<[Option<Task>]>,
    closed: bool,
}

pub(crate) struct SlotRing {
    slots: Mutex<Slots>,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
    capacity: usize,
}

impl SlotRing {
    pub fn new(capacity: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| Error::out_of_memory("slot array"))?;
        slots.resize_with(capacity, || None);

        Ok(Self {
            slots: Mutex::new(Slots {
                buf: slots.into_boxed_slice(),
                closed: false,
            }),
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store `task` at the write index and advance it.
    ///
    /// Hands the task back untouched if the ring is closed or the slot
    /// still holds an unclaimed task.
    pub fn push(&self, task: Task) -> std::result::Result<(), Rejected> {
        let mut slots = self.slots.lock();
        if slots.closed {
            return Err(Rejected::Closed(task));
        }
        let pos = self.write_pos.load(Ordering::Relaxed);
        let slot = &mut slots.buf[pos % self.capacity];
        if slot.is_some() {
            return Err(Rejected::Occupied(task));
        }
        *slot = Some(task);
        self.write_pos.store(pos.wrapping_add(1), Ordering::Relaxed);
        Ok(())
    }

    /// Store `task` at the write index even if the slot is occupied.
    ///
    /// Returns whatever was displaced.
    pub fn force_push(&self, task: Task) -> Option<Task> {
        let mut slots = self.slots.lock();
        let pos = self.write_pos.load(Ordering::Relaxed);
        let displaced = slots.buf[pos % self.capacity].replace(task);
        self.write_pos.store(pos.wrapping_add(1), Ordering::Relaxed);
        displaced
    }

    /// Take the task at the read index, leave the slot empty, and advance.
    ///
    /// The index advances even when the slot turns out to be empty.
    pub fn pop(&self) -> Option<Task> {
        let mut slots = self.slots.lock();
        let pos = self.read_pos.load(Ordering::Relaxed);
        let task = slots.buf[pos % self.capacity].take();
        self.read_pos.store(pos.wrapping_add(1), Ordering::Relaxed);
        task
    }

    pub fn write_index(&self) -> usize {
        self.write_pos.load(Ordering::Relaxed) % self.capacity
    }

    pub fn read_index(&self) -> usize {
        self.read_pos.load(Ordering::Relaxed) % self.capacity
    }

    /// Unsynchronized queue depth, clamped to `[0, capacity]`.
    pub fn depth(&self) -> usize {
        // read first: write only grows, so it cannot fall behind the value read
        let read = self.read_pos.load(Ordering::Relaxed);
        let write = self.write_pos.load(Ordering::Relaxed);
        write.saturating_sub(read).min(self.capacity)
    }

    /// Number of slots holding a task, counted under the guard.
    pub fn occupied(&self) -> usize {
        self.slots
            .lock()
            .buf
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Refuse further pushes and drop every queued task, returning how many
    /// there were.
    pub fn close(&self) -> usize {
        let mut slots = self.slots.lock();
        slots.closed = true;
        let mut dropped = 0;
        for slot in slots.buf.iter_mut() {
            if slot.take().is_some() {
                dropped += 1;
            }
        }
        let write = self.write_pos.load(Ordering::Relaxed);
        self.read_pos.store(write, Ordering::Relaxed);
        dropped
    }

    /// Put `task` in the slot at the write index without advancing anything.
    #[cfg(test)]
    pub(crate) fn plant_at_write_index(&self, task: Task) {
        let mut slots = self.slots.lock();
        let pos = self.write_pos.load(Ordering::Relaxed);
        slots.buf[pos % self.capacity] = Some(task);
    }
}

impl std::fmt::Debug for SlotRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotRing")
            .field("capacity", &self.capacity)
            .field("read_index", &self.read_index())
            .field("write_index", &self.write_index())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(n: u32) -> Task {
        Task::new(|_| {}).with_payload(n)
    }

    fn payload(task: &Task) -> u32 {
        *task.payload_as::<u32>().unwrap()
    }

    #[test]
    fn test_fifo_order_across_wrap() {
        let ring = SlotRing::new(3).unwrap();

        for round in 0..4u32 {
            ring.push(task(round * 2)).unwrap();
            ring.push(task(round * 2 + 1)).unwrap();
            assert_eq!(payload(&ring.pop().unwrap()), round * 2);
            assert_eq!(payload(&ring.pop().unwrap()), round * 2 + 1);
        }

        assert_eq!(ring.read_index(), 8 % 3);
        assert_eq!(ring.write_index(), 8 % 3);
        assert_eq!(ring.depth(), 0);
    }

    #[test]
    fn test_depth_matches_occupied_slots() {
        let ring = SlotRing::new(4).unwrap();

        for n in 0..4 {
            assert_eq!(ring.depth(), ring.occupied());
            ring.push(task(n)).unwrap();
        }
        // full ring reports capacity, not zero
        assert_eq!(ring.depth(), 4);
        assert_eq!(ring.occupied(), 4);

        ring.pop();
        assert_eq!(ring.depth(), 3);
        assert_eq!(ring.occupied(), 3);
    }

    #[test]
    fn test_push_into_occupied_slot_is_refused() {
        let ring = SlotRing::new(1).unwrap();
        ring.push(task(1)).unwrap();

        match ring.push(task(2)) {
            Err(Rejected::Occupied(rejected)) => assert_eq!(payload(&rejected), 2),
            other => panic!("unexpected push result: {:?}", other),
        }
        assert_eq!(ring.write_index(), 0);
        assert_eq!(payload(&ring.pop().unwrap()), 1);
    }

    #[test]
    fn test_force_push_displaces() {
        let ring = SlotRing::new(1).unwrap();
        ring.push(task(1)).unwrap();

        let displaced = ring.force_push(task(2)).unwrap();
        assert_eq!(payload(&displaced), 1);
        assert_eq!(payload(&ring.pop().unwrap()), 2);
    }

    #[test]
    fn test_pop_empty_slot_still_advances() {
        let ring = SlotRing::new(2).unwrap();
        assert!(ring.pop().is_none());
        assert_eq!(ring.read_index(), 1);
    }

    #[test]
    fn test_close_drops_everything_and_refuses_pushes() {
        let ring = SlotRing::new(4).unwrap();
        ring.push(task(1)).unwrap();
        ring.push(task(2)).unwrap();

        assert_eq!(ring.close(), 2);
        assert_eq!(ring.occupied(), 0);
        assert_eq!(ring.depth(), 0);
        assert!(matches!(ring.push(task(3)), Err(Rejected::Closed(_))));
    }

    #[test]
    fn test_oversized_ring_reports_oom() {
        let result = SlotRing::new(usize::MAX);
        assert!(matches!(result, Err(Error::OutOfMemory { .. })));
    }
}
