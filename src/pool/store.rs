//! Idle-instance stores for the pool.

use std::collections::VecDeque;

use super::AccessMode;

/// A pooled instance tagged with the slot it was created in.
#[derive(Debug)]
pub(super) struct Slotted<T> {
    pub value: T,
    pub slot: usize,
}

/// Holds idle instances; the discipline decides which one `take` returns.
#[derive(Debug)]
pub(super) enum Store<T> {
    Fifo(VecDeque<Slotted<T>>),
    Lifo(Vec<Slotted<T>>),
    /// Fixed slots (`None` = checked out) visited round-robin from `cursor`.
    Circular {
        slots: Vec<Option<T>>,
        cursor: usize,
    },
}

impl<T> Store<T> {
    pub(super) fn new(mode: AccessMode, capacity: usize) -> Self {
        match mode {
            AccessMode::Fifo => Self::Fifo(VecDeque::with_capacity(capacity)),
            AccessMode::Lifo => Self::Lifo(Vec::with_capacity(capacity)),
            AccessMode::Circular => Self::Circular {
                slots: Vec::with_capacity(capacity),
                cursor: 0,
            },
        }
    }

    pub(super) fn take(&mut self) -> Option<Slotted<T>> {
        match self {
            Self::Fifo(queue) => queue.pop_front(),
            Self::Lifo(stack) => stack.pop(),
            Self::Circular { slots, cursor } => {
                let n = slots.len();
                for step in 0..n {
                    let slot = (*cursor + step) % n;
                    if let Some(value) = slots[slot].take() {
                        *cursor = (slot + 1) % n;
                        return Some(Slotted { value, slot });
                    }
                }
                None
            }
        }
    }

    pub(super) fn put(&mut self, item: Slotted<T>) {
        match self {
            Self::Fifo(queue) => queue.push_back(item),
            Self::Lifo(stack) => stack.push(item),
            Self::Circular { slots, .. } => {
                if item.slot >= slots.len() {
                    slots.resize_with(item.slot + 1, || None);
                }
                slots[item.slot] = Some(item.value);
            }
        }
    }

    /// Remove every idle instance.
    pub(super) fn drain(&mut self) -> Vec<T> {
        match self {
            Self::Fifo(queue) => queue.drain(..).map(|s| s.value).collect(),
            Self::Lifo(stack) => stack.drain(..).map(|s| s.value).collect(),
            Self::Circular { slots, .. } => slots.iter_mut().filter_map(Option::take).collect(),
        }
    }

    pub(super) fn idle(&self) -> usize {
        match self {
            Self::Fifo(queue) => queue.len(),
            Self::Lifo(stack) => stack.len(),
            Self::Circular { slots, .. } => slots.iter().filter(|s| s.is_some()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(mode: AccessMode) -> Store<&'static str> {
        let mut store = Store::new(mode, 3);
        for (slot, value) in ["a", "b", "c"].into_iter().enumerate() {
            store.put(Slotted { value, slot });
        }
        store
    }

    #[test]
    fn test_fifo_order() {
        let mut store = filled(AccessMode::Fifo);
        assert_eq!(store.take().unwrap().value, "a");
        assert_eq!(store.take().unwrap().value, "b");
    }

    #[test]
    fn test_lifo_order() {
        let mut store = filled(AccessMode::Lifo);
        assert_eq!(store.take().unwrap().value, "c");
        assert_eq!(store.take().unwrap().value, "b");
    }

    #[test]
    fn test_circular_round_robin() {
        let mut store = filled(AccessMode::Circular);
        let a = store.take().unwrap();
        assert_eq!(a.value, "a");
        // Returning `a` immediately must not make it the next pick
        store.put(a);
        assert_eq!(store.take().unwrap().value, "b");
        assert_eq!(store.take().unwrap().value, "c");
        assert_eq!(store.take().unwrap().value, "a");
        assert!(store.take().is_none());
    }

    #[test]
    fn test_drain_and_idle() {
        let mut store = filled(AccessMode::Circular);
        let _ = store.take();
        assert_eq!(store.idle(), 2);
        assert_eq!(store.drain().len(), 2);
        assert_eq!(store.idle(), 0);
    }
}
