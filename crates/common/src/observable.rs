//! Synchronous broadcast points.
//!
//! Registration is append-only. Removal only tombstones an observer; the
//! list is compacted before the next dispatch starts, so a dispatch never
//! walks a list that changes under it.

/// Mask that matches every observer.
pub const MASK_ALL: u32 = u32::MAX;

/// Per-dispatch state handed to each observer.
#[derive(Debug, Clone, Default)]
pub struct EventState {
    /// Stop the dispatch after the current observer.
    pub skip_next_observers: bool,
    /// Mask the dispatch was issued with.
    pub mask: u32,
    /// Set by an observer to remove itself once it returns.
    pub unregister: bool,
}

/// Returned by [`Observable::add`]; removes the observer later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

type Callback<T> = Box<dyn FnMut(&mut T, &mut EventState)>;

struct Observer<T> {
    handle: ObserverHandle,
    mask: u32,
    once: bool,
    removed: bool,
    callback: Callback<T>,
}

pub struct Observable<T> {
    observers: Vec<Observer<T>>,
    next_handle: u64,
    tombstones: usize,
}

impl<T> Default for Observable<T> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
            next_handle: 0,
            tombstones: 0,
        }
    }
}

impl<T> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl<T> Observable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for every mask.
    pub fn add(&mut self, callback: impl FnMut(&mut T, &mut EventState) + 'static) -> ObserverHandle {
        self.push(MASK_ALL, false, Box::new(callback))
    }

    /// Register an observer that only sees dispatches sharing a bit with `mask`.
    pub fn add_with_mask(
        &mut self,
        mask: u32,
        callback: impl FnMut(&mut T, &mut EventState) + 'static,
    ) -> ObserverHandle {
        self.push(mask, false, Box::new(callback))
    }

    /// Register an observer that is removed after its first call.
    pub fn add_once(&mut self, callback: impl FnMut(&mut T, &mut EventState) + 'static) -> ObserverHandle {
        self.push(MASK_ALL, true, Box::new(callback))
    }

    fn push(&mut self, mask: u32, once: bool, callback: Callback<T>) -> ObserverHandle {
        let handle = ObserverHandle(self.next_handle);
        self.next_handle += 1;
        self.observers.push(Observer {
            handle,
            mask,
            once,
            removed: false,
            callback,
        });
        handle
    }

    /// Tombstone an observer. Returns false if it was unknown or already gone.
    pub fn remove(&mut self, handle: ObserverHandle) -> bool {
        match self
            .observers
            .iter_mut()
            .find(|o| o.handle == handle && !o.removed)
        {
            Some(o) => {
                o.removed = true;
                self.tombstones += 1;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.observers.clear();
        self.tombstones = 0;
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len() - self.tombstones
    }

    pub fn has_observers(&self) -> bool {
        self.observer_count() > 0
    }

    /// True if a live observer listens to at least one bit of `mask`.
    pub fn has_specific_mask(&self, mask: u32) -> bool {
        self.observers
            .iter()
            .any(|o| !o.removed && o.mask & mask != 0)
    }

    /// Call every live observer whose mask matches, in registration order.
    ///
    /// Returns false when an observer cut the dispatch short.
    pub fn notify_observers(&mut self, event: &mut T, mask: u32) -> bool {
        self.compact();
        let mut state = EventState {
            skip_next_observers: false,
            mask,
            unregister: false,
        };
        for observer in self.observers.iter_mut() {
            if observer.removed || observer.mask & mask == 0 {
                continue;
            }
            state.unregister = false;
            (observer.callback)(event, &mut state);
            if observer.once || state.unregister {
                observer.removed = true;
                self.tombstones += 1;
            }
            if state.skip_next_observers {
                return false;
            }
        }
        true
    }

    fn compact(&mut self) {
        if self.tombstones > 0 {
            self.observers.retain(|o| !o.removed);
            self.tombstones = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn observers_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut obs: Observable<u32> = Observable::new();
        for tag in 0..3 {
            let log = log.clone();
            obs.add(move |_, _| log.borrow_mut().push(tag));
        }
        assert!(obs.notify_observers(&mut 0, MASK_ALL));
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn observers_can_mutate_the_event() {
        let mut obs: Observable<u32> = Observable::new();
        obs.add(|v, _| *v += 1);
        obs.add(|v, _| *v *= 10);
        let mut value = 1;
        obs.notify_observers(&mut value, MASK_ALL);
        assert_eq!(value, 20);
    }

    #[test]
    fn skip_next_observers_stops_dispatch() {
        let hits = Rc::new(RefCell::new(0));
        let mut obs: Observable<()> = Observable::new();
        obs.add(|_, state| state.skip_next_observers = true);
        let h = hits.clone();
        obs.add(move |_, _| *h.borrow_mut() += 1);
        assert!(!obs.notify_observers(&mut (), MASK_ALL));
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn masks_filter_observers() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut obs: Observable<()> = Observable::new();
        let h = hits.clone();
        obs.add_with_mask(0b01, move |_, _| h.borrow_mut().push("a"));
        let h = hits.clone();
        obs.add_with_mask(0b10, move |_, _| h.borrow_mut().push("b"));
        obs.notify_observers(&mut (), 0b10);
        assert_eq!(*hits.borrow(), vec!["b"]);
        assert!(obs.has_specific_mask(0b01));
        assert!(!obs.has_specific_mask(0b100));
    }

    #[test]
    fn add_once_fires_once() {
        let hits = Rc::new(RefCell::new(0));
        let mut obs: Observable<()> = Observable::new();
        let h = hits.clone();
        obs.add_once(move |_, _| *h.borrow_mut() += 1);
        obs.notify_observers(&mut (), MASK_ALL);
        obs.notify_observers(&mut (), MASK_ALL);
        assert_eq!(*hits.borrow(), 1);
        assert!(!obs.has_observers());
    }

    #[test]
    fn observer_can_unregister_itself_mid_dispatch() {
        let hits = Rc::new(RefCell::new(0));
        let mut obs: Observable<()> = Observable::new();
        obs.add(|_, state| state.unregister = true);
        let h = hits.clone();
        obs.add(move |_, _| *h.borrow_mut() += 1);
        obs.notify_observers(&mut (), MASK_ALL);
        assert_eq!(obs.observer_count(), 1);
        obs.notify_observers(&mut (), MASK_ALL);
        assert_eq!(*hits.borrow(), 2);
    }

    #[test]
    fn remove_tombstones_until_next_dispatch() {
        let mut obs: Observable<()> = Observable::new();
        let a = obs.add(|_, _| {});
        obs.add(|_, _| {});
        assert!(obs.remove(a));
        assert!(!obs.remove(a));
        assert_eq!(obs.observer_count(), 1);
        obs.notify_observers(&mut (), MASK_ALL);
        assert_eq!(obs.observer_count(), 1);
    }
}
