//! Publish-once cells for derived indices.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// A value computed on first use and published with compare-and-swap.
///
/// Racing initializers may each compute a value; the first to publish wins
/// and every caller, losers included, gets the published one.
pub struct LazyIndex<T> {
    cell: ArcSwapOption<T>,
}

impl<T> LazyIndex<T> {
    pub fn new() -> Self {
        Self {
            cell: ArcSwapOption::empty(),
        }
    }

    /// The published value, computing it with `init` if absent.
    pub fn get_or_init<F>(&self, init: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        if let Some(value) = self.cell.load_full() {
            return value;
        }

        let fresh = Arc::new(init());
        let previous = self
            .cell
            .compare_and_swap(&None::<Arc<T>>, Some(Arc::clone(&fresh)));
        match &*previous {
            Some(winner) => Arc::clone(winner),
            None => fresh,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.load().is_some()
    }
}

impl<T> Default for LazyIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LazyIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyIndex")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_computes_once_when_uncontended() {
        let index = LazyIndex::new();
        let calls = AtomicUsize::new(0);

        let a = index.get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            42
        });
        let b = index.get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            7
        });

        assert_eq!(*a, 42);
        assert_eq!(*b, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_racing_initializers_agree() {
        let index = Arc::new(LazyIndex::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let index = Arc::clone(&index);
                thread::spawn(move || index.get_or_init(|| i))
            })
            .collect();

        let results: Vec<Arc<i32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for result in &results {
            assert!(Arc::ptr_eq(result, &results[0]));
        }
    }
}
