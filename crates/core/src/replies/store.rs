//! Observable reducer-driven state container

use tokio::sync::watch;

/// Holds `S`, applies actions through a pure reducer and notifies watchers.
pub struct ReducerStore<S, A> {
    state: watch::Sender<S>,
    reducer: fn(&S, A) -> S,
}

impl<S: Clone, A> ReducerStore<S, A> {
    pub fn new(initial: S, reducer: fn(&S, A) -> S) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state, reducer }
    }

    /// Apply one action atomically with respect to other dispatches.
    pub fn dispatch(&self, action: A) {
        let reducer = self.reducer;
        self.state.send_modify(|state| *state = reducer(state, action));
    }

    pub fn state(&self) -> S {
        self.state.borrow().clone()
    }

    /// Read a projection of the state without cloning all of it.
    pub fn select<R>(&self, select: impl FnOnce(&S) -> R) -> R {
        select(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(state: &u32, step: u32) -> u32 {
        state + step
    }

    #[test]
    fn dispatch_notifies_subscribers() {
        let store = ReducerStore::new(0, count);
        let mut watcher = store.subscribe();

        tokio_test::block_on(async {
            store.dispatch(2);
            watcher.changed().await.unwrap();
        });

        assert_eq!(*watcher.borrow(), 2);
        assert_eq!(store.select(|n| n * 10), 20);
    }
}
