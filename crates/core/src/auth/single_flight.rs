//! Coalescing of concurrent identical operations
//!
//! The first caller spawns the operation on the runtime; every caller that
//! arrives while it runs awaits the same shared result. Because the work is
//! spawned, dropping or cancelling any waiter (including the first) never
//! cancels the operation itself.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

type Flight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct Slot<T, E> {
    generation: u64,
    flight: Option<Flight<T, E>>,
}

pub struct SingleFlight<T, E> {
    slot: Arc<Mutex<Slot<T, E>>>,
    on_abort: fn(String) -> E,
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// `on_abort` converts a panicked or aborted task into an error for the
    /// waiters.
    pub fn new(on_abort: fn(String) -> E) -> Self {
        Self { slot: Arc::new(Mutex::new(Slot { generation: 0, flight: None })), on_abort }
    }

    pub fn in_flight(&self) -> bool {
        self.slot.lock().flight.is_some()
    }

    /// Join the running flight, or start one with `start`.
    ///
    /// `start` is only invoked when no flight is running. The slot is cleared
    /// by the flight itself on completion, so a caller arriving afterwards
    /// starts a new flight instead of observing an old result.
    pub async fn run<F, Fut>(&self, start: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let flight = {
            let mut slot = self.slot.lock();
            match slot.flight.clone() {
                Some(running) => running,
                None => {
                    slot.generation = slot.generation.wrapping_add(1);
                    let generation = slot.generation;
                    let operation = start();
                    let slot_handle = Arc::clone(&self.slot);

                    let handle = tokio::spawn(async move {
                        let result = operation.await;
                        let mut slot = slot_handle.lock();
                        if slot.generation == generation {
                            slot.flight = None;
                        }
                        result
                    });

                    let on_abort = self.on_abort;
                    let flight = async move {
                        match handle.await {
                            Ok(result) => result,
                            Err(join_error) => Err(on_abort(join_error.to_string())),
                        }
                    }
                    .boxed()
                    .shared();

                    slot.flight = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }
}
