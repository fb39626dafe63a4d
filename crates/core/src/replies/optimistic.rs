//! Optimistic mutation helper
//!
//! Shared by every optimistic change in the app: apply the tentative action,
//! issue the request, then either commit the server's answer or undo.

use std::future::Future;

use tracing::debug;

use super::store::ReducerStore;

pub struct OptimisticMutation<A> {
    apply: A,
    rollback: Option<A>,
}

impl<A> OptimisticMutation<A> {
    pub fn new(apply: A, rollback: Option<A>) -> Self {
        Self { apply, rollback }
    }

    /// Derive the undo action from the state as it is right before `apply`.
    pub fn from_state<S: Clone>(
        store: &ReducerStore<S, A>,
        apply: A,
        undo: impl FnOnce(&S) -> Option<A>,
    ) -> Self {
        let rollback = store.select(undo);
        Self { apply, rollback }
    }

    /// Run the mutation against `store`.
    ///
    /// `commit` maps the successful result to a follow-up action, such as
    /// swapping a temporary id for the server-assigned one.
    ///
    /// # Errors
    /// Returns the request's error after the rollback has been dispatched.
    pub async fn run<S, T, E, Fut, C>(
        self,
        store: &ReducerStore<S, A>,
        request: Fut,
        commit: C,
    ) -> Result<T, E>
    where
        S: Clone,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&T) -> Option<A>,
    {
        store.dispatch(self.apply);

        match request.await {
            Ok(value) => {
                if let Some(action) = commit(&value) {
                    store.dispatch(action);
                }
                Ok(value)
            }
            Err(err) => {
                if let Some(rollback) = self.rollback {
                    debug!("optimistic mutation failed; rolling back");
                    store.dispatch(rollback);
                }
                Err(err)
            }
        }
    }
}
