//! Reply service - authenticated CRUD with optimistic updates

use std::sync::Arc;

use belay_domain::constants::{POSTS_PATH, REPLIES_PATH};
use belay_domain::{ApiRequest, AuthError, Reply, ReplyDraft, ReplyId};
use tokio::sync::watch;
use tracing::{instrument, warn};

use super::optimistic::OptimisticMutation;
use super::reducer::{reduce, ReplyAction, ReplyState};
use super::store::ReducerStore;
use crate::auth::AuthenticatedRequestExecutor;

/// Replies of a single post.
pub struct ReplyService {
    executor: Arc<AuthenticatedRequestExecutor>,
    post_id: String,
    store: ReducerStore<ReplyState, ReplyAction>,
}

impl ReplyService {
    pub fn new(executor: Arc<AuthenticatedRequestExecutor>, post_id: impl Into<String>) -> Self {
        Self {
            executor,
            post_id: post_id.into(),
            store: ReducerStore::new(ReplyState::default(), reduce),
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn state(&self) -> ReplyState {
        self.store.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReplyState> {
        self.store.subscribe()
    }

    /// Fetch the reply list, replacing confirmed entries.
    ///
    /// # Errors
    /// Any [`AuthError`] from the request; the state records the failure.
    #[instrument(skip(self), fields(post_id = %self.post_id))]
    pub async fn load(&self) -> Result<Vec<Reply>, AuthError> {
        self.store.dispatch(ReplyAction::LoadStarted);
        match self.executor.execute_json::<Vec<Reply>>(ApiRequest::get(self.collection_path())).await
        {
            Ok(replies) => {
                self.store.dispatch(ReplyAction::Loaded(replies.clone()));
                Ok(replies)
            }
            Err(err) => {
                warn!(error = %err, "failed to load replies");
                self.store.dispatch(ReplyAction::LoadFailed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Post a reply; it is listed immediately under a pending id.
    ///
    /// # Errors
    /// Any [`AuthError`] from the request; the pending entry is removed.
    #[instrument(skip(self, content), fields(post_id = %self.post_id))]
    pub async fn create(&self, content: &str) -> Result<Reply, AuthError> {
        let request = ApiRequest::post(self.collection_path()).json(&ReplyDraft { content })?;
        let pending = Reply::pending(&self.post_id, content);
        let pending_id = pending.id.clone();

        OptimisticMutation::new(
            ReplyAction::Added(pending),
            Some(ReplyAction::Removed(pending_id.clone())),
        )
        .run(&self.store, self.executor.execute_json::<Reply>(request), |confirmed| {
            Some(ReplyAction::Reconciled { pending: pending_id, confirmed: confirmed.clone() })
        })
        .await
    }

    /// Change a confirmed reply's content.
    ///
    /// # Errors
    /// [`AuthError::InvalidRequest`] for pending replies, otherwise any
    /// request error; the previous content is restored.
    #[instrument(skip(self, content), fields(post_id = %self.post_id, reply_id = %id))]
    pub async fn edit(&self, id: &ReplyId, content: &str) -> Result<Reply, AuthError> {
        let request = ApiRequest::patch(Self::item_path(id)?).json(&ReplyDraft { content })?;

        OptimisticMutation::from_state(
            &self.store,
            ReplyAction::Edited { id: id.clone(), content: content.to_string() },
            |state| {
                state.find(id).map(|previous| ReplyAction::Edited {
                    id: id.clone(),
                    content: previous.content.clone(),
                })
            },
        )
        .run(&self.store, self.executor.execute_json::<Reply>(request), |updated| {
            Some(ReplyAction::Edited { id: id.clone(), content: updated.content.clone() })
        })
        .await
    }

    /// Delete a confirmed reply.
    ///
    /// # Errors
    /// [`AuthError::InvalidRequest`] for pending replies, otherwise any
    /// request error; the reply is re-inserted at its old position.
    #[instrument(skip(self), fields(post_id = %self.post_id, reply_id = %id))]
    pub async fn delete(&self, id: &ReplyId) -> Result<(), AuthError> {
        let request = ApiRequest::delete(Self::item_path(id)?);

        OptimisticMutation::from_state(&self.store, ReplyAction::Removed(id.clone()), |state| {
            state
                .position(id)
                .map(|(index, reply)| ReplyAction::Inserted { index, reply: reply.clone() })
        })
        .run(&self.store, async { self.executor.execute(request).await.map(|_| ()) }, |_| None)
        .await
    }

    fn collection_path(&self) -> String {
        format!("{POSTS_PATH}/{}/replies", urlencoding::encode(&self.post_id))
    }

    fn item_path(id: &ReplyId) -> Result<String, AuthError> {
        let server_id = id.server_id().ok_or_else(|| {
            AuthError::InvalidRequest(format!("reply {id} has not been confirmed by the server"))
        })?;
        Ok(format!("{REPLIES_PATH}/{}", urlencoding::encode(server_id)))
    }
}
