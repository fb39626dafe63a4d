//! Reply list state and its pure reducer

use belay_domain::{Reply, ReplyId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplyState {
    pub replies: Vec<Reply>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ReplyState {
    pub fn find(&self, id: &ReplyId) -> Option<&Reply> {
        self.replies.iter().find(|reply| &reply.id == id)
    }

    pub fn position(&self, id: &ReplyId) -> Option<(usize, &Reply)> {
        self.replies.iter().enumerate().find(|(_, reply)| &reply.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.replies.iter().filter(|reply| reply.id.is_pending()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyAction {
    LoadStarted,
    Loaded(Vec<Reply>),
    LoadFailed(String),
    /// Append, or replace an entry with the same id.
    Added(Reply),
    /// Re-insert at a known index (used to undo a removal).
    Inserted { index: usize, reply: Reply },
    Edited { id: ReplyId, content: String },
    Removed(ReplyId),
    /// Swap a pending entry for its server-confirmed version in place.
    Reconciled { pending: ReplyId, confirmed: Reply },
}

/// Apply `action` to `state`, returning the next state.
pub fn reduce(state: &ReplyState, action: ReplyAction) -> ReplyState {
    let mut next = state.clone();
    match action {
        ReplyAction::LoadStarted => {
            next.loading = true;
            next.error = None;
        }
        ReplyAction::Loaded(replies) => {
            // Keep optimistic entries that the server has not confirmed yet.
            let pending: Vec<Reply> =
                state.replies.iter().filter(|reply| reply.id.is_pending()).cloned().collect();
            next.replies = replies;
            next.replies.extend(pending);
            next.loading = false;
        }
        ReplyAction::LoadFailed(message) => {
            next.loading = false;
            next.error = Some(message);
        }
        ReplyAction::Added(reply) => match next.replies.iter_mut().find(|r| r.id == reply.id) {
            Some(existing) => *existing = reply,
            None => next.replies.push(reply),
        },
        ReplyAction::Inserted { index, reply } => {
            if next.find(&reply.id).is_none() {
                let index = index.min(next.replies.len());
                next.replies.insert(index, reply);
            }
        }
        ReplyAction::Edited { id, content } => {
            if let Some(reply) = next.replies.iter_mut().find(|r| r.id == id) {
                reply.content = content;
            }
        }
        ReplyAction::Removed(id) => next.replies.retain(|reply| reply.id != id),
        ReplyAction::Reconciled { pending, confirmed } => {
            let already_listed = next.find(&confirmed.id).is_some();
            match next.replies.iter().position(|r| r.id == pending) {
                Some(index) if already_listed => {
                    next.replies.remove(index);
                }
                Some(index) => next.replies[index] = confirmed,
                None if !already_listed => next.replies.push(confirmed),
                None => {}
            }
        }
    }
    next
}
