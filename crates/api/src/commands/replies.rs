//! Reply commands
//!
//! Thin wrappers over [`ReplyService`]; obtain a service per post with
//! [`AppContext::replies`](crate::AppContext::replies).

use std::time::Instant;

use belay_core::ReplyService;
use belay_domain::{AuthError, Reply, ReplyId};

use crate::utils::logging::log_command_result;

fn non_empty(content: &str) -> Result<&str, AuthError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidRequest("reply content must not be empty".into()));
    }
    Ok(trimmed)
}

pub async fn load_replies(service: &ReplyService) -> Result<Vec<Reply>, AuthError> {
    let start = Instant::now();
    let result = service.load().await;
    log_command_result("replies::load", start, result)
}

pub async fn create_reply(service: &ReplyService, content: &str) -> Result<Reply, AuthError> {
    let start = Instant::now();
    let result = match non_empty(content) {
        Ok(content) => service.create(content).await,
        Err(err) => Err(err),
    };
    log_command_result("replies::create", start, result)
}

pub async fn edit_reply(
    service: &ReplyService,
    reply_id: &str,
    content: &str,
) -> Result<Reply, AuthError> {
    let start = Instant::now();
    let result = match non_empty(content) {
        Ok(content) => service.edit(&ReplyId::Server(reply_id.to_string()), content).await,
        Err(err) => Err(err),
    };
    log_command_result("replies::edit", start, result)
}

pub async fn delete_reply(service: &ReplyService, reply_id: &str) -> Result<(), AuthError> {
    let start = Instant::now();
    let result = service.delete(&ReplyId::Server(reply_id.to_string())).await;
    log_command_result("replies::delete", start, result)
}
