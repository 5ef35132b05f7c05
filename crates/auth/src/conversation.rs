/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::errors::ConversationError;
use crate::errors::ConversationStatus;
use crate::message::Message;
use crate::message::MessageStyle;
use crate::message::SessionToken;
use crate::secret::SecretResponse;
use crate::ConversationResult;

pub const MAX_MESSAGES: usize = 32;

/// Caller supplied responder, invoked once per message.
pub trait Conversation {
    fn respond(
        &mut self,
        style: MessageStyle,
        prompt: &str,
        token: SessionToken,
    ) -> Result<SecretResponse, ConversationStatus>;
}

impl<F> Conversation for F
where
    F: FnMut(MessageStyle, &str, SessionToken) -> Result<SecretResponse, ConversationStatus>,
{
    fn respond(
        &mut self,
        style: MessageStyle,
        prompt: &str,
        token: SessionToken,
    ) -> Result<SecretResponse, ConversationStatus> {
        self(style, prompt, token)
    }
}

/// Runs `conversation` over every message in order and returns the responses
/// index-aligned with `messages`.
///
/// On the first failure every response collected so far is scrubbed and
/// released, and no partial result is handed back.
pub fn converse<C>(
    conversation: &mut C,
    messages: &[Message<'_>],
    token: SessionToken,
) -> ConversationResult<Vec<SecretResponse>>
where
    C: Conversation + ?Sized,
{
    if messages.is_empty() || messages.len() > MAX_MESSAGES {
        return Err(ConversationError::BadMessageCount {
            count: messages.len(),
            max: MAX_MESSAGES,
        });
    }

    tracing::debug!(target: "auth", "conversation with {} message(s)", messages.len());

    let mut responses = Vec::with_capacity(messages.len());
    for (index, message) in messages.iter().enumerate() {
        match conversation.respond(message.style, message.text, token) {
            Ok(response) => responses.push(response),
            Err(status) => {
                tracing::warn!(
                    target: "auth",
                    "conversation failed on message {index} with status {}, discarding {} response(s)",
                    status.0,
                    responses.len()
                );
                responses.iter_mut().for_each(SecretResponse::scrub);
                return Err(ConversationError::failed(index, status));
            }
        }
    }

    Ok(responses)
}
