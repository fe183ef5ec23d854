//! Client side of a chat exchange: post the user's message to the
//! relay and parse the streamed response into conversation state.
use anyhow::{Result, bail};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::models::MessageId;
use super::parser::{Action, EventParser};
use super::store::{ConversationState, ExchangeId, ExchangeOutcome};

#[derive(Serialize)]
struct RelayRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct RelayError {
    error: String,
    details: Option<String>,
}

#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    relay_url: String,
}

impl ChatClient {
    pub fn new(relay_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            relay_url: relay_url.to_string(),
        }
    }

    /// Run one exchange to completion, cancellation or failure.
    ///
    /// `observe` is called after every action is applied so a UI can
    /// render progress. Transport and stream failures are recorded on
    /// the state's error banner and reported as `ExchangeOutcome::Failed`
    /// rather than returned as errors. The only error is trying to
    /// start while another exchange is still running.
    pub async fn send<F>(
        &self,
        state: &mut ConversationState,
        input: &str,
        cancel: CancellationToken,
        mut observe: F,
    ) -> Result<ExchangeOutcome>
    where
        F: FnMut(&ConversationState, &Action),
    {
        let (exchange, _) = state.begin_exchange(input)?;

        let request = self.http.post(&self.relay_url).json(&RelayRequest {
            message: input,
            thread_id: state.thread_identifier(),
        });
        tracing::debug!(
            "Sending message to {} (thread {:?})",
            self.relay_url,
            state.thread_identifier()
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(finish(state, exchange, None, ExchangeOutcome::Cancelled));
            }
            res = request.send() => res,
        };

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                let outcome = ExchangeOutcome::Failed(format!("Relay request failed: {}", e));
                return Ok(finish(state, exchange, None, outcome));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<RelayError>(&text) {
                Ok(RelayError {
                    error,
                    details: Some(details),
                }) => format!("{}: {}", error, details),
                Ok(RelayError { error, .. }) => error,
                Err(_) => format!("Relay returned {}", status),
            };
            return Ok(finish(state, exchange, None, ExchangeOutcome::Failed(reason)));
        }

        let Some(message_id) = state.open_assistant_message(exchange) else {
            bail!("Exchange was superseded before the response arrived");
        };

        let mut parser = EventParser::new();
        let mut stream = response.bytes_stream();
        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break ExchangeOutcome::Cancelled,
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        let actions = parser.feed(&bytes);
                        if !apply_all(state, exchange, &message_id, actions, &cancel, &mut observe) {
                            break ExchangeOutcome::Cancelled;
                        }
                        if parser.is_finished() {
                            break ExchangeOutcome::Completed;
                        }
                    }
                    Some(Err(e)) => {
                        break ExchangeOutcome::Failed(format!("Stream interrupted: {}", e));
                    }
                    None => {
                        let actions = parser.finish();
                        if !apply_all(state, exchange, &message_id, actions, &cancel, &mut observe) {
                            break ExchangeOutcome::Cancelled;
                        }
                        break ExchangeOutcome::Completed;
                    }
                },
            }
        };

        Ok(finish(state, exchange, Some(&message_id), outcome))
    }
}

// Stops as soon as the exchange is cancelled, even mid-chunk. Returns
// false if it stopped early.
fn apply_all<F>(
    state: &mut ConversationState,
    exchange: ExchangeId,
    message_id: &MessageId,
    actions: Vec<Action>,
    cancel: &CancellationToken,
    observe: &mut F,
) -> bool
where
    F: FnMut(&ConversationState, &Action),
{
    for action in actions {
        if cancel.is_cancelled() {
            return false;
        }
        apply(state, exchange, message_id, action, observe);
    }
    !cancel.is_cancelled()
}

fn apply<F>(
    state: &mut ConversationState,
    exchange: ExchangeId,
    message_id: &MessageId,
    action: Action,
    observe: &mut F,
) where
    F: FnMut(&ConversationState, &Action),
{
    state.apply(exchange, message_id, action.clone());
    observe(state, &action);
}

fn finish(
    state: &mut ConversationState,
    exchange: ExchangeId,
    message_id: Option<&MessageId>,
    outcome: ExchangeOutcome,
) -> ExchangeOutcome {
    match &outcome {
        ExchangeOutcome::Completed => tracing::debug!("Exchange completed"),
        ExchangeOutcome::Cancelled => tracing::debug!("Exchange cancelled by user"),
        ExchangeOutcome::Failed(reason) => tracing::error!("Exchange failed: {}", reason),
    }
    state.end_exchange(exchange, message_id, &outcome);
    outcome
}
