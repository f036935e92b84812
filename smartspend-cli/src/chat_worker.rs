use std::sync::Arc;
use tokio::sync::mpsc;

use smartspend_core::Role;
use smartspend_intake::{IntakeOutcome, IntakePipeline};

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub request_id: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Started {
        request_id: u64,
    },
    /// The submission finished; `reply` is the assistant message it produced
    Completed {
        request_id: u64,
        outcome: IntakeOutcome,
        reply: Option<String>,
    },
}

/// Feed chat lines into the pipeline without blocking the input loop.
///
/// Each request runs on its own task, so a line typed while the previous one
/// is still with the parser reaches the pipeline and comes back as
/// [`IntakeOutcome::Busy`].
pub async fn run_worker(
    pipeline: Arc<IntakePipeline>,
    mut rx: mpsc::UnboundedReceiver<ChatRequest>,
    tx: mpsc::UnboundedSender<ChatEvent>,
) {
    while let Some(req) = rx.recv().await {
        let pipeline = pipeline.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(ChatEvent::Started {
                request_id: req.request_id,
            });
            let outcome = pipeline.submit(&req.text).await;
            let reply = match outcome {
                IntakeOutcome::Ignored | IntakeOutcome::Busy => None,
                _ => pipeline
                    .store()
                    .chat()
                    .into_iter()
                    .rev()
                    .find(|m| m.role == Role::Assistant)
                    .map(|m| m.text),
            };
            let _ = tx.send(ChatEvent::Completed {
                request_id: req.request_id,
                outcome,
                reply,
            });
        });
    }
}
