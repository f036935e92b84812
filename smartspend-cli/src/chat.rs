//! Line-oriented chat loop.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use smartspend_core::Role;
use smartspend_intake::{IntakeOutcome, IntakePipeline};

use crate::chat_worker::{run_worker, ChatEvent, ChatRequest};

const BUSY: &str = "(still saving the last one, send that again in a moment)";

pub async fn run_chat(pipeline: Arc<IntakePipeline>, history: usize) -> Result<()> {
    let chat = pipeline.store().chat();
    for m in chat.iter().skip(chat.len().saturating_sub(history)) {
        print_message(m.role, &m.text);
    }
    println!("Tell me what you spent, e.g. \"uber 300 yesterday\". Ctrl-D or /quit to leave.");

    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(run_worker(pipeline.clone(), req_rx, ev_tx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_id = 0u64;
    let mut pending = 0usize;
    let mut input_open = true;

    while input_open || pending > 0 {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line? {
                    None => input_open = false,
                    Some(l) if matches!(l.trim(), "/quit" | "/exit") => input_open = false,
                    Some(l) => {
                        next_id += 1;
                        pending += 1;
                        if req_tx.send(ChatRequest { request_id: next_id, text: l }).is_err() {
                            break;
                        }
                    }
                }
            }
            ev = ev_rx.recv() => {
                let Some(ev) = ev else { break };
                if let ChatEvent::Completed { outcome, reply, .. } = ev {
                    pending = pending.saturating_sub(1);
                    match (outcome, reply) {
                        (IntakeOutcome::Busy, _) => println!("{BUSY}"),
                        (_, Some(text)) => print_message(Role::Assistant, &text),
                        _ => {}
                    }
                }
            }
        }
    }

    drop(req_tx);
    worker.abort();
    Ok(())
}

fn print_message(role: Role, text: &str) {
    match role {
        Role::User => println!("you> {text}"),
        Role::Assistant => println!("smartspend> {text}"),
    }
}
