//! Console gateway – stdin lines in, replies on stdout.

use std::io::Write;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use banter_runtime::{GatewayError, MessagingGateway, OutboundMessage};
use banter_types::{AuthorId, InboundMessage};
use colored::Colorize;

/// Prefix marking a console line as a direct message.
pub const DIRECT_PREFIX: &str = "!dm ";

/// Author id used for the local operator.
pub const OPERATOR_ID: AuthorId = 1;

/// Turns console lines into inbound messages with increasing sequence ids.
pub struct ConsoleInput {
    conversation_id: i64,
    thread_id: Option<i64>,
    display_name: String,
    next_sequence: AtomicI64,
}

impl ConsoleInput {
    pub fn new(conversation_id: i64, thread_id: Option<i64>, display_name: impl Into<String>) -> Self {
        Self {
            conversation_id,
            thread_id,
            display_name: display_name.into(),
            next_sequence: AtomicI64::new(1),
        }
    }

    /// Parse one line.  Blank lines yield `None`.
    ///
    /// Direct messages live in the operator's own conversation, as in a
    /// private chat.
    pub fn parse_line(&self, line: &str) -> Option<InboundMessage> {
        let line = line.trim();
        let (text, direct) = match line.strip_prefix(DIRECT_PREFIX.trim_end()) {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => (rest.trim(), true),
            _ => (line, false),
        };
        if text.is_empty() {
            return None;
        }

        let mut msg = InboundMessage::new(OPERATOR_ID, self.display_name.clone(), text);
        msg.sequence_id = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        Some(if direct {
            msg.in_conversation(OPERATOR_ID, None).direct()
        } else {
            msg.in_conversation(self.conversation_id, self.thread_id)
        })
    }
}

/// Prints outbound messages to stdout.
#[derive(Default)]
pub struct ConsoleGateway;

#[async_trait]
impl MessagingGateway for ConsoleGateway {
    async fn send(&self, message: OutboundMessage) -> Result<(), GatewayError> {
        let mut out = std::io::stdout().lock();
        let written = write_message(&mut out, &message);
        drop(out);
        written
    }
}

fn write_message(out: &mut impl Write, message: &OutboundMessage) -> Result<(), GatewayError> {
    writeln!(out, "{}", render(message))
        .and_then(|()| out.flush())
        .map_err(|e| GatewayError::Send(e.to_string()))
}

fn render(message: &OutboundMessage) -> String {
    let tag = match message.reply_to_sequence {
        Some(seq) => format!("[bot → #{seq}]"),
        None => "[bot]".to_string(),
    };
    format!("{} {}", tag.cyan().bold(), message.text)
}
