use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ipcseal_channel::{Envelope, EnvelopeMeta};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A message that passed verification, with where it was received.
pub struct Received<'a> {
    pub channel: Option<&'a str>,
    pub receiver: Option<&'a str>,
    pub meta: &'a EnvelopeMeta,
    pub message: &'a [u8],
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    schema_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receiver: Option<&'a str>,
    sender: &'a str,
    ts: u64,
    size: usize,
    payload: String,
}

pub fn print_message(received: &Received<'_>, format: OutputFormat) {
    let preview = payload_preview(received.message);
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                schema_id: "ipcseal.cli.v1.message-received",
                channel: received.channel,
                receiver: received.receiver,
                sender: &received.meta.client_id,
                ts: received.meta.ts,
                size: received.message.len(),
                payload: preview,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "RECEIVER", "SENDER", "TS", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    received.channel.unwrap_or("-").to_string(),
                    received.receiver.unwrap_or("-").to_string(),
                    received.meta.client_id.clone(),
                    received.meta.ts.to_string(),
                    received.message.len().to_string(),
                    preview,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "channel={} receiver={} sender={} ts={} size={} payload={}",
                received.channel.unwrap_or("-"),
                received.receiver.unwrap_or("-"),
                received.meta.client_id,
                received.meta.ts,
                received.message.len(),
                preview
            );
        }
        OutputFormat::Raw => {
            print_raw(received.message);
        }
    }
}

/// Envelopes are data: compact on one line unless a human asked for layout.
pub fn print_envelope(envelope: &Envelope, format: OutputFormat) {
    let rendered = match format {
        OutputFormat::Json | OutputFormat::Raw => serde_json::to_string(envelope),
        OutputFormat::Table | OutputFormat::Pretty => serde_json::to_string_pretty(envelope),
    };
    println!("{}", rendered.unwrap_or_else(|_| "{}".to_string()));
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
