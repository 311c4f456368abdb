use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use packetizer_frame::{FeedStats, Message};
use packetizer_payload::{MsgPack, PayloadCodec};
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

/// Payload rendering for printed messages.
#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum PayloadView {
    /// UTF-8 text when valid, hex otherwise.
    Auto,
    Text,
    Hex,
    /// MessagePack rendered as JSON.
    Msgpack,
    Json,
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    index: u8,
    payload_size: usize,
    payload: String,
    source: &'a str,
    timestamp: String,
}

#[derive(Serialize)]
struct FrameOutput {
    index: u8,
    payload_size: usize,
    frame_size: usize,
    frame: String,
}

pub fn print_message(message: &Message, source: &str, view: PayloadView, format: OutputFormat) {
    let payload = render_payload(message.payload.as_ref(), view);
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                index: message.index,
                payload_size: message.payload.len(),
                payload,
                source,
                timestamp: now_unix_seconds(),
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
                .set_header(vec!["INDEX", "SIZE", "SOURCE", "PAYLOAD"])
                .add_row(vec![
                    format!("{:#04x}", message.index),
                    message.payload.len().to_string(),
                    source.to_string(),
                    payload,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "index={:#04x} size={} source={} payload={}",
                message.index,
                message.payload.len(),
                source,
                payload
            );
        }
        OutputFormat::Raw => {
            print_raw(message.payload.as_ref());
        }
    }
}

pub fn print_frame(index: u8, payload_size: usize, frame: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                index,
                payload_size,
                frame_size: frame.len(),
                frame: to_hex(frame),
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
                .set_header(vec!["INDEX", "PAYLOAD", "FRAME SIZE", "FRAME"])
                .add_row(vec![
                    format!("{index:#04x}"),
                    payload_size.to_string(),
                    frame.len().to_string(),
                    to_hex(frame),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", to_hex(frame)),
        OutputFormat::Raw => print_raw(frame),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Summary line on stderr, so it never mixes with message output.
pub fn print_stats(stats: &FeedStats) {
    eprintln!(
        "frames={} delivered={} unrouted={} errors={} (framing={} too_short={} integrity={}) discarded_bytes={}",
        stats.frames,
        stats.delivered,
        stats.unrouted,
        stats.errors(),
        stats.framing_errors,
        stats.too_short,
        stats.integrity_errors,
        stats.discarded_bytes
    );
}

pub fn render_payload(payload: &[u8], view: PayloadView) -> String {
    match view {
        PayloadView::Auto => match std::str::from_utf8(payload) {
            Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
            _ => to_hex(payload),
        },
        PayloadView::Text => String::from_utf8_lossy(payload).into_owned(),
        PayloadView::Hex => to_hex(payload),
        PayloadView::Msgpack => match MsgPack::compact().unpack::<serde_json::Value>(payload) {
            Ok(value) => value.to_string(),
            Err(_) => format!("<invalid msgpack: {}>", to_hex(payload)),
        },
        PayloadView::Json => match serde_json::from_slice::<serde_json::Value>(payload) {
            Ok(value) => value.to_string(),
            Err(_) => format!("<invalid json: {}>", to_hex(payload)),
        },
    }
}

/// Lowercase hex, space separated.
pub fn to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|byte| hex::encode([*byte]))
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
