//! Progress lines emitted by the workflow runtime on stderr.
//!
//! The runtime prints free-form log output interleaved with a few structured
//! lines:
//!
//! ```text
//! Workflow started (3 nodes)
//! [LLM] running
//! [LLM] done
//! [Summarize] error: context window exceeded
//! ```
//!
//! Anything that does not match is ignored; a runtime that never prints these
//! lines still completes normally, just without progress events.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started {
        total_nodes: usize,
    },
    NodeRunning {
        node_name: String,
        current_index: usize,
        total_nodes: usize,
    },
    NodeDone {
        node_name: String,
        current_index: usize,
        total_nodes: usize,
    },
    NodeError {
        node_name: String,
        message: String,
    },
}

/// A structured line before it is annotated with counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressSignal {
    Started(usize),
    Running(String),
    Done(String),
    Error { node_name: String, message: String },
}

fn started_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)workflow\s+started\s*\(\s*(\d+)\s*nodes?\s*\)").unwrap())
}

fn node_error_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[([^\]]+)\]\s*error:\s*(.*)$").unwrap())
}

fn node_done_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[([^\]]+)\]\s*done\s*$").unwrap())
}

fn node_running_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[([^\]]+)\]\s*running\s*$").unwrap())
}

/// Recognize a single diagnostic line.
pub fn parse_line(line: &str) -> Option<ProgressSignal> {
    let line = line.trim();
    if let Some(caps) = started_re().captures(line) {
        return caps[1].parse().ok().map(ProgressSignal::Started);
    }
    // error before done/running: the message itself may end in either word
    if let Some(caps) = node_error_re().captures(line) {
        return Some(ProgressSignal::Error {
            node_name: caps[1].trim().to_string(),
            message: caps[2].trim().to_string(),
        });
    }
    if let Some(caps) = node_done_re().captures(line) {
        return Some(ProgressSignal::Done(caps[1].trim().to_string()));
    }
    if let Some(caps) = node_running_re().captures(line) {
        return Some(ProgressSignal::Running(caps[1].trim().to_string()));
    }
    None
}

/// Keeps the completed-node count and the last announced total so node
/// events can carry `current_index / total_nodes`.
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    completed: usize,
    total: usize,
}

impl ProgressTracker {
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn observe(&mut self, line: &str) -> Option<ProgressEvent> {
        parse_line(line).map(|signal| self.apply(signal))
    }

    pub fn apply(&mut self, signal: ProgressSignal) -> ProgressEvent {
        match signal {
            ProgressSignal::Started(total_nodes) => {
                self.total = total_nodes;
                ProgressEvent::Started { total_nodes }
            }
            ProgressSignal::Running(node_name) => ProgressEvent::NodeRunning {
                node_name,
                current_index: self.completed + 1,
                total_nodes: self.total,
            },
            ProgressSignal::Done(node_name) => {
                self.completed += 1;
                ProgressEvent::NodeDone {
                    node_name,
                    current_index: self.completed,
                    total_nodes: self.total,
                }
            }
            ProgressSignal::Error { node_name, message } => {
                ProgressEvent::NodeError { node_name, message }
            }
        }
    }
}
