//! Stream event and content-block types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One parsed JSON object from an agent's JSONL stream, tagged by `type`.
///
/// Unknown fields within a known variant are ignored (forward-compat);
/// an entirely unrecognised `type` is preserved verbatim in [`Other`] so
/// the upper layer can decide what to do with it.
///
/// [`Other`]: StreamEvent::Other
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Session-setup information emitted once at the start of a run.
    System {
        /// Identifier of the agent session.
        #[serde(default)]
        session_id: Option<String>,
        /// Tools made available to the agent.
        #[serde(default)]
        tools: Vec<String>,
        /// Model identifier the agent is using.
        #[serde(default)]
        model: Option<String>,
    },
    /// A turn produced by the assistant.
    Assistant {
        /// Ordered content blocks making up this turn.
        message: Message,
    },
    /// A turn supplied by the user (including tool results fed back in).
    User {
        /// Ordered content blocks making up this turn.
        message: Message,
    },
    /// Final summary emitted once at the end of a run.
    Result {
        /// Reported cost of the run, if the agent exposes one.
        #[serde(default)]
        cost_usd: Option<f64>,
        /// Total wall-clock duration in milliseconds.
        #[serde(default)]
        duration_ms: Option<u64>,
        /// Whether the run ended in an error.
        #[serde(default)]
        is_error: bool,
        /// Number of conversational turns taken.
        #[serde(default)]
        num_turns: Option<u32>,
    },
    /// Anything not matching a known `type`, preserved verbatim.
    #[serde(untagged)]
    Other(Value),
}

impl StreamEvent {
    /// Concatenate the text of every [`ContentBlock::Text`] block carried
    /// by this event, in order. Empty for variants with no message.
    pub fn text_content(&self) -> String {
        self.content_blocks()
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Every `tool_use` block carried by this event, in order.
    pub fn tool_uses(&self) -> Vec<&ContentBlock> {
        self.content_blocks()
            .into_iter()
            .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
            .collect()
    }

    /// Every `tool_result` block carried by this event, in order.
    pub fn tool_results(&self) -> Vec<&ContentBlock> {
        self.content_blocks()
            .into_iter()
            .filter(|b| matches!(b, ContentBlock::ToolResult { .. }))
            .collect()
    }

    fn content_blocks(&self) -> Vec<&ContentBlock> {
        match self {
            StreamEvent::Assistant { message } | StreamEvent::User { message } => {
                message.content.iter().collect()
            }
            _ => Vec::new(),
        }
    }
}

/// An assistant/user turn: an ordered list of content blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Ordered content blocks.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// A single block within a [`Message`]'s content list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text itself.
        text: String,
    },
    /// A tool invocation request. `input` is preserved verbatim for
    /// lossless display.
    ToolUse {
        /// Tool-call identifier.
        #[serde(default)]
        id: Option<String>,
        /// Tool name.
        name: String,
        /// Opaque call arguments.
        #[serde(default)]
        input: Value,
    },
    /// The result of a tool invocation. `content` is preserved verbatim.
    ToolResult {
        /// Tool-call identifier this result answers.
        #[serde(default)]
        tool_use_id: Option<String>,
        /// Opaque result payload.
        #[serde(default)]
        content: Value,
        /// Whether the tool invocation itself errored.
        #[serde(default)]
        is_error: bool,
    },
}
