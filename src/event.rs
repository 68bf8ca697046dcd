use std::fmt;

/// Identifier grouping events that must be processed in order (one per chat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey(pub i64);

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bot commands the router knows how to bind handlers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Add,
    Remove,
    List,
    Lang,
    Ai,
    ElonMusk,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::Start,
        Command::Add,
        Command::Remove,
        Command::List,
        Command::Lang,
        Command::Ai,
        Command::ElonMusk,
    ];

    pub fn value(self) -> &'static str {
        match self {
            Command::Start => "/start",
            Command::Add => "/add",
            Command::Remove => "/remove",
            Command::List => "/list",
            Command::Lang => "/lang",
            Command::Ai => "/ai",
            Command::ElonMusk => "/elonmusk",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.value() == value)
    }

    /// Parse the leading command of a message.
    ///
    /// `/start` is accepted as is; `/start@name` only when `name` is this bot.
    pub fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        if !token.starts_with('/') {
            return None;
        }

        let parts: Vec<&str> = token.split('@').collect();
        match parts.as_slice() {
            [command] => Self::from_value(command),
            [command, addressee] if *addressee == bot_username => Self::from_value(command),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub update_id: u32,
    pub chat_id: i64,
    pub message_id: i32,
    pub text: String,
    pub command: Option<Command>,
    pub sender_name: String,
}

/// An inline keyboard button press
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackEvent {
    pub update_id: u32,
    pub query_id: String,
    pub chat_id: i64,
    pub message_id: i32,
    pub data: String,
}

/// An inline query typed in any chat; carries no conversation
#[derive(Debug, Clone, PartialEq)]
pub struct InlineQueryEvent {
    pub update_id: u32,
    pub query_id: String,
    pub query: String,
}

/// Platform-independent view of an inbound update
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Message(MessageEvent),
    Callback(CallbackEvent),
    InlineQuery(InlineQueryEvent),
}

impl InboundEvent {
    pub fn update_id(&self) -> u32 {
        match self {
            InboundEvent::Message(m) => m.update_id,
            InboundEvent::Callback(c) => c.update_id,
            InboundEvent::InlineQuery(q) => q.update_id,
        }
    }

    /// `None` for events that have no natural conversation (inline queries)
    pub fn conversation_key(&self) -> Option<ConversationKey> {
        match self {
            InboundEvent::Message(m) => Some(ConversationKey(m.chat_id)),
            InboundEvent::Callback(c) => Some(ConversationKey(c.chat_id)),
            InboundEvent::InlineQuery(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Message(_) => "message",
            InboundEvent::Callback(_) => "callback",
            InboundEvent::InlineQuery(_) => "inline_query",
        }
    }

    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            InboundEvent::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&CallbackEvent> {
        match self {
            InboundEvent::Callback(c) => Some(c),
            _ => None,
        }
    }

    #[allow(dead_code)]
    pub fn as_inline_query(&self) -> Option<&InlineQueryEvent> {
        match self {
            InboundEvent::InlineQuery(q) => Some(q),
            _ => None,
        }
    }
}

/// Conversion from a raw transport value into an [`InboundEvent`].
///
/// Returning `None` means the update is of no interest and is dropped.
pub trait IntoInboundEvent {
    fn into_inbound(self, bot_username: &str) -> Option<InboundEvent>;
}

impl IntoInboundEvent for InboundEvent {
    fn into_inbound(self, _bot_username: &str) -> Option<InboundEvent> {
        Some(self)
    }
}
