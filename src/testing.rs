//! Shared fixtures for unit tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::TelegramConfig;
use crate::context::{ChatLookup, ProcessingContext};
use crate::event::{
    CallbackEvent, Command, ConversationKey, InboundEvent, InlineQueryEvent, MessageEvent,
};
use crate::handler::Action;
use crate::outbound::{Keyboard, Messenger};
use crate::store::{ChatState, ChatStore};

pub const BOT_USERNAME: &str = "testbot";

static NEXT_UPDATE_ID: AtomicU32 = AtomicU32::new(1);

fn next_update_id() -> u32 {
    NEXT_UPDATE_ID.fetch_add(1, Ordering::SeqCst)
}

pub fn telegram_config() -> Arc<TelegramConfig> {
    Arc::new(TelegramConfig {
        bot_token: "123:test".to_string(),
        bot_username: BOT_USERNAME.to_string(),
        owner_id: None,
    })
}

pub fn message(chat_id: i64, text: &str) -> InboundEvent {
    let update_id = next_update_id();
    InboundEvent::Message(MessageEvent {
        update_id,
        chat_id,
        message_id: update_id as i32,
        text: text.to_string(),
        command: Command::parse(text, BOT_USERNAME),
        sender_name: "Tester".to_string(),
    })
}

pub fn callback(chat_id: i64, data: &str) -> InboundEvent {
    let update_id = next_update_id();
    InboundEvent::Callback(CallbackEvent {
        update_id,
        query_id: format!("cb-{}", update_id),
        chat_id,
        message_id: update_id as i32,
        data: data.to_string(),
    })
}

pub fn inline_query(query: &str) -> InboundEvent {
    let update_id = next_update_id();
    InboundEvent::InlineQuery(InlineQueryEvent {
        update_id,
        query_id: format!("iq-{}", update_id),
        query: query.to_string(),
    })
}

pub fn context(event: InboundEvent) -> ProcessingContext {
    ProcessingContext {
        event,
        config: telegram_config(),
        chat: ChatLookup::NotApplicable,
    }
}

/// Poll `condition` until it holds, failing the test after a few seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Started,
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub action: String,
    pub update_id: u32,
    pub key: Option<ConversationKey>,
    pub phase: Phase,
}

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Panic,
    Hang,
    Sleep(Duration),
}

type Accepts = Box<dyn Fn(&ProcessingContext) -> Result<bool> + Send + Sync>;

/// Shared log of handler invocations
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.phase == Phase::Finished)
            .collect()
    }

    pub fn finished_count(&self) -> usize {
        self.finished().len()
    }

    fn make(&self, name: &str, behavior: Behavior, accepts: Option<Accepts>) -> Arc<dyn Action> {
        Arc::new(RecordingAction {
            name: name.to_string(),
            recorder: self.clone(),
            behavior,
            accepts,
        })
    }

    pub fn action(&self, name: &str) -> Arc<dyn Action> {
        self.make(name, Behavior::Succeed, None)
    }

    pub fn action_accepting(
        &self,
        name: &str,
        accepts: impl Fn(&ProcessingContext) -> Result<bool> + Send + Sync + 'static,
    ) -> Arc<dyn Action> {
        self.make(name, Behavior::Succeed, Some(Box::new(accepts)))
    }

    pub fn failing(&self, name: &str) -> Arc<dyn Action> {
        self.make(name, Behavior::Fail, None)
    }

    pub fn panicking(&self, name: &str) -> Arc<dyn Action> {
        self.make(name, Behavior::Panic, None)
    }

    pub fn hanging(&self, name: &str) -> Arc<dyn Action> {
        self.make(name, Behavior::Hang, None)
    }

    pub fn sleeping(&self, name: &str, duration: Duration) -> Arc<dyn Action> {
        self.make(name, Behavior::Sleep(duration), None)
    }

    fn record(&self, name: &str, ctx: &ProcessingContext, phase: Phase) {
        self.calls.lock().unwrap().push(Call {
            action: name.to_string(),
            update_id: ctx.event.update_id(),
            key: ctx.event.conversation_key(),
            phase,
        });
    }
}

struct RecordingAction {
    name: String,
    recorder: Recorder,
    behavior: Behavior,
    accepts: Option<Accepts>,
}

#[async_trait]
impl Action for RecordingAction {
    fn accepts(&self, ctx: &ProcessingContext) -> Result<bool> {
        match &self.accepts {
            Some(accepts) => accepts(ctx),
            None => Ok(true),
        }
    }

    async fn process(&self, ctx: &ProcessingContext) -> Result<()> {
        self.recorder.record(&self.name, ctx, Phase::Started);
        match self.behavior {
            Behavior::Succeed => {}
            Behavior::Fail => {
                self.recorder.record(&self.name, ctx, Phase::Finished);
                bail!("{} refused update {}", self.name, ctx.event.update_id());
            }
            Behavior::Panic => panic!("{} blew up", self.name),
            Behavior::Hang => std::future::pending::<()>().await,
            Behavior::Sleep(duration) => tokio::time::sleep(duration).await,
        }
        self.recorder.record(&self.name, ctx, Phase::Finished);
        Ok(())
    }
}

/// Store whose every call fails
pub struct FailingStore;

#[async_trait]
impl ChatStore for FailingStore {
    async fn get(&self, _key: ConversationKey) -> Result<Option<ChatState>> {
        bail!("database is down")
    }

    async fn upsert(&self, _key: ConversationKey, _state: &ChatState) -> Result<()> {
        bail!("database is down")
    }
}

/// Store whose first lookup panics; afterwards every chat is new
#[derive(Default)]
pub struct PanicOnceStore {
    panicked: AtomicBool,
}

#[async_trait]
impl ChatStore for PanicOnceStore {
    async fn get(&self, _key: ConversationKey) -> Result<Option<ChatState>> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("store connection poisoned");
        }
        Ok(None)
    }

    async fn upsert(&self, _key: ConversationKey, _state: &ChatState) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

/// Messenger that records outbound calls instead of talking to Telegram
#[derive(Default)]
pub struct MockMessenger {
    pub sent: Mutex<Vec<SentMessage>>,
    pub deleted: Mutex<Vec<(i64, i32)>>,
    fail_deletes: AtomicBool,
}

impl MockMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(i64, i32)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<i32> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(1000 + sent.len() as i32)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            bail!("message {} can't be deleted", message_id);
        }
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }
}
