//! Chat controller: the Idle/Responding state machine behind the chat screen.
//!
//! The controller owns the session and is only ever mutated from the UI event
//! loop. Work that has to wait (the API call and the typing timer) runs in
//! spawned tasks that report back through `ChatEvent`s, which the loop feeds
//! into [`ChatController::handle`]. Every event carries the turn it belongs to
//! so anything arriving after a cancel or a newer submit is dropped.

use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::FetchError;
use crate::fetcher::ResponseFetcher;
use crate::state::{ChatEntry, ChatSession, Origin};
use crate::typing::{TypingAnimator, TypingStep};

#[derive(Debug)]
pub enum ChatEvent {
    /// The outbound request for `turn` completed
    Fetched {
        turn: u64,
        result: Result<String, FetchError>,
    },
    /// Typing timer fired for `turn`
    Tick { turn: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    /// Nothing left after trimming
    Empty,
    /// A response is still in flight or being typed
    Busy,
}

/// Observable controller state. `Awaiting` and `Typing` together are "Responding".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Awaiting,
    Typing,
}

enum State {
    Idle,
    Awaiting {
        turn: u64,
    },
    Typing {
        turn: u64,
        animator: TypingAnimator,
        timer: JoinHandle<()>,
    },
}

pub struct ChatController {
    session: ChatSession,
    state: State,
    fetcher: ResponseFetcher,
    events: UnboundedSender<ChatEvent>,
    interval: Duration,
    turn: u64,
    last_failure: Option<String>,
}

impl ChatController {
    pub fn new(
        fetcher: ResponseFetcher,
        interval: Duration,
        events: UnboundedSender<ChatEvent>,
    ) -> Self {
        Self {
            session: ChatSession::new(),
            state: State::Idle,
            fetcher,
            events,
            interval,
            turn: 0,
            last_failure: None,
        }
    }

    /// Swap the fetcher used by later submissions; a request already in
    /// flight keeps the one it started with.
    pub fn set_fetcher(&mut self, fetcher: ResponseFetcher) {
        self.fetcher = fetcher;
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Awaiting { .. } => Phase::Awaiting,
            State::Typing { .. } => Phase::Typing,
        }
    }

    pub fn is_responding(&self) -> bool {
        self.phase() != Phase::Idle
    }

    pub fn is_awaiting(&self) -> bool {
        self.phase() == Phase::Awaiting
    }

    pub fn is_typing(&self) -> bool {
        self.phase() == Phase::Typing
    }

    /// Live partial text while a reply is being revealed
    pub fn typing_text(&self) -> Option<&str> {
        match &self.state {
            State::Typing { animator, .. } => Some(animator.partial()),
            _ => None,
        }
    }

    /// Message from the most recent failed request, cleared by the next submit
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Empty;
        }
        if self.is_responding() {
            tracing::debug!(phase = ?self.phase(), "submit rejected while responding");
            return SubmitOutcome::Busy;
        }

        self.session
            .push(ChatEntry::new(Origin::User, text, Local::now()));
        self.last_failure = None;

        let turn = self.next_turn();
        self.state = State::Awaiting { turn };
        tracing::info!(turn, chars = text.chars().count(), "submitting message");

        let fetcher = self.fetcher.clone();
        let events = self.events.clone();
        let prompt = text.to_string();
        tokio::spawn(async move {
            let result = fetcher.fetch(&prompt).await;
            let _ = events.send(ChatEvent::Fetched { turn, result });
        });

        SubmitOutcome::Sent
    }

    /// Type out an assistant message with no user turn before it.
    pub fn greet(&mut self, text: &str) -> bool {
        if self.is_responding() || text.trim().is_empty() {
            return false;
        }
        let turn = self.next_turn();
        self.start_typing(turn, text.to_string());
        true
    }

    /// Stop the typing animation and keep what was revealed.
    ///
    /// Only valid while typing; the outbound request itself can't be
    /// cancelled, so this is a no-op while awaiting it.
    pub fn cancel(&mut self) -> bool {
        if !self.is_typing() {
            return false;
        }
        if let Some((turn, mut animator)) = self.take_typing() {
            let partial = animator.stop();
            tracing::info!(
                turn,
                revealed = animator.revealed_chars(),
                "typing cancelled"
            );
            if !partial.trim().is_empty() {
                self.append_assistant(partial);
            }
        }
        true
    }

    pub fn handle(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Fetched { turn, result } => self.on_fetched(turn, result),
            ChatEvent::Tick { turn } => self.on_tick(turn),
        }
    }

    fn on_fetched(&mut self, turn: u64, result: Result<String, FetchError>) {
        if !matches!(self.state, State::Awaiting { turn: current } if current == turn) {
            tracing::debug!(turn, "ignoring stale response");
            return;
        }

        match result {
            Ok(text) => {
                tracing::info!(turn, chars = text.chars().count(), "response received");
                self.start_typing(turn, text);
            }
            Err(e) => {
                tracing::warn!(turn, error = %e, "generation request failed");
                self.last_failure = Some(e.to_string());
                self.state = State::Idle;
            }
        }
    }

    fn on_tick(&mut self, turn: u64) {
        let step = match &mut self.state {
            State::Typing {
                turn: current,
                animator,
                ..
            } if *current == turn => animator.tick(),
            _ => return,
        };

        if let TypingStep::Finished(text) = step {
            self.take_typing();
            tracing::debug!(turn, "typing finished");
            self.append_assistant(text);
        }
    }

    fn start_typing(&mut self, turn: u64, text: String) {
        let timer = self.spawn_timer(turn);
        self.state = State::Typing {
            turn,
            animator: TypingAnimator::new(text),
            timer,
        };
    }

    fn spawn_timer(&self, turn: u64) -> JoinHandle<()> {
        let events = self.events.clone();
        let period = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if events.send(ChatEvent::Tick { turn }).is_err() {
                    break;
                }
            }
        })
    }

    /// Leave the typing state, stopping its timer
    fn take_typing(&mut self) -> Option<(u64, TypingAnimator)> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Typing {
                turn,
                animator,
                timer,
            } => {
                timer.abort();
                Some((turn, animator))
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    fn append_assistant(&mut self, text: String) {
        self.session
            .push(ChatEntry::new(Origin::Assistant, text, Local::now()));
    }

    fn next_turn(&mut self) -> u64 {
        self.turn += 1;
        self.turn
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        if let State::Typing { timer, .. } = &self.state {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{GenerativeModel, PromptTemplate};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    struct Scripted {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn reply(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(text),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerativeModel for Scripted {
        async fn generate(&self, _prompt: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(text) => Ok(text.to_string()),
                None => Err(FetchError::Api {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }

    fn controller(model: Arc<Scripted>) -> (ChatController, UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = unbounded_channel();
        let fetcher = ResponseFetcher::new(model, PromptTemplate::default());
        (
            ChatController::new(fetcher, Duration::from_millis(50), tx),
            rx,
        )
    }

    fn transcript(chat: &ChatController) -> Vec<(Origin, String)> {
        chat.session()
            .entries()
            .iter()
            .map(|e| (e.origin(), e.text().to_string()))
            .collect()
    }

    /// Wait for the response and return its turn
    async fn await_response(chat: &mut ChatController, rx: &mut UnboundedReceiver<ChatEvent>) -> u64 {
        let event = rx.recv().await.unwrap();
        let turn = match &event {
            ChatEvent::Fetched { turn, .. } => *turn,
            other => panic!("expected a response, got {other:?}"),
        };
        chat.handle(event);
        turn
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_is_typed_then_finalized() {
        let model = Scripted::reply("Hello there");
        let (mut chat, mut rx) = controller(model.clone());

        assert_eq!(chat.submit("Hi"), SubmitOutcome::Sent);
        assert_eq!(transcript(&chat), vec![(Origin::User, "Hi".to_string())]);
        assert_eq!(chat.phase(), Phase::Awaiting);

        await_response(&mut chat, &mut rx).await;
        assert!(chat.is_typing());
        assert_eq!(chat.typing_text(), Some(""));

        let started = Instant::now();
        let mut partials: Vec<String> = Vec::new();
        while chat.is_responding() {
            chat.handle(rx.recv().await.unwrap());
            if let Some(partial) = chat.typing_text() {
                partials.push(partial.to_string());
            }
        }

        let expected: Vec<String> = (1..="Hello there".len())
            .map(|n| "Hello there"[..n].to_string())
            .collect();
        assert_eq!(partials, expected);
        // eleven reveals plus the completing tick, 50ms apart
        assert!(started.elapsed() >= Duration::from_millis(600));
        assert!(started.elapsed() < Duration::from_millis(650));

        assert_eq!(
            transcript(&chat),
            vec![
                (Origin::User, "Hi".to_string()),
                (Origin::Assistant, "Hello there".to_string()),
            ]
        );
        assert_eq!(chat.phase(), Phase::Idle);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_revealed_prefix() {
        let (mut chat, mut rx) = controller(Scripted::reply("Hello there"));
        chat.submit("Hi");
        let turn = await_response(&mut chat, &mut rx).await;

        for _ in 0..3 {
            chat.handle(rx.recv().await.unwrap());
        }
        assert_eq!(chat.typing_text(), Some("Hel"));

        assert!(chat.cancel());
        assert_eq!(chat.phase(), Phase::Idle);
        assert_eq!(
            transcript(&chat),
            vec![
                (Origin::User, "Hi".to_string()),
                (Origin::Assistant, "Hel".to_string()),
            ]
        );

        // a tick that was already queued must not resurrect the animation
        chat.handle(ChatEvent::Tick { turn });
        assert_eq!(chat.session().len(), 2);
        assert_eq!(chat.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_with_blank_prefix_appends_nothing() {
        let (mut chat, mut rx) = controller(Scripted::reply("  Hi"));
        chat.submit("Hi");
        await_response(&mut chat, &mut rx).await;
        chat.handle(rx.recv().await.unwrap());
        chat.handle(rx.recv().await.unwrap());
        assert_eq!(chat.typing_text(), Some("  "));

        assert!(chat.cancel());
        assert_eq!(transcript(&chat), vec![(Origin::User, "Hi".to_string())]);
        assert_eq!(chat.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_reply_is_kept_on_completion() {
        let (mut chat, mut rx) = controller(Scripted::reply("   "));
        chat.submit("Hi");
        while chat.is_responding() {
            chat.handle(rx.recv().await.unwrap());
        }

        assert_eq!(
            transcript(&chat),
            vec![
                (Origin::User, "Hi".to_string()),
                (Origin::Assistant, "   ".to_string()),
            ]
        );
        assert_eq!(chat.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_drops_turn() {
        let (mut chat, mut rx) = controller(Scripted::failing());
        chat.submit("Hi");
        await_response(&mut chat, &mut rx).await;

        assert_eq!(transcript(&chat), vec![(Origin::User, "Hi".to_string())]);
        assert_eq!(chat.phase(), Phase::Idle);
        assert_eq!(chat.last_failure(), Some("API error 503: unavailable"));

        // next submit is accepted and clears the notice
        assert_eq!(chat.submit("again"), SubmitOutcome::Sent);
        assert_eq!(chat.last_failure(), None);
    }

    #[tokio::test]
    async fn test_blank_submit_is_noop() {
        let model = Scripted::reply("unused");
        let (mut chat, _rx) = controller(model.clone());

        assert_eq!(chat.submit(""), SubmitOutcome::Empty);
        assert_eq!(chat.submit("   "), SubmitOutcome::Empty);

        assert!(chat.session().is_empty());
        assert_eq!(chat.phase(), Phase::Idle);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_user_text_is_trimmed() {
        let (mut chat, _rx) = controller(Scripted::reply("ok"));
        chat.submit("  Hi there \n");
        assert_eq!(transcript(&chat), vec![(Origin::User, "Hi there".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_rejected_while_responding() {
        let model = Scripted::reply("Hello there");
        let (mut chat, mut rx) = controller(model.clone());
        chat.submit("Hi");

        assert_eq!(chat.submit("second"), SubmitOutcome::Busy);
        assert!(!chat.cancel(), "cancel is not available before typing starts");
        assert_eq!(chat.phase(), Phase::Awaiting);

        await_response(&mut chat, &mut rx).await;
        assert_eq!(chat.submit("third"), SubmitOutcome::Busy);

        assert_eq!(chat.session().len(), 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let (mut chat, _rx) = controller(Scripted::reply("ok"));
        assert!(!chat.cancel());
        assert!(chat.session().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_types_without_user_entry() {
        let (mut chat, mut rx) = controller(Scripted::reply("unused"));
        assert!(chat.greet("Hello!"));
        assert!(!chat.greet("again"));

        while chat.is_responding() {
            chat.handle(rx.recv().await.unwrap());
        }

        assert_eq!(transcript(&chat), vec![(Origin::Assistant, "Hello!".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_entry_precedes_reply_across_turns() {
        let (mut chat, mut rx) = controller(Scripted::reply("ok"));

        for msg in ["one", "two"] {
            chat.submit(msg);
            while chat.is_responding() {
                chat.handle(rx.recv().await.unwrap());
            }
        }

        assert_eq!(
            transcript(&chat),
            vec![
                (Origin::User, "one".to_string()),
                (Origin::Assistant, "ok".to_string()),
                (Origin::User, "two".to_string()),
                (Origin::Assistant, "ok".to_string()),
            ]
        );
    }
}
