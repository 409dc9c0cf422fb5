//! Serialised event delivery into a handler.
//!
//! Producers push events into an unbounded channel; one task drains it and
//! calls the handler, so handler calls never overlap. Joining the task after
//! every sender is gone waits for the in-flight call to finish.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::event::LiveEvent;
use crate::handler::{EventHandler, RoomContext};

pub type EventSender = mpsc::UnboundedSender<LiveEvent>;

pub struct EventDispatcher {
    tx: Option<EventSender>,
    task: Option<JoinHandle<usize>>,
}

impl EventDispatcher {
    /// Spawn the dispatch task. Must be called inside a tokio runtime.
    pub fn spawn(room: RoomContext, handler: Arc<dyn EventHandler>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(dispatch_loop(room, handler, rx));
        Self {
            tx: Some(tx),
            task: Some(task),
        }
    }

    /// A new producer handle, or `None` once the dispatcher is closing.
    pub fn sender(&self) -> Option<EventSender> {
        self.tx.clone()
    }

    /// Drop our own sender and wait for the queue to drain.
    /// Returns the number of events handled; 0 if already joined.
    pub async fn join(&mut self) -> Result<usize, JoinError> {
        self.tx = None;
        match self.task.take() {
            Some(task) => task.await,
            None => Ok(0),
        }
    }

    /// Stop delivering immediately; queued events are discarded.
    pub fn abort(&mut self) {
        self.tx = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn dispatch_loop(
    room: RoomContext,
    handler: Arc<dyn EventHandler>,
    mut rx: mpsc::UnboundedReceiver<LiveEvent>,
) -> usize {
    let mut handled = 0;
    while let Some(event) = rx.recv().await {
        match &event {
            LiveEvent::Heartbeat(ev) => handler.on_heartbeat(&room, ev),
            LiveEvent::ChatMessage(ev) => handler.on_chat_message(&room, ev),
        }
        handled += 1;
    }
    tracing::debug!(room_id = room.room_id, handled, "event dispatcher drained");
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ChatMessageEvent, HeartbeatEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tracks how many handler calls are running at the same time.
    #[derive(Default)]
    struct OverlapProbe {
        active: AtomicUsize,
        max_active: AtomicUsize,
        heartbeats: AtomicUsize,
        chats: AtomicUsize,
    }

    impl OverlapProbe {
        fn enter(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_micros(200));
        }

        fn leave(&self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl EventHandler for OverlapProbe {
        fn on_heartbeat(&self, _room: &RoomContext, _event: &HeartbeatEvent) {
            self.enter();
            self.heartbeats.fetch_add(1, Ordering::SeqCst);
            self.leave();
        }

        fn on_chat_message(&self, _room: &RoomContext, _event: &ChatMessageEvent) {
            self.enter();
            self.chats.fetch_add(1, Ordering::SeqCst);
            self.leave();
        }
    }

    fn heartbeat(n: u32) -> LiveEvent {
        LiveEvent::Heartbeat(HeartbeatEvent {
            room_id: 1,
            popularity: n,
        })
    }

    fn chat(n: u32) -> LiveEvent {
        LiveEvent::ChatMessage(ChatMessageEvent {
            room_id: 1,
            uid: n as u64,
            uname: format!("user{n}"),
            msg: "hi".to_string(),
            timestamp_ms: 0,
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_never_overlap_handler_calls() {
        let probe = Arc::new(OverlapProbe::default());
        let mut dispatcher = EventDispatcher::spawn(RoomContext { room_id: 1 }, probe.clone());

        let mut producers = Vec::new();
        for _ in 0..4 {
            let tx = dispatcher.sender().unwrap();
            producers.push(tokio::spawn(async move {
                for n in 0..50 {
                    tx.send(heartbeat(n)).unwrap();
                    tx.send(chat(n)).unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for p in producers {
            p.await.unwrap();
        }

        let handled = dispatcher.join().await.unwrap();

        assert_eq!(handled, 400);
        assert_eq!(probe.heartbeats.load(Ordering::SeqCst), 200);
        assert_eq!(probe.chats.load(Ordering::SeqCst), 200);
        assert_eq!(probe.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn join_waits_for_queued_events() {
        let probe = Arc::new(OverlapProbe::default());
        let mut dispatcher = EventDispatcher::spawn(RoomContext { room_id: 1 }, probe.clone());
        let tx = dispatcher.sender().unwrap();
        for n in 0..10 {
            tx.send(chat(n)).unwrap();
        }
        drop(tx);

        assert_eq!(dispatcher.join().await.unwrap(), 10);
        assert_eq!(probe.chats.load(Ordering::SeqCst), 10);
        assert!(dispatcher.sender().is_none());
        assert_eq!(dispatcher.join().await.unwrap(), 0);
    }
}
