use crate::domain::model::ProgressState;
use crate::domain::ports::ProgressSink;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Publishes progress on a watch channel; any number of receivers may
/// observe the latest state.
#[derive(Debug)]
pub struct WatchProgress {
    sender: watch::Sender<ProgressState>,
}

impl WatchProgress {
    pub fn channel() -> (Self, watch::Receiver<ProgressState>) {
        let (sender, receiver) = watch::channel(ProgressState::default());
        (Self { sender }, receiver)
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.sender.subscribe()
    }
}

impl ProgressSink for WatchProgress {
    fn update(&self, state: &ProgressState) {
        self.sender.send_replace(state.clone());
    }
}

/// Prints every observed state to stderr until the sender is dropped.
pub fn spawn_console_display(mut receiver: watch::Receiver<ProgressState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            let state = receiver.borrow_and_update().clone();
            if state.status_message.is_empty() {
                continue;
            }
            eprintln!("[{:>3}%] {}", state.percent_complete, state.status_message);
        }
    })
}

/// Discards progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _state: &ProgressState) {}
}
