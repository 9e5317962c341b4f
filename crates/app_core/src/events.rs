//! Scan events delivered to the UI-owning thread
//!
//! Scan units never touch UI state. They send `ScanEvent`s through an
//! unbounded channel and the single owner of the UI drains the queue.

use crate::resource::Resource;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Result of one scan batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub dir: PathBuf,
    /// Units launched (one per recognized image)
    pub launched: usize,
    pub loaded: usize,
    pub failed: usize,
    /// Loads served from the resource cache
    pub cached: usize,
    /// The directory is excluded; nothing was launched
    pub excluded: bool,
}

#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Bytes for `path` are available
    ImageLoaded {
        path: PathBuf,
        image_id: Option<i64>,
        resource: Arc<Resource>,
    },
    /// Reading `path` failed; show `placeholder` instead
    LoadFailed {
        path: PathBuf,
        image_id: Option<i64>,
        error: String,
        placeholder: Arc<Resource>,
    },
    /// Every unit of the batch has finished. Sent exactly once per scan.
    ScanCompleted(ScanSummary),
}

impl ScanEvent {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ScanEvent::ImageLoaded { path, .. } | ScanEvent::LoadFailed { path, .. } => Some(path),
            ScanEvent::ScanCompleted(_) => None,
        }
    }
}

/// Producer half, cloned into each scan unit
pub type EventSender = Sender<ScanEvent>;

/// Consumer half, owned by the UI thread
pub struct EventQueue {
    rx: Receiver<ScanEvent>,
}

impl EventQueue {
    /// Create a sender/queue pair
    pub fn channel() -> (EventSender, Self) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (tx, Self { rx })
    }

    /// Take every event already queued without blocking
    pub fn drain(&self) -> Vec<ScanEvent> {
        self.rx.try_iter().collect()
    }

    /// Block until `ScanCompleted`, handing every event to `on_event` in arrival order.
    ///
    /// Returns `None` if all senders are dropped first.
    pub fn wait_for_completion<F>(&self, mut on_event: F) -> Option<ScanSummary>
    where
        F: FnMut(&ScanEvent),
    {
        while let Ok(event) = self.rx.recv() {
            on_event(&event);
            if let ScanEvent::ScanCompleted(summary) = event {
                return Some(summary);
            }
        }
        None
    }

    /// Like `wait_for_completion`, giving up after `timeout` without an event
    pub fn wait_for_completion_timeout<F>(&self, timeout: Duration, mut on_event: F) -> Option<ScanSummary>
    where
        F: FnMut(&ScanEvent),
    {
        loop {
            match self.rx.recv_timeout(timeout) {
                Ok(event) => {
                    on_event(&event);
                    if let ScanEvent::ScanCompleted(summary) = event {
                        return Some(summary);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}
