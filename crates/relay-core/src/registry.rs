//! Thread lifecycle registry.
//!
//! One mutex guards an insertion-ordered table of entries; critical
//! sections are short (lookups and state writes) and never nest inside
//! the logging mutex. Fan-out waits park on a condvar that every state
//! transition notifies.

use crate::error::CoreError;
use crate::mailbox::{Mailbox, DEFAULT_MAILBOX_CAPACITY};
use crate::message::Message;
use crate::shutdown::ShutdownLatch;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Fixed registration table limit.
pub const MAX_THREADS: usize = 64;

/// Label under which the process's main thread is registered at entry 0.
pub const MAIN_LABEL: &str = "MAIN";

/// Per-entry lifecycle state. Transitions are monotonic: once a thread
/// leaves a state it never returns to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadState {
    Created,
    Running,
    Stopping,
    Terminated,
    Failed,
}

impl ThreadState {
    /// True for the states a fan-out wait accepts as "finished".
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated | Self::Failed)
    }

    /// The allowed transition edges. `Failed -> Terminated` is applied by
    /// registry cleanup once the failed thread has been joined.
    fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Created, Self::Running)
                | (Self::Created, Self::Failed)
                | (Self::Running, Self::Stopping)
                | (Self::Running, Self::Terminated)
                | (Self::Running, Self::Failed)
                | (Self::Stopping, Self::Terminated)
                | (Self::Failed, Self::Terminated)
        )
    }
}

struct Entry {
    label: String,
    state: ThreadState,
    mailbox: Arc<Mailbox>,
    handle: Option<JoinHandle<()>>,
    thread_id: Option<ThreadId>,
    auto_cleanup: bool,
}

/// Snapshot of one entry, safe to hand out without holding the table
/// mutex.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub label: String,
    pub state: ThreadState,
    pub auto_cleanup: bool,
}

/// Insertion-ordered thread table. Built once by the launcher and shared
/// by `Arc`; the main thread is always entry 0.
pub struct Registry {
    entries: Mutex<Vec<Entry>>,
    state_changed: Condvar,
    shutdown: Arc<ShutdownLatch>,
}

impl Registry {
    /// Creates the registry and registers the calling thread as `MAIN`,
    /// entry 0, already Running.
    pub fn new(shutdown: Arc<ShutdownLatch>) -> Self {
        let main = Entry {
            label: MAIN_LABEL.to_owned(),
            state: ThreadState::Running,
            mailbox: Arc::new(Mailbox::new(
                MAIN_LABEL,
                DEFAULT_MAILBOX_CAPACITY,
                Arc::clone(&shutdown),
            )),
            handle: None,
            thread_id: Some(std::thread::current().id()),
            auto_cleanup: false,
        };
        Self {
            entries: Mutex::new(vec![main]),
            state_changed: Condvar::new(),
            shutdown,
        }
    }

    fn table(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `label` at the tail of the insertion order with a fresh
    /// mailbox and state Created.
    pub fn register(
        &self,
        label: &str,
        mailbox_capacity: usize,
        auto_cleanup: bool,
    ) -> Result<Arc<Mailbox>, CoreError> {
        if label.trim().is_empty() {
            return Err(CoreError::InvalidArgument("thread label must be non-empty"));
        }

        let mut entries = self.table();
        if entries.iter().any(|e| e.label == label) {
            return Err(CoreError::DuplicateThread(label.to_owned()));
        }
        if entries.len() >= MAX_THREADS {
            return Err(CoreError::OutOfMemory);
        }

        let mailbox = Arc::new(Mailbox::new(
            label,
            mailbox_capacity,
            Arc::clone(&self.shutdown),
        ));
        entries.push(Entry {
            label: label.to_owned(),
            state: ThreadState::Created,
            mailbox: Arc::clone(&mailbox),
            handle: None,
            thread_id: None,
            auto_cleanup,
        });
        Ok(mailbox)
    }

    /// Attaches the spawned thread's handle to its entry.
    pub(crate) fn set_handle(&self, label: &str, handle: JoinHandle<()>) -> Result<(), CoreError> {
        let mut entries = self.table();
        let entry = entries
            .iter_mut()
            .find(|e| e.label == label)
            .ok_or_else(|| CoreError::NoSuchThread(label.to_owned()))?;
        entry.thread_id = Some(handle.thread().id());
        entry.handle = Some(handle);
        Ok(())
    }

    /// Applies one state transition, enforcing the monotonic graph. An
    /// invalid transition is reported and leaves the entry untouched.
    pub fn update_state(&self, label: &str, to: ThreadState) -> Result<(), CoreError> {
        let mut entries = self.table();
        let entry = entries
            .iter_mut()
            .find(|e| e.label == label)
            .ok_or_else(|| CoreError::NoSuchThread(label.to_owned()))?;

        if !entry.state.can_transition_to(to) {
            return Err(CoreError::InvalidStateTransition {
                label: label.to_owned(),
                from: entry.state,
                to,
            });
        }
        entry.state = to;
        drop(entries);
        self.state_changed.notify_all();
        Ok(())
    }

    /// Returns the entry's state; unknown labels read as Created.
    pub fn get_state(&self, label: &str) -> ThreadState {
        self.table()
            .iter()
            .find(|e| e.label == label)
            .map_or(ThreadState::Created, |e| e.state)
    }

    /// Lookup by label without mutation.
    pub fn find_by_label(&self, label: &str) -> Option<EntryInfo> {
        self.table().iter().find(|e| e.label == label).map(|e| EntryInfo {
            label: e.label.clone(),
            state: e.state,
            auto_cleanup: e.auto_cleanup,
        })
    }

    /// Lookup by OS thread identity without mutation.
    pub fn find_by_thread_id(&self, id: ThreadId) -> Option<EntryInfo> {
        self.table()
            .iter()
            .find(|e| e.thread_id == Some(id))
            .map(|e| EntryInfo {
                label: e.label.clone(),
                state: e.state,
                auto_cleanup: e.auto_cleanup,
            })
    }

    /// The addressed entry's mailbox.
    pub fn mailbox(&self, label: &str) -> Result<Arc<Mailbox>, CoreError> {
        self.table()
            .iter()
            .find(|e| e.label == label)
            .map(|e| Arc::clone(&e.mailbox))
            .ok_or_else(|| CoreError::NoSuchThread(label.to_owned()))
    }

    /// Delivers `msg` to the addressed thread's mailbox. The table mutex
    /// is released before the (possibly blocking) push.
    pub fn push_message(
        &self,
        label: &str,
        msg: &Message,
        timeout: Duration,
    ) -> Result<(), CoreError> {
        let mailbox = self.mailbox(label)?;
        mailbox.push(msg, timeout)
    }

    /// Receives from the addressed thread's mailbox.
    pub fn pop_message(&self, label: &str, timeout: Duration) -> Result<Message, CoreError> {
        let mailbox = self.mailbox(label)?;
        mailbox.pop(timeout)
    }

    /// Number of entries not yet in a terminal state.
    pub fn live_count(&self) -> usize {
        self.table().iter().filter(|e| !e.state.is_terminal()).count()
    }

    /// Registered labels in insertion order.
    pub fn labels(&self) -> Vec<String> {
        self.table().iter().map(|e| e.label.clone()).collect()
    }

    /// Blocks until every entry other than `self_label` is terminal, or
    /// the timeout elapses (`QueueTimeout`). `None` waits indefinitely.
    pub fn wait_others(
        &self,
        self_label: &str,
        timeout: Option<Duration>,
    ) -> Result<(), CoreError> {
        self.wait_terminal(Some(self_label), timeout)
    }

    /// Blocks until every entry, current thread's included, is terminal.
    /// Meant for unregistered orchestrators.
    pub fn wait_all(&self, timeout: Option<Duration>) -> Result<(), CoreError> {
        self.wait_terminal(None, timeout)
    }

    fn wait_terminal(
        &self,
        exclude: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<(), CoreError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut entries = self.table();
        loop {
            let all_done = entries
                .iter()
                .filter(|e| exclude != Some(e.label.as_str()))
                .all(|e| e.state.is_terminal());
            if all_done {
                return Ok(());
            }

            match deadline {
                Some(deadline) => {
                    let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                        return Err(CoreError::QueueTimeout);
                    };
                    let (guard, _) = self
                        .state_changed
                        .wait_timeout(entries, remaining)
                        .unwrap_or_else(PoisonError::into_inner);
                    entries = guard;
                }
                None => {
                    entries = self
                        .state_changed
                        .wait(entries)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Joins every auto-cleanup entry, applies the Failed → Terminated
    /// edge for joined failures, and clears the table (dropping the
    /// mailboxes with their entries).
    ///
    /// Handles are taken out before joining so dying threads can still
    /// reach `update_state` for their final transition.
    pub fn cleanup(&self) {
        let joinable: Vec<(String, JoinHandle<()>)> = {
            let mut entries = self.table();
            entries
                .iter_mut()
                .filter(|e| e.auto_cleanup)
                .filter_map(|e| e.handle.take().map(|h| (e.label.clone(), h)))
                .collect()
        };

        for (label, handle) in joinable {
            if handle.join().is_err() {
                // A panicked worker counts as failed; the edge below
                // still retires it.
                let _ = self.update_state(&label, ThreadState::Failed);
            }
            let mut entries = self.table();
            if let Some(e) = entries.iter_mut().find(|e| e.label == label) {
                if e.state == ThreadState::Failed {
                    e.state = ThreadState::Terminated;
                }
            }
        }

        self.table().clear();
        self.state_changed.notify_all();
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.table();
        f.debug_struct("Registry")
            .field("entries", &entries.len())
            .field(
                "labels",
                &entries.iter().map(|e| e.label.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(Arc::new(ShutdownLatch::new()))
    }

    #[test]
    fn main_is_entry_zero_and_running() {
        let reg = registry();
        assert_eq!(reg.labels(), vec![MAIN_LABEL.to_owned()]);
        assert_eq!(reg.get_state(MAIN_LABEL), ThreadState::Running);
        assert!(reg.find_by_thread_id(std::thread::current().id()).is_some());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let reg = registry();
        reg.register("W", 16, true).unwrap();
        assert!(matches!(
            reg.register("W", 16, true),
            Err(CoreError::DuplicateThread(_))
        ));
    }

    #[test]
    fn unknown_labels_read_created() {
        let reg = registry();
        assert_eq!(reg.get_state("GHOST"), ThreadState::Created);
        assert!(reg.find_by_label("GHOST").is_none());
    }

    #[test]
    fn transition_graph_is_enforced() {
        let reg = registry();
        reg.register("W", 16, true).unwrap();

        // Skipping Created -> Running is not allowed.
        assert!(matches!(
            reg.update_state("W", ThreadState::Stopping),
            Err(CoreError::InvalidStateTransition { .. })
        ));
        assert_eq!(reg.get_state("W"), ThreadState::Created);

        reg.update_state("W", ThreadState::Running).unwrap();
        reg.update_state("W", ThreadState::Stopping).unwrap();
        reg.update_state("W", ThreadState::Terminated).unwrap();

        // Terminal states never transition again.
        assert!(reg.update_state("W", ThreadState::Running).is_err());
        assert_eq!(reg.get_state("W"), ThreadState::Terminated);
    }

    #[test]
    fn failed_entries_can_only_terminate() {
        let reg = registry();
        reg.register("W", 16, true).unwrap();
        reg.update_state("W", ThreadState::Failed).unwrap();
        assert!(reg.update_state("W", ThreadState::Running).is_err());
        reg.update_state("W", ThreadState::Terminated).unwrap();
    }

    #[test]
    fn table_limit_reports_out_of_memory() {
        let reg = registry();
        // Entry 0 is MAIN.
        for i in 1..MAX_THREADS {
            reg.register(&format!("W{i}"), 1, false).unwrap();
        }
        assert!(matches!(
            reg.register("ONE_TOO_MANY", 1, false),
            Err(CoreError::OutOfMemory)
        ));
    }

    #[test]
    fn message_routing_uses_labels() {
        use crate::message::{Message, MessageType};

        let reg = registry();
        reg.register("Q", 16, false).unwrap();
        assert_eq!(reg.mailbox("Q").unwrap().owner(), "Q");

        let msg = Message::new(MessageType::Data, &[1, 2, 3]).unwrap();
        reg.push_message("Q", &msg, Duration::ZERO).unwrap();
        let got = reg.pop_message("Q", Duration::ZERO).unwrap();
        assert_eq!(got.content(), &[1, 2, 3]);

        assert!(matches!(
            reg.push_message("NOPE", &msg, Duration::ZERO),
            Err(CoreError::NoSuchThread(_))
        ));
    }

    #[test]
    fn wait_others_returns_once_peers_are_terminal() {
        let reg = Arc::new(registry());
        reg.register("W", 16, false).unwrap();
        reg.update_state("W", ThreadState::Running).unwrap();

        let waiter = {
            let reg = Arc::clone(&reg);
            std::thread::spawn(move || reg.wait_others(MAIN_LABEL, Some(Duration::from_secs(10))))
        };

        std::thread::sleep(Duration::from_millis(20));
        reg.update_state("W", ThreadState::Terminated).unwrap();
        waiter.join().unwrap().unwrap();
    }

    #[test]
    fn wait_others_times_out_without_mutation() {
        let reg = registry();
        reg.register("W", 16, false).unwrap();

        let err = reg
            .wait_others(MAIN_LABEL, Some(Duration::from_millis(20)))
            .unwrap_err();
        assert!(matches!(err, CoreError::QueueTimeout));
        assert_eq!(reg.get_state("W"), ThreadState::Created);
    }
}
