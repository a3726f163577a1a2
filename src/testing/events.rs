//! Synchronous event fan-out
//!
//! Listeners run in registration order and all of them have returned before
//! `emit` does. The registry is snapshotted before dispatch, so a listener
//! may register further listeners or emit again without tripping a borrow.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use super::tester::Message;

/// Listener callback
pub type Listener<E> = Rc<dyn Fn(&E)>;

/// A registry of listeners for one event type
pub struct Emitter<E> {
    listeners: RefCell<Vec<Listener<E>>>,
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
        }
    }
}

impl<E> Emitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn on(&self, listener: impl Fn(&E) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Dispatch an event to every listener registered so far
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self.listeners.borrow().clone();
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }
}

/// Notifications emitted by the tester
#[derive(Debug, Clone)]
pub enum TestEvent {
    /// A suite file started executing
    SuiteStarted { file: PathBuf },
    /// The running suite signalled completion
    SuiteDone { file: Option<PathBuf> },
    /// An assertion passed
    Success {
        message: Message,
        file: Option<PathBuf>,
    },
    /// An assertion failed
    Fail {
        message: Message,
        file: Option<PathBuf>,
    },
    /// Every queued suite has run
    Complete,
}
