// Keyboard input plumbing for the choice menu.
//
// The terminal is a single shared resource, so keys are read through an
// `InputChannel` that at most one menu session can hold at a time. A session
// first `claim`s the channel, then `bind`s its key actions; a background
// listener thread polls the key source and runs the actions in arrival
// order. Releasing the `Registration` (explicitly or by dropping it) stops
// the listener, restores the terminal and frees the channel, so a finished
// menu can never react to keys meant for somebody else.

use crate::error::MenuError;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::collections::{HashMap, VecDeque};
use std::io::{self, IsTerminal};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// How long the listener waits for a key before re-checking its stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The three logical keys a choice menu understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuKey {
    Previous,
    Next,
    Confirm,
}

/// Something that produces `MenuKey`s: the real terminal, or a script.
pub trait KeySource: Send {
    /// Called when a session claims the channel, before any key is polled.
    fn attach(&mut self) -> Result<(), MenuError> {
        Ok(())
    }

    /// Called when the claiming session goes away.
    fn detach(&mut self) {}

    /// Wait up to `timeout` for the next key. `Ok(None)` means nothing
    /// relevant arrived in time.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<MenuKey>, MenuError>;
}

/// Reads arrow keys and Enter from the controlling terminal via crossterm.
///
/// Raw mode is only active while a session holds the channel.
#[derive(Debug, Default)]
pub struct TerminalKeys {
    raw_mode: bool,
}

impl KeySource for TerminalKeys {
    fn attach(&mut self) -> Result<(), MenuError> {
        if !io::stdin().is_terminal() {
            return Err(MenuError::InputChannelUnavailable(
                "stdin is not an interactive terminal".into(),
            ));
        }
        terminal::enable_raw_mode().map_err(|e| {
            MenuError::InputChannelUnavailable(format!("cannot enable raw mode: {}", e))
        })?;
        self.raw_mode = true;
        // Keys typed while no menu was listening belong to nobody.
        match drain_pending(|| event::poll(Duration::ZERO), event::read) {
            Ok(0) => Ok(()),
            Ok(dropped) => {
                debug!(dropped, "discarded keys typed before the menu opened");
                Ok(())
            }
            Err(e) => {
                self.detach();
                Err(e.into())
            }
        }
    }

    fn detach(&mut self) {
        if self.raw_mode {
            if let Err(e) = terminal::disable_raw_mode() {
                warn!(error = %e, "failed to restore terminal mode");
            }
            self.raw_mode = false;
        }
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<MenuKey>, MenuError> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(None);
        };
        // Windows also reports releases; one press must be one step.
        if key.kind != KeyEventKind::Press && key.kind != KeyEventKind::Repeat {
            return Ok(None);
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Err(MenuError::Interrupted)
            }
            KeyCode::Left => Ok(Some(MenuKey::Previous)),
            KeyCode::Right => Ok(Some(MenuKey::Next)),
            KeyCode::Enter => Ok(Some(MenuKey::Confirm)),
            _ => Ok(None),
        }
    }
}

/// Read and discard every event that is already queued.
fn drain_pending(
    mut pending: impl FnMut() -> io::Result<bool>,
    mut read: impl FnMut() -> io::Result<Event>,
) -> io::Result<usize> {
    let mut dropped = 0;
    while pending()? {
        read()?;
        dropped += 1;
    }
    Ok(dropped)
}

/// A pre-recorded key sequence, for driving menus without a terminal.
///
/// Once the script runs dry the source reports `InputChannelUnavailable`
/// instead of waiting forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<MenuKey>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = MenuKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

impl KeySource for ScriptedKeys {
    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<MenuKey>, MenuError> {
        match self.keys.pop_front() {
            Some(key) => Ok(Some(key)),
            None => Err(MenuError::InputChannelUnavailable(
                "key script exhausted".into(),
            )),
        }
    }
}

/// An action run on the listener thread when its key arrives. Returning
/// `ControlFlow::Break` ends the session's listening.
pub type KeyAction = Box<dyn FnMut() -> Result<ControlFlow<()>, MenuError> + Send>;

/// The key-to-action table a session registers on a channel.
#[derive(Default)]
pub struct KeyBindings {
    actions: HashMap<MenuKey, KeyAction>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, key: MenuKey, action: F) -> Self
    where
        F: FnMut() -> Result<ControlFlow<()>, MenuError> + Send + 'static,
    {
        self.actions.insert(key, Box::new(action));
        self
    }

    fn dispatch(&mut self, key: MenuKey) -> Result<ControlFlow<()>, MenuError> {
        match self.actions.get_mut(&key) {
            Some(action) => action(),
            None => Ok(ControlFlow::Continue(())),
        }
    }
}

struct Shared {
    source: Mutex<Box<dyn KeySource>>,
    claimed: AtomicBool,
}

impl Shared {
    fn source(&self) -> MutexGuard<'_, Box<dyn KeySource>> {
        lock(&self.source)
    }
}

/// Handle to the process' key source. Clones share the same source and
/// the same single binding slot.
#[derive(Clone)]
pub struct InputChannel {
    shared: Arc<Shared>,
}

impl InputChannel {
    pub fn new(source: impl KeySource + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                source: Mutex::new(Box::new(source)),
                claimed: AtomicBool::new(false),
            }),
        }
    }

    /// Channel backed by the controlling terminal. There is only one
    /// keyboard, so every call hands out the same channel.
    pub fn terminal() -> Self {
        static TERMINAL: OnceLock<InputChannel> = OnceLock::new();
        TERMINAL
            .get_or_init(|| Self::new(TerminalKeys::default()))
            .clone()
    }

    /// Whether a session currently holds this channel.
    pub fn is_claimed(&self) -> bool {
        self.shared.claimed.load(Ordering::Acquire)
    }

    /// Take exclusive hold of the channel. Fails with `BindingConflict`
    /// while another claim is alive.
    pub fn claim(&self) -> Result<Claim, MenuError> {
        if self
            .shared
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MenuError::BindingConflict);
        }
        if let Err(e) = self.shared.source().attach() {
            self.shared.claimed.store(false, Ordering::Release);
            return Err(e);
        }
        debug!("input channel claimed");
        Ok(Claim {
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Exclusive hold on an `InputChannel`. Dropping it detaches the source
/// and frees the channel.
pub struct Claim {
    shared: Arc<Shared>,
}

impl Claim {
    /// Start listening: keys are polled on a background thread and handed
    /// to `bindings` one at a time, in the order they arrive.
    pub fn bind(self, bindings: KeyBindings) -> Result<Registration, MenuError> {
        let stop = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&self.shared);
        let listener_stop = Arc::clone(&stop);
        let listener = thread::Builder::new()
            .name("menu-keys".into())
            .spawn(move || listen(&shared, bindings, &listener_stop))?;
        Ok(Registration {
            stop,
            listener: Some(listener),
            _claim: self,
        })
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.shared.source().detach();
        self.shared.claimed.store(false, Ordering::Release);
        debug!("input channel released");
    }
}

/// Live key bindings of one session. Teardown happens on `release` or on
/// drop, whichever comes first.
pub struct Registration {
    stop: Arc<AtomicBool>,
    listener: Option<JoinHandle<Result<(), MenuError>>>,
    // Dropped after `Drop::drop` has joined the listener.
    _claim: Claim,
}

impl Registration {
    /// Stop the listener and free the channel, returning whatever error
    /// ended the listener early.
    pub fn release(mut self) -> Result<(), MenuError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), MenuError> {
        self.stop.store(true, Ordering::Release);
        match self.listener.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(MenuError::InputChannelUnavailable(
                    "key listener panicked".into(),
                ))
            }),
            None => Ok(()),
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "key listener ended with an error");
        }
    }
}

fn listen(shared: &Shared, mut bindings: KeyBindings, stop: &AtomicBool) -> Result<(), MenuError> {
    while !stop.load(Ordering::Acquire) {
        let Some(key) = shared.source().poll_key(POLL_INTERVAL)? else {
            continue;
        };
        trace!(?key, "key received");
        if bindings.dispatch(key)?.is_break() {
            break;
        }
    }
    Ok(())
}

pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn recorder(
        log: &Arc<Mutex<Vec<MenuKey>>>,
        key: MenuKey,
    ) -> impl FnMut() -> Result<ControlFlow<()>, MenuError> + Send + 'static {
        let log = Arc::clone(log);
        move || {
            log.lock().unwrap().push(key);
            Ok(ControlFlow::Continue(()))
        }
    }

    fn confirm_bindings(log: &Arc<Mutex<Vec<MenuKey>>>) -> (KeyBindings, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::sync_channel(1);
        let bindings = KeyBindings::new()
            .on(MenuKey::Previous, recorder(log, MenuKey::Previous))
            .on(MenuKey::Next, recorder(log, MenuKey::Next))
            .on(MenuKey::Confirm, move || {
                let _ = tx.try_send(());
                Ok(ControlFlow::Break(()))
            });
        (bindings, rx)
    }

    struct NoTerminal;

    impl KeySource for NoTerminal {
        fn attach(&mut self) -> Result<(), MenuError> {
            Err(MenuError::InputChannelUnavailable("no tty".into()))
        }

        fn poll_key(&mut self, _timeout: Duration) -> Result<Option<MenuKey>, MenuError> {
            Ok(None)
        }
    }

    #[test]
    fn second_claim_conflicts_until_first_is_dropped() {
        let channel = InputChannel::new(ScriptedKeys::default());
        let claim = channel.claim().unwrap();
        assert!(channel.is_claimed());
        assert!(matches!(channel.clone().claim(), Err(MenuError::BindingConflict)));

        drop(claim);
        assert!(!channel.is_claimed());
        assert!(channel.claim().is_ok());
    }

    #[test]
    fn terminal_handles_share_one_binding_slot() {
        let first = InputChannel::terminal();
        let second = InputChannel::terminal();
        assert!(Arc::ptr_eq(&first.shared, &second.shared));

        // Without a tty the claim fails; with one, the other handle must see it.
        match first.claim() {
            Ok(_held) => {
                assert!(second.is_claimed());
                assert!(matches!(second.claim(), Err(MenuError::BindingConflict)));
            }
            Err(e) => {
                assert!(matches!(e, MenuError::InputChannelUnavailable(_)));
                assert!(!second.is_claimed());
            }
        }
        assert_eq!(first.is_claimed(), second.is_claimed());
    }

    #[test]
    fn draining_discards_only_queued_events() {
        use crossterm::event::KeyEvent;
        let queued = Mutex::new(VecDeque::from(vec![
            Event::Key(KeyEvent::from(KeyCode::Enter)),
            Event::Key(KeyEvent::from(KeyCode::Right)),
        ]));

        let dropped = drain_pending(
            || Ok(!queued.lock().unwrap().is_empty()),
            || Ok(queued.lock().unwrap().pop_front().unwrap()),
        )
        .unwrap();
        assert_eq!(dropped, 2);
        assert!(queued.lock().unwrap().is_empty());

        let nothing = drain_pending(|| Ok(false), || unreachable!()).unwrap();
        assert_eq!(nothing, 0);
    }

    #[test]
    fn failed_attach_leaves_channel_free() {
        let channel = InputChannel::new(NoTerminal);
        assert!(matches!(
            channel.claim(),
            Err(MenuError::InputChannelUnavailable(_))
        ));
        assert!(!channel.is_claimed());
    }

    #[test]
    fn keys_are_dispatched_in_order_until_confirm() {
        use MenuKey::*;
        let channel = InputChannel::new(ScriptedKeys::new([Next, Next, Previous, Confirm, Next]));
        let log = Arc::new(Mutex::new(Vec::new()));
        let (bindings, confirmed) = confirm_bindings(&log);

        let registration = channel.claim().unwrap().bind(bindings).unwrap();
        confirmed.recv().unwrap();
        registration.release().unwrap();

        assert_eq!(*log.lock().unwrap(), vec![Next, Next, Previous]);
        assert!(!channel.is_claimed());
    }

    #[test]
    fn keys_after_confirm_belong_to_the_next_session() {
        use MenuKey::*;
        let channel = InputChannel::new(ScriptedKeys::new([Next, Confirm, Previous, Confirm]));

        let first = Arc::new(Mutex::new(Vec::new()));
        let (bindings, confirmed) = confirm_bindings(&first);
        let registration = channel.claim().unwrap().bind(bindings).unwrap();
        confirmed.recv().unwrap();
        registration.release().unwrap();

        let second = Arc::new(Mutex::new(Vec::new()));
        let (bindings, confirmed) = confirm_bindings(&second);
        let registration = channel.claim().unwrap().bind(bindings).unwrap();
        confirmed.recv().unwrap();
        registration.release().unwrap();

        assert_eq!(*first.lock().unwrap(), vec![Next]);
        assert_eq!(*second.lock().unwrap(), vec![Previous]);
    }

    #[test]
    fn exhausted_source_wakes_the_waiter_and_reports_on_release() {
        let channel = InputChannel::new(ScriptedKeys::new([MenuKey::Next]));
        let log = Arc::new(Mutex::new(Vec::new()));
        let (bindings, confirmed) = confirm_bindings(&log);

        let registration = channel.claim().unwrap().bind(bindings).unwrap();
        // The confirm action is dropped with the listener, closing the signal.
        assert!(confirmed.recv().is_err());
        assert!(matches!(
            registration.release(),
            Err(MenuError::InputChannelUnavailable(_))
        ));
        assert!(!channel.is_claimed());
    }

    #[test]
    fn dropping_a_registration_frees_the_channel() {
        let channel = InputChannel::new(ScriptedKeys::new([MenuKey::Confirm]));
        let log = Arc::new(Mutex::new(Vec::new()));
        let (bindings, _confirmed) = confirm_bindings(&log);

        let registration = channel.claim().unwrap().bind(bindings).unwrap();
        drop(registration);
        assert!(!channel.is_claimed());
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let channel = InputChannel::new(ScriptedKeys::new([MenuKey::Next, MenuKey::Confirm]));
        let (tx, rx) = mpsc::sync_channel(1);
        let bindings = KeyBindings::new().on(MenuKey::Confirm, move || {
            let _ = tx.try_send(());
            Ok(ControlFlow::Break(()))
        });

        let registration = channel.claim().unwrap().bind(bindings).unwrap();
        rx.recv().unwrap();
        assert!(registration.release().is_ok());
    }
}
