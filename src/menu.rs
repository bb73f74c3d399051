// Keyboard-navigable choice menu.
//
// `present` shows the options on a single line, lets the user move the
// highlight with the previous/next keys (wrapping at both ends) and blocks
// until the confirm key is pressed. The line is redrawn in place after
// every step.

use crate::error::MenuError;
use crate::input::{lock, InputChannel, KeyBindings, MenuKey};
use std::io::{self, Stdout, Write};
use std::ops::ControlFlow;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Labels longer than this are shortened when no width is configured.
pub const DEFAULT_LABEL_WIDTH: usize = 20;

/// Narrowest width that still shows one character before the `..`.
pub const MIN_LABEL_WIDTH: usize = 3;

const ELLIPSIS: &str = "..";

/// The option the user confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    /// The option as it was passed in, never the shortened display text.
    pub label: String,
}

/// Cursor and labels of one menu invocation.
#[derive(Debug, Clone)]
pub struct MenuSession {
    options: Vec<String>,
    display: Vec<String>,
    cursor: usize,
}

impl MenuSession {
    pub fn new<S: AsRef<str>>(options: &[S], max_label_width: usize) -> Result<Self, MenuError> {
        if options.is_empty() {
            return Err(MenuError::InvalidInput(
                "a menu needs at least one option".into(),
            ));
        }
        if max_label_width < MIN_LABEL_WIDTH {
            return Err(MenuError::InvalidInput(format!(
                "label width {} leaves no room for text",
                max_label_width
            )));
        }
        let options: Vec<String> = options.iter().map(|o| o.as_ref().to_string()).collect();
        let display = options
            .iter()
            .map(|o| truncate_label(o, max_label_width))
            .collect();
        Ok(Self {
            options,
            display,
            cursor: 0,
        })
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn previous(&mut self) {
        let len = self.options.len();
        self.cursor = (self.cursor + len - 1) % len;
    }

    pub fn next(&mut self) {
        self.cursor = (self.cursor + 1) % self.options.len();
    }

    /// The full menu line, starting with a carriage return so writing it
    /// replaces the previous one.
    pub fn render(&self) -> String {
        let mut line = String::from("\r");
        for (index, label) in self.display.iter().enumerate() {
            if index == self.cursor {
                line.push_str(&format!(" >{}< ", label));
            } else {
                line.push_str(&format!("  {}  ", label));
            }
        }
        line
    }

    pub fn selection(&self) -> Selection {
        Selection {
            index: self.cursor,
            label: self.options[self.cursor].clone(),
        }
    }
}

/// Shorten `label` to at most `max_width` characters, marking the cut
/// with `..`.
pub fn truncate_label(label: &str, max_width: usize) -> String {
    if label.chars().count() <= max_width {
        return label.to_string();
    }
    let kept: String = label
        .chars()
        .take(max_width.saturating_sub(ELLIPSIS.len()))
        .collect();
    format!("{}{}", kept, ELLIPSIS)
}

/// A reusable menu bound to one input channel and one output surface.
///
/// Each call to `present` is an independent session; sessions sharing a
/// channel cannot overlap.
pub struct ChoiceMenu<W = Stdout> {
    channel: InputChannel,
    out: Arc<Mutex<W>>,
    max_label_width: usize,
}

impl ChoiceMenu<Stdout> {
    pub fn new(channel: InputChannel) -> Self {
        Self::with_output(channel, io::stdout())
    }
}

impl<W: Write + Send + 'static> ChoiceMenu<W> {
    pub fn with_output(channel: InputChannel, out: W) -> Self {
        Self {
            channel,
            out: Arc::new(Mutex::new(out)),
            max_label_width: DEFAULT_LABEL_WIDTH,
        }
    }

    pub fn max_label_width(mut self, width: usize) -> Self {
        self.max_label_width = width;
        self
    }

    pub fn channel(&self) -> &InputChannel {
        &self.channel
    }

    /// Show `options` and block until one is confirmed.
    ///
    /// Nothing is drawn and no key is read when the options are rejected or
    /// the channel is busy. The key bindings are gone by the time this
    /// returns, whatever the outcome.
    pub fn present<S: AsRef<str>>(&self, options: &[S]) -> Result<Selection, MenuError> {
        let session = MenuSession::new(options, self.max_label_width)?;
        let claim = self.channel.claim()?;
        debug!(options = session.options().len(), "menu session started");

        let session = Arc::new(Mutex::new(session));
        draw(&self.out, &lock(&session))?;

        let (confirmed_tx, confirmed_rx) = mpsc::sync_channel(1);
        let bindings = KeyBindings::new()
            .on(
                MenuKey::Previous,
                step_action(&session, &self.out, MenuSession::previous),
            )
            .on(
                MenuKey::Next,
                step_action(&session, &self.out, MenuSession::next),
            )
            .on(MenuKey::Confirm, move || {
                let _ = confirmed_tx.try_send(());
                Ok(ControlFlow::Break(()))
            });
        let registration = claim.bind(bindings)?;

        // Also wakes up if the listener dies, since that drops the sender.
        let confirmed = confirmed_rx.recv().is_ok();
        let released = registration.release();
        let separated = {
            let mut out = lock(&self.out);
            writeln!(out).and_then(|_| out.flush())
        };
        released?;
        separated?;
        if !confirmed {
            return Err(MenuError::InputChannelUnavailable(
                "key listener stopped before a choice was confirmed".into(),
            ));
        }

        let selection = lock(&session).selection();
        debug!(index = selection.index, "menu session confirmed");
        Ok(selection)
    }
}

fn step_action<W: Write + Send + 'static>(
    session: &Arc<Mutex<MenuSession>>,
    out: &Arc<Mutex<W>>,
    step: fn(&mut MenuSession),
) -> impl FnMut() -> Result<ControlFlow<()>, MenuError> + Send + 'static {
    let session = Arc::clone(session);
    let out = Arc::clone(out);
    move || {
        let mut session = lock(&session);
        step(&mut session);
        trace!(cursor = session.cursor(), "cursor moved");
        draw(&out, &session)?;
        Ok(ControlFlow::Continue(()))
    }
}

fn draw<W: Write>(out: &Mutex<W>, session: &MenuSession) -> Result<(), MenuError> {
    let mut out = lock(out);
    out.write_all(session.render().as_bytes())?;
    out.flush()?;
    Ok(())
}
