// Errors reported by the choice menu and its input channel. Everything
// here is returned synchronously from `ChoiceMenu::present`; the menu never
// prints error text itself.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MenuError {
    /// The option list (or the label width) cannot be presented.
    #[error("Invalid menu input: {0}")]
    InvalidInput(String),

    /// Another session already holds the key bindings of this channel.
    #[error("Input channel is already bound by another menu")]
    BindingConflict,

    /// No keyboard events can be read (no terminal, source closed, ...).
    #[error("Keyboard input unavailable: {0}")]
    InputChannelUnavailable(String),

    /// Ctrl-C was pressed while the terminal was in raw mode.
    #[error("Interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
