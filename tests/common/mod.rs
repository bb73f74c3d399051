//! Shared helpers for the menu integration tests.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use winkel_tass::input::{InputChannel, MenuKey, ScriptedKeys};
use winkel_tass::menu::ChoiceMenu;

/// In-memory output that stays readable after being handed to a menu.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A menu driven by `keys`, plus a handle on everything it draws.
pub fn scripted_menu(keys: Vec<MenuKey>) -> (ChoiceMenu<SharedBuffer>, SharedBuffer) {
    let out = SharedBuffer::default();
    let channel = InputChannel::new(ScriptedKeys::new(keys));
    (ChoiceMenu::with_output(channel, out.clone()), out)
}
