//! Output side: the virtual keyboard the game reads from

pub mod virtual_keyboard;

pub use virtual_keyboard::VirtualKeyboard;

use crate::mapping::KeyCode;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to create virtual keyboard: {0}")]
    Create(#[source] std::io::Error),

    #[error("Failed to write key events: {0}")]
    Emit(#[source] std::io::Error),

    #[error("Key code {0} was not declared on the device")]
    Undeclared(KeyCode),
}

/// Receives key transitions and applies them in batches
///
/// Transitions passed to `emit_key` take effect together on the next
/// `emit_sync`.
pub trait KeySink: Send {
    fn emit_key(&mut self, code: KeyCode, pressed: bool) -> Result<(), DeviceError>;

    fn emit_sync(&mut self) -> Result<(), DeviceError>;
}
