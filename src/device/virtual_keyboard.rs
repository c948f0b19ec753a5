use crate::device::{DeviceError, KeySink};
use crate::mapping::KeyCode;
use evdev::uinput::VirtualDevice;
use evdev::{AttributeSet, BusType, EventType, InputEvent, InputId};
use std::collections::BTreeSet;
use tracing::{debug, info};

pub const DEVICE_NAME: &str = "th-track virtual keyboard";

/// uinput keyboard declaring exactly the keys the bridge may press
///
/// The kernel removes the device when this value is dropped.
pub struct VirtualKeyboard {
    device: VirtualDevice,
    declared: BTreeSet<KeyCode>,
    pending: Vec<InputEvent>,
}

impl VirtualKeyboard {
    pub fn create(keys: &[KeyCode]) -> Result<Self, DeviceError> {
        let mut attributes = AttributeSet::<evdev::KeyCode>::new();
        for key in keys {
            attributes.insert(evdev::KeyCode(key.code()));
        }

        let device = VirtualDevice::builder()
            .map_err(DeviceError::Create)?
            .name(DEVICE_NAME)
            .input_id(InputId::new(BusType::BUS_VIRTUAL, 0x1234, 0x5678, 1))
            .with_keys(&attributes)
            .map_err(DeviceError::Create)?
            .build()
            .map_err(DeviceError::Create)?;

        info!("Created {} with {} keys", DEVICE_NAME, keys.len());
        Ok(Self {
            device,
            declared: keys.iter().copied().collect(),
            pending: Vec::new(),
        })
    }
}

impl KeySink for VirtualKeyboard {
    fn emit_key(&mut self, code: KeyCode, pressed: bool) -> Result<(), DeviceError> {
        if !self.declared.contains(&code) {
            return Err(DeviceError::Undeclared(code));
        }
        self.pending
            .push(InputEvent::new(EventType::KEY.0, code.code(), i32::from(pressed)));
        Ok(())
    }

    fn emit_sync(&mut self) -> Result<(), DeviceError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        // evdev terminates the batch with SYN_REPORT
        let result = self.device.emit(&self.pending).map_err(DeviceError::Emit);
        debug!("Flushed {} key events", self.pending.len());
        self.pending.clear();
        result
    }
}

impl Drop for VirtualKeyboard {
    fn drop(&mut self) {
        info!("Destroying {}", DEVICE_NAME);
    }
}
