//! Side signals the PIC drives into neighbouring chipset devices.

use std::fmt;

/// Gate input of PIT channel 0, pulled low when the PIC accepts IRQ0.
pub trait TimerGate {
    fn set_gate(&mut self, level: bool);
}

impl<F> TimerGate for F
where
    F: FnMut(bool),
{
    fn set_gate(&mut self, level: bool) {
        self(level);
    }
}

/// Keyboard controller handshake: an EOI for IRQ1 retires the keyboard's pending interrupt
/// while the controller is waiting for the host to pick up a key.
pub trait KeyWaitSignal {
    fn key_waiting(&self) -> bool;
    fn clear_key_interrupt(&mut self);
}

#[derive(Default)]
pub struct PicCallbacks {
    pub timer_gate: Option<Box<dyn TimerGate>>,
    pub key_wait: Option<Box<dyn KeyWaitSignal>>,
}

impl fmt::Debug for PicCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PicCallbacks")
            .field("timer_gate", &self.timer_gate.is_some())
            .field("key_wait", &self.key_wait.is_some())
            .finish()
    }
}
