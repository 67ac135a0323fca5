use std::cell::Cell;
use std::rc::Rc;

use pcbox_interrupts::{KeyWaitSignal, TimerGate};

/// Cloneable PIT channel 0 gate, driven low by the PIC when it accepts IRQ0.
///
/// The timer model samples [`TimerGateLatch::level`] and raises the gate again itself once it
/// has reloaded.
#[derive(Debug, Clone)]
pub struct TimerGateLatch {
    level: Rc<Cell<bool>>,
}

impl TimerGateLatch {
    pub fn new() -> Self {
        Self {
            level: Rc::new(Cell::new(true)),
        }
    }

    pub fn level(&self) -> bool {
        self.level.get()
    }

    pub fn raise(&self) {
        self.level.set(true);
    }
}

impl Default for TimerGateLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerGate for TimerGateLatch {
    fn set_gate(&mut self, level: bool) {
        self.level.set(level);
    }
}

/// Keyboard side of the IRQ1 handshake, shared between the keyboard controller and the PIC.
#[derive(Debug, Clone, Default)]
pub struct KeyWaitLatch {
    waiting: Rc<Cell<bool>>,
    key_interrupt: Rc<Cell<bool>>,
}

impl KeyWaitLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyboard controller: a scancode is latched and the host has not read it yet.
    pub fn set_waiting(&self, waiting: bool) {
        self.waiting.set(waiting);
    }

    pub fn raise_key_interrupt(&self) {
        self.key_interrupt.set(true);
    }

    pub fn key_interrupt(&self) -> bool {
        self.key_interrupt.get()
    }
}

impl KeyWaitSignal for KeyWaitLatch {
    fn key_waiting(&self) -> bool {
        self.waiting.get()
    }

    fn clear_key_interrupt(&mut self) {
        self.key_interrupt.set(false);
    }
}
