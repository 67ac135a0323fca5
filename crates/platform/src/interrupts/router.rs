use std::cell::RefCell;
use std::rc::Rc;

use pcbox_interrupts::{PicConfig, PicConfigError};

use super::latch::{KeyWaitLatch, TimerGateLatch};
use super::pic::LegacyPic;

/// How a device drives an ISA IRQ line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptInput {
    /// Level-style line, held until the device lowers it again.
    IsaIrq(u8),
    /// Single edge; nothing to lower afterwards.
    IsaPulse(u8),
}

/// CPU-facing side of the interrupt fabric, polled at instruction boundaries.
pub trait InterruptController {
    fn has_pending(&self) -> bool;
    /// INTA cycle: returns the vector to dispatch, or `None` if nothing is deliverable.
    fn acknowledge(&mut self) -> Option<u8>;
    fn eoi(&mut self, vector: u8);
}

pub type SharedPlatformInterrupts = Rc<RefCell<PlatformInterrupts>>;

#[derive(Debug)]
pub struct PlatformInterrupts {
    pic: LegacyPic,
    timer_gate: TimerGateLatch,
    key_wait: KeyWaitLatch,
}

impl PlatformInterrupts {
    /// AT board with BIOS vector bases (0x08 / 0x70) and every IRQ masked.
    pub fn new() -> Self {
        Self::wire(LegacyPic::new(0x08, 0x70))
    }

    pub fn with_config(config: PicConfig) -> Result<Self, PicConfigError> {
        Ok(Self::wire(LegacyPic::with_config(config, 0x08, 0x70)?))
    }

    fn wire(mut pic: LegacyPic) -> Self {
        let timer_gate = TimerGateLatch::new();
        let key_wait = KeyWaitLatch::new();
        pic.inner_mut().connect_timer_gate(Box::new(timer_gate.clone()));
        pic.inner_mut().connect_key_wait(Box::new(key_wait.clone()));
        Self {
            pic,
            timer_gate,
            key_wait,
        }
    }

    pub fn into_shared(self) -> SharedPlatformInterrupts {
        Rc::new(RefCell::new(self))
    }

    pub fn pic(&self) -> &LegacyPic {
        &self.pic
    }

    pub fn pic_mut(&mut self) -> &mut LegacyPic {
        &mut self.pic
    }

    /// Gate latch for PIT channel 0; clone it into the timer model.
    pub fn timer_gate(&self) -> &TimerGateLatch {
        &self.timer_gate
    }

    /// IRQ1 handshake latch; clone it into the keyboard controller.
    pub fn key_wait(&self) -> &KeyWaitLatch {
        &self.key_wait
    }

    pub fn raise_irq(&mut self, input: InterruptInput) {
        let pic = self.pic.inner_mut();
        match input {
            InterruptInput::IsaIrq(irq) => pic.assert_level(irq),
            InterruptInput::IsaPulse(irq) => pic.assert_edge(irq),
        }
    }

    pub fn lower_irq(&mut self, input: InterruptInput) {
        // Pulses leave nothing held.
        if let InterruptInput::IsaIrq(irq) = input {
            self.pic.inner_mut().deassert_level(irq);
        }
    }

    /// Machine reset: the PIC returns to its masked BIOS-default state and the side latches
    /// go idle.
    pub fn reset(&mut self) {
        self.pic.reset();
        self.timer_gate.raise();
        self.key_wait.set_waiting(false);
    }
}

impl Default for PlatformInterrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptController for PlatformInterrupts {
    fn has_pending(&self) -> bool {
        self.pic.inner().has_pending()
    }

    fn acknowledge(&mut self) -> Option<u8> {
        self.pic.inner_mut().acknowledge()
    }

    fn eoi(&mut self, vector: u8) {
        self.pic.eoi(vector);
    }
}
