//! Intel 8259A Programmable Interrupt Controller pair (master + slave).
//!
//! Lines are numbered 0-15: 0-7 live on the master, 8-15 on the slave. The slave's output
//! is wired to the master's cascade line (programmed through the master's ICW3, IRQ2 on every
//! AT-compatible board).
//!
//! Devices drive lines through [`DualPic8259::assert_edge`], [`DualPic8259::assert_level`] and
//! [`DualPic8259::deassert_level`]; the CPU polls [`DualPic8259::has_pending`] at instruction
//! boundaries and fetches vectors with [`DualPic8259::acknowledge`]; the guest talks to the
//! chips through [`DualPic8259::port_read_u8`] / [`DualPic8259::port_write_u8`].

mod bank;
mod command;
mod lines;
mod priority;

use tracing::debug;

use crate::config::{PicConfig, PicConfigError, TriggerSelect};
use crate::sideband::{KeyWaitSignal, PicCallbacks, TimerGate};

pub use bank::{Icw1, Icw4, IcwStep, PicBank, PicBankId, ReadMode};
use priority::PriorityTable;

pub const MASTER_CMD: u16 = 0x20;
pub const MASTER_DATA: u16 = 0x21;
pub const SLAVE_CMD: u16 = 0xA0;
pub const SLAVE_DATA: u16 = 0xA1;

/// Edge/level control register, low byte (IRQ0-7).
pub const ELCR_MASTER: u16 = 0x4D0;
/// Edge/level control register, high byte (IRQ8-15).
pub const ELCR_SLAVE: u16 = 0x4D1;

/// IRQ0-2, IRQ8 and IRQ13 are always edge-triggered on PIIX-style chipsets.
const ELCR_WRITABLE: u16 = 0xDEF8;

pub(crate) const LINE_COUNT: usize = 16;

pub(crate) fn split_line(line: u8) -> (PicBankId, u8) {
    let id = if line < 8 {
        PicBankId::Master
    } else {
        PicBankId::Slave
    };
    (id, line - id.line_base())
}

/// Both 8259A chips of a PC, plus the shared wiring between them.
#[derive(Debug)]
pub struct DualPic8259 {
    config: PicConfig,
    master: PicBank,
    slave: PicBank,

    /// Master line carrying the slave's output; `None` until the master's ICW3 names one.
    cascade_line: Option<u8>,
    priority: PriorityTable,

    /// Lines currently held asserted by level-triggered sources.
    current_level_lines: u16,
    elcr: u16,
    /// Deliverable requests: master in bits 0-7, slave in bits 8-15.
    aggregate: u16,
    shadow: bool,

    callbacks: PicCallbacks,
}

impl DualPic8259 {
    /// Power-on state for a standard AT pair: every register zeroed.
    pub fn new() -> Self {
        Self::build(PicConfig::at())
    }

    pub fn with_config(config: PicConfig) -> Result<Self, PicConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PicConfig) -> Self {
        Self {
            shadow: config.shadow,
            config,
            master: PicBank::default(),
            slave: PicBank::default(),
            cascade_line: None,
            priority: PriorityTable::single(),
            current_level_lines: 0,
            elcr: 0,
            aggregate: 0,
            callbacks: PicCallbacks::default(),
        }
    }

    /// Machine reset: both chips masked and idle, master vectors back at the BIOS default
    /// of 0x08. Programmed ICW3 wiring and the slave's vector base survive.
    pub fn reset(&mut self) {
        for bank in [&mut self.master, &mut self.slave] {
            bank.icw_step = IcwStep::Ready;
            bank.mask = 0xFF;
            bank.mask2 = 0;
            bank.pending = 0;
            bank.in_service = 0;
        }
        self.master.vector_base = 0x08;
        self.master.read_mode = ReadMode::ReadInService;
        self.current_level_lines = 0;
        self.elcr = 0;
        self.update_pending();
    }

    pub fn config(&self) -> &PicConfig {
        &self.config
    }

    pub fn master(&self) -> &PicBank {
        &self.master
    }

    pub fn slave(&self) -> &PicBank {
        &self.slave
    }

    pub fn bank(&self, id: PicBankId) -> &PicBank {
        match id {
            PicBankId::Master => &self.master,
            PicBankId::Slave => &self.slave,
        }
    }

    pub(crate) fn bank_mut(&mut self, id: PicBankId) -> &mut PicBank {
        match id {
            PicBankId::Master => &mut self.master,
            PicBankId::Slave => &mut self.slave,
        }
    }

    pub fn cascade_line(&self) -> Option<u8> {
        self.cascade_line
    }

    pub fn current_level_lines(&self) -> u16 {
        self.current_level_lines
    }

    /// Any request that would get past both banks' masks right now.
    pub fn has_pending(&self) -> bool {
        self.aggregate != 0
    }

    /// Deliverable request bitmap, master in bits 0-7 and slave in bits 8-15.
    pub fn pending_irqs(&self) -> u16 {
        self.aggregate
    }

    pub fn shadow(&self) -> bool {
        self.shadow
    }

    /// Exposes (or hides) chipset shadow registers on the PIC ports.
    pub fn set_shadow(&mut self, shadow: bool) {
        self.shadow = shadow;
    }

    pub fn elcr(&self) -> u16 {
        self.elcr
    }

    pub fn set_elcr(&mut self, elcr: u16) {
        self.elcr = elcr & ELCR_WRITABLE;
        self.update_pending();
    }

    pub fn connect_timer_gate(&mut self, gate: Box<dyn TimerGate>) {
        self.callbacks.timer_gate = Some(gate);
    }

    pub fn connect_key_wait(&mut self, signal: Box<dyn KeyWaitSignal>) {
        self.callbacks.key_wait = Some(signal);
    }

    /// Lines whose pending bit follows the electrical level instead of latching edges.
    pub(crate) fn level_triggered_lines(&self) -> u16 {
        match self.config.trigger_select {
            TriggerSelect::Assertion => 0xFFFF,
            TriggerSelect::Icw1 => {
                let mut lines = 0;
                if self.master.icw1.contains(Icw1::LTIM) {
                    lines |= 0x00FF;
                }
                if self.slave.icw1.contains(Icw1::LTIM) {
                    lines |= 0xFF00;
                }
                lines
            }
            TriggerSelect::Elcr => self.elcr,
        }
    }

    /// Recomputes everything derived from the banks: level re-latching, the slave's mirror on
    /// the master's cascade line, and the aggregate pending bitmap.
    pub(crate) fn update_pending(&mut self) {
        let held = self.current_level_lines & self.level_triggered_lines();
        self.master.pending |= held as u8;
        if self.config.is_cascaded() {
            self.slave.pending |= (held >> 8) as u8;
        }

        let mut aggregate = 0u16;
        if let Some(cascade) = self.cascade_line {
            let bit = 1u8 << cascade;
            if self.slave.deliverable() != 0 {
                self.master.pending |= bit;
            } else {
                self.master.pending &= !bit;
            }
            if (self.master.mask | self.master.mask2) & bit == 0 {
                aggregate |= u16::from(self.slave.deliverable()) << 8;
            }
        }
        aggregate |= u16::from(self.master.deliverable());
        self.aggregate = aggregate;
    }

    /// Rebuilds the priority table after the wiring changed (master ICW3).
    pub(crate) fn set_cascade_line(&mut self, cascade_line: Option<u8>) {
        self.cascade_line = cascade_line;
        self.priority = match cascade_line {
            Some(line) => PriorityTable::cascaded(line),
            None => PriorityTable::single(),
        };
    }

    fn decode_port(&self, port: u16) -> Option<(PicBankId, bool)> {
        let master_end = MASTER_CMD + self.config.master_alias_span;
        if (MASTER_CMD..master_end).contains(&port) {
            return Some((PicBankId::Master, port & 1 != 0));
        }
        if self.config.is_cascaded() && (SLAVE_CMD..=SLAVE_DATA).contains(&port) {
            return Some((PicBankId::Slave, port & 1 != 0));
        }
        None
    }

    pub fn port_read_u8(&mut self, port: u16) -> u8 {
        match port {
            ELCR_MASTER => return self.elcr as u8,
            ELCR_SLAVE => return (self.elcr >> 8) as u8,
            _ => {}
        }

        let Some((id, is_data)) = self.decode_port(port) else {
            return 0xFF;
        };

        // Shadow registers only answer on the canonical port pair, not on aliases.
        if self.shadow && matches!(port, MASTER_CMD | MASTER_DATA | SLAVE_CMD | SLAVE_DATA) {
            let bank = self.bank(id);
            return if is_data {
                bank.shadow_vector()
            } else {
                bank.shadow_status()
            };
        }

        if is_data {
            self.bank(id).mask
        } else {
            self.read_control(id)
        }
    }

    pub fn port_write_u8(&mut self, port: u16, value: u8) {
        match port {
            ELCR_MASTER => {
                return self.set_elcr((self.elcr & 0xFF00) | u16::from(value));
            }
            ELCR_SLAVE => {
                return self.set_elcr((self.elcr & 0x00FF) | (u16::from(value) << 8));
            }
            _ => {}
        }

        let Some((id, is_data)) = self.decode_port(port) else {
            return;
        };
        if is_data {
            self.write_data(id, value);
        } else {
            self.write_control(id, value);
        }
    }

    /// Logs both banks at debug level.
    pub fn dump_state(&self) {
        let banks = [
            ("master", &self.master, self.cascade_line),
            ("slave", &self.slave, None),
        ];
        let present = if self.config.is_cascaded() { 2 } else { 1 };
        for (name, bank, line) in banks.into_iter().take(present) {
            debug!(
                bank = name,
                mask = %format!("{:#04x}", bank.mask),
                pending = %format!("{:#04x}", bank.pending),
                in_service = %format!("{:#04x}", bank.in_service),
                level = bank.icw1.contains(Icw1::LTIM),
                vector = %format!("{:#04x}", bank.vector_base),
                cascade = ?line,
                "pic state"
            );
        }
    }
}

impl Default for DualPic8259 {
    fn default() -> Self {
        Self::new()
    }
}
