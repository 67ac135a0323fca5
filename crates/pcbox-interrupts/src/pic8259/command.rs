use tracing::{debug, trace};

use super::bank::{Icw1, Icw4, IcwStep, PicBankId, ReadMode};
use super::DualPic8259;
use crate::config::SlaveReadSelect;

const OCW_IS_OCW3: u8 = 1 << 3;

const OCW3_READ_ISR: u8 = 1 << 0;
const OCW3_READ_LATCH: u8 = 1 << 1;
const OCW3_POLL: u8 = 1 << 2;
const OCW3_SPECIAL_MASK: u8 = 0b0110_0000;

/// Operation selected by the top three bits of an OCW2 write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ocw2Command {
    RotateInAutoEoiClear,
    NonSpecificEoi,
    NoOperation,
    SpecificEoi,
    RotateInAutoEoiSet,
    RotateOnNonSpecificEoi,
    SetPriority,
    RotateOnSpecificEoi,
}

impl Ocw2Command {
    pub fn decode(value: u8) -> Self {
        match value >> 5 {
            0 => Self::RotateInAutoEoiClear,
            1 => Self::NonSpecificEoi,
            2 => Self::NoOperation,
            3 => Self::SpecificEoi,
            4 => Self::RotateInAutoEoiSet,
            5 => Self::RotateOnNonSpecificEoi,
            6 => Self::SetPriority,
            _ => Self::RotateOnSpecificEoi,
        }
    }
}

impl DualPic8259 {
    pub(crate) fn write_control(&mut self, id: PicBankId, value: u8) {
        if value & Icw1::INIT.bits() != 0 {
            let icw1 = Icw1::from_bits_retain(value);
            trace!(bank = ?id, icw1 = ?icw1, "pic ICW1 -> awaiting ICW2");
            self.bank_mut(id).begin_init(icw1);
            // A master switched to single mode drops the wiring its last ICW3 set up.
            if id == PicBankId::Master && icw1.contains(Icw1::SNGL) {
                self.set_cascade_line(None);
            }
            self.update_pending();
        } else if value & OCW_IS_OCW3 == 0 {
            self.write_ocw2(id, value);
        } else {
            self.write_ocw3(id, value);
        }
    }

    fn write_ocw2(&mut self, id: PicBankId, value: u8) {
        let command = Ocw2Command::decode(value);
        debug!(bank = ?id, ?command, "pic OCW2");

        let bank = self.bank_mut(id);
        bank.ocw2 = value;
        // Only the specific form names its line; every other command retires the
        // highest-priority in-service request. Rotation is not modeled.
        let cleared = if command == Ocw2Command::SpecificEoi {
            let offset = value & 0x07;
            bank.clear_in_service(offset);
            Some(offset)
        } else {
            bank.clear_highest_in_service()
        };

        if id == PicBankId::Master && cleared == Some(1) {
            if let Some(signal) = self.callbacks.key_wait.as_mut() {
                if signal.key_waiting() {
                    signal.clear_key_interrupt();
                }
            }
        }

        self.update_pending();
    }

    fn write_ocw3(&mut self, id: PicBankId, value: u8) {
        let slave_select = self.config.slave_read_select;
        let bank = self.bank_mut(id);
        bank.ocw3 = value;

        if value & OCW3_POLL != 0 {
            bank.read_mode = ReadMode::PollNext;
        }
        // A read-register command in the same write overrides the poll request.
        if value & OCW3_READ_LATCH != 0 {
            let read_isr = match (id, slave_select) {
                (PicBankId::Slave, SlaveReadSelect::InServiceOnLatch) => true,
                _ => value & OCW3_READ_ISR != 0,
            };
            bank.read_mode = if read_isr {
                ReadMode::ReadInService
            } else {
                ReadMode::ReadPending
            };
        }
        if value & OCW3_SPECIAL_MASK == OCW3_SPECIAL_MASK {
            debug!(bank = ?id, "pic special mask mode requested (not modeled)");
        }
    }

    pub(crate) fn write_data(&mut self, id: PicBankId, value: u8) {
        let bank = self.bank_mut(id);
        let cascaded = !bank.icw1.contains(Icw1::SNGL);
        let needs_icw4 = bank.icw1.contains(Icw1::IC4);
        let after_icw3 = if needs_icw4 {
            IcwStep::AwaitIcw4
        } else {
            IcwStep::Ready
        };

        let step = bank.icw_step;
        match step {
            IcwStep::Ready => {
                bank.mask = value;
                self.update_pending();
            }
            IcwStep::AwaitIcw2 => {
                bank.vector_base = value & 0xF8;
                bank.icw_step = if cascaded {
                    IcwStep::AwaitIcw3
                } else {
                    after_icw3
                };
                trace!(
                    bank = ?id,
                    vector_base = bank.vector_base,
                    next = ?bank.icw_step,
                    "pic ICW2"
                );
            }
            IcwStep::AwaitIcw3 => {
                bank.icw3 = value;
                bank.icw_step = after_icw3;
                trace!(bank = ?id, icw3 = value, next = ?bank.icw_step, "pic ICW3");
                if id == PicBankId::Master && self.config.is_cascaded() {
                    let cascade = (value != 0).then(|| value.trailing_zeros() as u8);
                    self.set_cascade_line(cascade);
                    self.update_pending();
                }
            }
            IcwStep::AwaitIcw4 => {
                bank.icw4 = Icw4::from_bits_retain(value);
                bank.icw_step = IcwStep::Ready;
                trace!(bank = ?id, icw4 = ?bank.icw4, "pic ICW4 -> ready");
            }
        }
    }

    pub(crate) fn read_control(&mut self, id: PicBankId) -> u8 {
        let mode = self.bank(id).read_mode;
        match mode {
            ReadMode::PollNext => match self.poll(id) {
                Some(offset) => offset | 0x80,
                None => 0x00,
            },
            ReadMode::ReadInService => {
                let in_service = self.bank(id).in_service;
                match (id, self.cascade_line) {
                    (PicBankId::Master, Some(cascade)) if self.slave.in_service != 0 => {
                        in_service | (1 << cascade)
                    }
                    _ => in_service,
                }
            }
            ReadMode::ReadPending => self.bank(id).pending,
        }
    }
}
