use pcbox_interrupts::pic8259::{DualPic8259, MASTER_CMD, MASTER_DATA, SLAVE_CMD, SLAVE_DATA};
use pcbox_interrupts::{PicConfig, PicConfigError};

/// Firmware-side view of the PIC pair: programs it the way a PC BIOS does and translates
/// between vectors and IRQ numbers for the CPU glue.
///
/// Vector bases are always read back from the chips, so a guest that reprograms them through
/// the I/O ports is seen immediately.
#[derive(Debug)]
pub struct LegacyPic {
    inner: DualPic8259,
}

impl LegacyPic {
    /// AT pair programmed with the given vector bases, every line masked.
    pub fn new(master_base: u8, slave_base: u8) -> Self {
        let mut pic = Self {
            inner: DualPic8259::new(),
        };
        pic.set_offsets(master_base, slave_base);
        pic.mask_all();
        pic
    }

    pub fn with_config(
        config: PicConfig,
        master_base: u8,
        slave_base: u8,
    ) -> Result<Self, PicConfigError> {
        let mut pic = Self {
            inner: DualPic8259::with_config(config)?,
        };
        pic.set_offsets(master_base, slave_base);
        pic.mask_all();
        Ok(pic)
    }

    /// Runs the ICW1-ICW4 sequence on both chips (8086 mode, slave on IRQ2).
    ///
    /// A lone XT controller is programmed in single mode and `slave_base` is ignored.
    pub fn set_offsets(&mut self, master_base: u8, slave_base: u8) {
        if self.inner.config().is_cascaded() {
            self.inner.port_write_u8(MASTER_CMD, 0x11);
            self.inner.port_write_u8(MASTER_DATA, master_base);
            self.inner.port_write_u8(MASTER_DATA, 0x04);
            self.inner.port_write_u8(MASTER_DATA, 0x01);

            self.inner.port_write_u8(SLAVE_CMD, 0x11);
            self.inner.port_write_u8(SLAVE_DATA, slave_base);
            self.inner.port_write_u8(SLAVE_DATA, 0x02);
            self.inner.port_write_u8(SLAVE_DATA, 0x01);
        } else {
            self.inner.port_write_u8(MASTER_CMD, 0x13);
            self.inner.port_write_u8(MASTER_DATA, master_base);
            self.inner.port_write_u8(MASTER_DATA, 0x01);
        }
    }

    pub fn offsets(&self) -> (u8, u8) {
        (
            self.inner.master().vector_base(),
            self.inner.slave().vector_base(),
        )
    }

    pub fn mask_all(&mut self) {
        self.inner.port_write_u8(MASTER_DATA, 0xFF);
        if self.inner.config().is_cascaded() {
            self.inner.port_write_u8(SLAVE_DATA, 0xFF);
        }
    }

    pub fn set_masked(&mut self, irq: u8, masked: bool) {
        let (port, bit) = match irq {
            0..=7 => (MASTER_DATA, 1u8 << irq),
            8..=15 if self.inner.config().is_cascaded() => (SLAVE_DATA, 1u8 << (irq - 8)),
            _ => return,
        };

        // Read the IMR directly: in shadow mode the data port returns the vector instead.
        let mut imr = if port == MASTER_DATA {
            self.inner.master().mask()
        } else {
            self.inner.slave().mask()
        };
        if masked {
            imr |= bit;
        } else {
            imr &= !bit;
        }
        self.inner.port_write_u8(port, imr);
    }

    /// EOI for a previously acknowledged vector: a specific EOI to the owning chip, followed by
    /// one for the cascade line when the vector came from the slave.
    pub fn eoi(&mut self, vector: u8) {
        let Some(irq) = self.vector_to_irq(vector) else {
            return;
        };

        if irq < 8 {
            self.inner.port_write_u8(MASTER_CMD, 0x60 | irq);
        } else {
            self.inner.port_write_u8(SLAVE_CMD, 0x60 | (irq - 8));
            if let Some(cascade) = self.inner.cascade_line() {
                self.inner.port_write_u8(MASTER_CMD, 0x60 | cascade);
            }
        }
    }

    /// Machine reset of the controller; the master falls back to the BIOS vector base.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn vector_to_irq(&self, vector: u8) -> Option<u8> {
        let (master_base, slave_base) = self.offsets();
        if vector & 0xF8 == master_base {
            return Some(vector & 0x07);
        }
        if self.inner.config().is_cascaded() && vector & 0xF8 == slave_base {
            return Some(8 + (vector & 0x07));
        }
        None
    }

    pub fn inner(&self) -> &DualPic8259 {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut DualPic8259 {
        &mut self.inner
    }
}
