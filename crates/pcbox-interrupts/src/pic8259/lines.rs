use tracing::warn;

use super::{split_line, DualPic8259, LINE_COUNT};

impl DualPic8259 {
    /// Maps a device-facing line number onto a line the pair can latch, or logs why it can't.
    fn route_line(&self, line: u8, op: &'static str) -> Option<u8> {
        if usize::from(line) >= LINE_COUNT {
            warn!(line, op, "pic: ignoring request on nonexistent IRQ line");
            return None;
        }
        if line >= 8 && !self.config.is_cascaded() {
            warn!(line, op, "pic: ignoring slave IRQ line without a slave PIC");
            return None;
        }
        if Some(line) == self.cascade_line {
            if self.config.redirect_irq2 && line == 2 {
                return Some(9);
            }
            warn!(line, op, "pic: ignoring request on the cascade line");
            return None;
        }
        Some(line)
    }

    fn set_pending_bit(&mut self, line: u8) {
        let (id, offset) = split_line(line);
        self.bank_mut(id).pending |= 1 << offset;
    }

    /// Latches an edge on `line`. Repeated edges before acceptance collapse into one request.
    pub fn assert_edge(&mut self, line: u8) {
        let Some(line) = self.route_line(line, "assert_edge") else {
            return;
        };
        self.set_pending_bit(line);
        self.update_pending();
    }

    /// Drives `line` high from a level-triggered source.
    ///
    /// Only the rising transition latches a request; the line then stays asserted until
    /// [`Self::deassert_level`].
    pub fn assert_level(&mut self, line: u8) {
        let Some(line) = self.route_line(line, "assert_level") else {
            return;
        };
        let bit = 1u16 << line;
        if self.current_level_lines & bit != 0 {
            return;
        }
        self.current_level_lines |= bit;
        self.set_pending_bit(line);
        self.update_pending();
    }

    /// Drives `line` low, withdrawing any request that has not been accepted yet.
    pub fn deassert_level(&mut self, line: u8) {
        let Some(line) = self.route_line(line, "deassert_level") else {
            return;
        };
        self.current_level_lines &= !(1u16 << line);
        let (id, offset) = split_line(line);
        self.bank_mut(id).pending &= !(1 << offset);
        self.update_pending();
    }

    pub fn set_irq_level(&mut self, line: u8, level: bool) {
        if level {
            self.assert_level(line);
        } else {
            self.deassert_level(line);
        }
    }
}
