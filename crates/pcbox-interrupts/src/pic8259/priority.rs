use tracing::trace;

use super::bank::{PicBankId, ReadMode};
use super::{split_line, DualPic8259, LINE_COUNT};

/// Fixed priority of a lone XT-style PIC: IRQ0 highest, IRQ7 lowest.
const XT_ORDER: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Priority of the standard AT pair: the slave's lines take the slot of the IRQ2 cascade.
const AT_ORDER: [u8; 15] = [0, 1, 8, 9, 10, 11, 12, 13, 14, 15, 3, 4, 5, 6, 7];

/// Logical lines in descending priority, plus the inverse rank lookup.
///
/// Ranks grow with priority, so "rank >= rank(c)" means "at least as important as `c`".
/// The cascade line itself is never scanned, but it carries the rank of its slot so that a
/// cascade in service blocks the whole slave and every master line below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PriorityTable {
    order: [u8; LINE_COUNT],
    len: usize,
    rank: [Option<u8>; LINE_COUNT],
}

impl PriorityTable {
    pub(crate) fn single() -> Self {
        Self::from_order(&XT_ORDER, None)
    }

    pub(crate) fn cascaded(cascade_line: u8) -> Self {
        if cascade_line == 2 {
            return Self::from_order(&AT_ORDER, Some(cascade_line));
        }
        let (order, len) = interleaved_order(cascade_line);
        Self::from_order(&order[..len], Some(cascade_line))
    }

    fn from_order(lines: &[u8], cascade_line: Option<u8>) -> Self {
        let mut order = [0u8; LINE_COUNT];
        let mut rank = [None; LINE_COUNT];
        for (pos, &line) in lines.iter().enumerate() {
            order[pos] = line;
            rank[usize::from(line)] = Some((lines.len() - pos) as u8);
        }
        if let Some(cascade) = cascade_line {
            rank[usize::from(cascade)] = rank[8];
        }
        Self {
            order,
            len: lines.len(),
            rank,
        }
    }

    pub(crate) fn order(&self) -> &[u8] {
        &self.order[..self.len]
    }

    pub(crate) fn rank(&self, line: u8) -> Option<u8> {
        self.rank.get(usize::from(line)).copied().flatten()
    }
}

fn interleaved_order(cascade_line: u8) -> ([u8; LINE_COUNT], usize) {
    let mut order = [0u8; LINE_COUNT];
    let mut len = 0;
    for line in 0..8u8 {
        if line == cascade_line {
            for slave_line in 8..16u8 {
                order[len] = slave_line;
                len += 1;
            }
        } else {
            order[len] = line;
            len += 1;
        }
    }
    (order, len)
}

/// Which lines a resolver pass may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanScope {
    All,
    Slave,
}

impl DualPic8259 {
    /// True if an in-service line visible to a candidate on `candidate` is at least as
    /// important as `rank`.
    ///
    /// Slave in-service bits only reach the master through its cascade line, so they never
    /// block a master candidate directly.
    fn in_service_at_or_above(&self, rank: u8, candidate: PicBankId) -> bool {
        (0..LINE_COUNT as u8).any(|line| {
            let Some(r) = self.priority.rank(line) else {
                return false;
            };
            if r < rank {
                return false;
            }
            let (id, offset) = split_line(line);
            if id == PicBankId::Slave && candidate == PicBankId::Master {
                return false;
            }
            self.bank(id).in_service & (1 << offset) != 0
        })
    }

    fn is_acceptable(&self, line: u8) -> bool {
        let Some(rank) = self.priority.rank(line) else {
            return false;
        };
        let (id, offset) = split_line(line);
        let bank = self.bank(id);
        let bit = 1u8 << offset;
        if bank.pending & bit == 0 || bank.mask & bit != 0 {
            return false;
        }
        if id == PicBankId::Slave {
            // Masking the cascade input on the master silences the whole slave.
            match self.cascade_line {
                Some(cascade) if self.master.mask & (1 << cascade) == 0 => {}
                _ => return false,
            }
        }
        !self.in_service_at_or_above(rank, id)
    }

    /// Finds the single highest-priority acceptable line without touching any state.
    pub(crate) fn resolve(&self, scope: ScanScope) -> Option<u8> {
        self.priority
            .order()
            .iter()
            .copied()
            .filter(|&line| scope == ScanScope::All || line >= 8)
            .find(|&line| self.is_acceptable(line))
    }

    /// Moves `line` from pending to in-service and returns the vector it delivers.
    pub(crate) fn accept(&mut self, line: u8) -> u8 {
        let (id, offset) = split_line(line);
        let bit = 1u8 << offset;
        let level_held =
            self.level_triggered_lines() & self.current_level_lines & (1u16 << line) != 0;

        let bank = self.bank_mut(id);
        if !level_held {
            bank.pending &= !bit;
        }
        bank.set_in_service(offset);
        if bank.auto_eoi() {
            bank.clear_in_service(offset);
        }
        let vector = bank.vector_base.wrapping_add(offset);

        if id == PicBankId::Slave {
            if let Some(cascade) = self.cascade_line {
                self.master.set_in_service(cascade);
                if self.master.auto_eoi() {
                    self.master.clear_in_service(cascade);
                }
            }
        }

        self.update_pending();

        if line == 0 {
            if let Some(gate) = self.callbacks.timer_gate.as_mut() {
                gate.set_gate(false);
            }
        }

        trace!(line, vector, "pic accepted irq");
        vector
    }

    /// Interrupt acknowledge cycle: delivers the highest-priority acceptable request.
    ///
    /// Returns `None` when nothing is deliverable.
    pub fn acknowledge(&mut self) -> Option<u8> {
        let line = self.resolve(ScanScope::All)?;
        Some(self.accept(line))
    }

    /// The vector [`Self::acknowledge`] would deliver right now, without side effects.
    pub fn peek_vector(&self) -> Option<u8> {
        let line = self.resolve(ScanScope::All)?;
        let (id, offset) = split_line(line);
        Some(self.bank(id).vector_base.wrapping_add(offset))
    }

    /// Poll command: accepts a request exactly like [`Self::acknowledge`] but reports the line
    /// offset within `id` instead of a vector.
    ///
    /// Polling the master reports the cascade line when the winner sits on the slave. Polling
    /// the slave only considers slave lines.
    pub fn poll(&mut self, id: PicBankId) -> Option<u8> {
        self.bank_mut(id).read_mode = ReadMode::ReadPending;

        match id {
            PicBankId::Master => {
                let line = self.resolve(ScanScope::All)?;
                self.accept(line);
                if line >= 8 {
                    self.cascade_line
                } else {
                    Some(line)
                }
            }
            PicBankId::Slave => {
                let line = self.resolve(ScanScope::Slave)?;
                self.accept(line);
                Some(line - 8)
            }
        }
    }
}
