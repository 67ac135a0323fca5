use bitflags::bitflags;

bitflags! {
    /// Decoded ICW1 bits (control port write with bit 4 set).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Icw1: u8 {
        /// ICW4 will follow.
        const IC4 = 1 << 0;
        /// Single mode: no slave attached, ICW3 is skipped.
        const SNGL = 1 << 1;
        /// Call address interval 4 (MCS-80/85 only, ignored).
        const ADI = 1 << 2;
        /// Level-triggered input mode.
        const LTIM = 1 << 3;
        const INIT = 1 << 4;
    }
}

bitflags! {
    /// Decoded ICW4 bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Icw4: u8 {
        /// 8086/8088 mode.
        const UPM = 1 << 0;
        const AEOI = 1 << 1;
        const BUF_MASTER = 1 << 2;
        const BUF = 1 << 3;
        /// Special fully nested mode.
        const SFNM = 1 << 4;
    }
}

/// Position in the ICW1..ICW4 initialization sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IcwStep {
    AwaitIcw2,
    AwaitIcw3,
    AwaitIcw4,
    /// Initialization complete; data port writes are OCW1.
    #[default]
    Ready,
}

/// What a read of the control port returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    #[default]
    ReadPending,
    ReadInService,
    /// The next control port read performs a poll command.
    PollNext,
}

/// Which of the two 8259A chips a register bank models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PicBankId {
    Master,
    Slave,
}

impl PicBankId {
    /// Offset of this bank's first line in the 16-line logical numbering.
    pub fn line_base(self) -> u8 {
        match self {
            PicBankId::Master => 0,
            PicBankId::Slave => 8,
        }
    }
}

/// Chip-visible state of a single 8259A.
#[derive(Debug, Clone, Default)]
pub struct PicBank {
    pub(crate) icw1: Icw1,
    pub(crate) icw3: u8,
    pub(crate) icw4: Icw4,
    pub(crate) icw_step: IcwStep,

    pub(crate) mask: u8,
    pub(crate) mask2: u8,
    pub(crate) pending: u8,
    pub(crate) in_service: u8,

    pub(crate) vector_base: u8,
    pub(crate) ocw2: u8,
    pub(crate) ocw3: u8,
    pub(crate) read_mode: ReadMode,
}

impl PicBank {
    /// In-place reset performed by an ICW1 write.
    pub(crate) fn begin_init(&mut self, icw1: Icw1) {
        self.mask = 0;
        self.mask2 = 0;
        self.pending = 0;
        self.in_service = 0;
        self.icw1 = icw1;
        self.icw_step = IcwStep::AwaitIcw2;
    }

    /// Recomputes `mask2` from `in_service`: the highest-priority (lowest-numbered) line in
    /// service blocks itself and every line numbered above it.
    pub(crate) fn update_mask2(&mut self) {
        self.mask2 = match self.in_service.trailing_zeros() {
            8 => 0,
            c => 0xFFu8 << c,
        };
    }

    pub(crate) fn set_in_service(&mut self, offset: u8) {
        self.in_service |= 1 << offset;
        self.update_mask2();
    }

    pub(crate) fn clear_in_service(&mut self, offset: u8) {
        self.in_service &= !(1 << offset);
        self.update_mask2();
    }

    /// Clears the lowest-numbered in-service bit, returning its offset.
    pub(crate) fn clear_highest_in_service(&mut self) -> Option<u8> {
        if self.in_service == 0 {
            return None;
        }
        let offset = self.in_service.trailing_zeros() as u8;
        self.clear_in_service(offset);
        Some(offset)
    }

    /// Requests that survive both the operator mask and the in-service cutoff.
    pub(crate) fn deliverable(&self) -> u8 {
        self.pending & !self.mask & !self.mask2
    }

    pub(crate) fn auto_eoi(&self) -> bool {
        self.icw4.contains(Icw4::AEOI)
    }

    pub fn pending(&self) -> u8 {
        self.pending
    }

    pub fn in_service(&self) -> u8 {
        self.in_service
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    pub fn mask2(&self) -> u8 {
        self.mask2
    }

    pub fn vector_base(&self) -> u8 {
        self.vector_base
    }

    pub fn icw_step(&self) -> IcwStep {
        self.icw_step
    }

    pub fn read_mode(&self) -> ReadMode {
        self.read_mode
    }

    pub fn icw1(&self) -> Icw1 {
        self.icw1
    }

    pub fn icw3(&self) -> u8 {
        self.icw3
    }

    pub fn icw4(&self) -> Icw4 {
        self.icw4
    }

    pub fn ocw2(&self) -> u8 {
        self.ocw2
    }

    pub fn ocw3(&self) -> u8 {
        self.ocw3
    }

    /// Status byte exposed on the control port by chipsets with PIC shadow registers.
    ///
    /// Bit layout: 4 = OCW3 special mask, 3 = OCW2 rotate, 2 = ICW4 SFNM, 1 = ICW4 AEOI,
    /// 0 = ICW4 buffered.
    pub fn shadow_status(&self) -> u8 {
        let mut ret = ((self.ocw3 & 0x20) >> 5) << 4;
        ret |= ((self.ocw2 & 0x80) >> 7) << 3;
        ret |= u8::from(self.icw4.contains(Icw4::SFNM)) << 2;
        ret |= u8::from(self.icw4.contains(Icw4::AEOI)) << 1;
        ret |= u8::from(self.icw4.contains(Icw4::BUF));
        ret
    }

    /// Vector byte exposed on the data port in shadow mode.
    pub fn shadow_vector(&self) -> u8 {
        (self.vector_base & 0xF8) >> 3
    }
}
