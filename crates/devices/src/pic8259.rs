//! Intel 8259A Programmable Interrupt Controller (PIC) port wiring.
//!
//! The PIC model lives in `pcbox-interrupts`; this module exposes it on a
//! [`pcbox_platform::io::IoPortBus`], either standalone or as part of a
//! [`PlatformInterrupts`] router.

use std::cell::RefCell;
use std::rc::Rc;

use pcbox_interrupts::TriggerSelect;
use pcbox_platform::interrupts::SharedPlatformInterrupts;
use pcbox_platform::io::{IoPortBus, PortIoDevice};

pub use pcbox_interrupts::pic8259::{
    DualPic8259, ELCR_MASTER, ELCR_SLAVE, MASTER_CMD, MASTER_DATA, SLAVE_CMD, SLAVE_DATA,
};
pub use pcbox_platform::interrupts::PlatformInterrupts;

pub type SharedPic8259 = Rc<RefCell<DualPic8259>>;

/// Multi-byte accesses hit consecutive ports, low byte first, exactly like the ISA bus
/// splitting a 16/32-bit `in`/`out`.
fn read_split(port: u16, size: u8, mut read_u8: impl FnMut(u16) -> u8) -> u32 {
    let mut bytes = [0u8; 4];
    for (i, byte) in bytes.iter_mut().take(usize::from(size.clamp(1, 4))).enumerate() {
        *byte = read_u8(port.wrapping_add(i as u16));
    }
    u32::from_le_bytes(bytes)
}

fn write_split(port: u16, size: u8, value: u32, mut write_u8: impl FnMut(u16, u8)) {
    for (i, byte) in value
        .to_le_bytes()
        .into_iter()
        .take(usize::from(size.clamp(1, 4)))
        .enumerate()
    {
        write_u8(port.wrapping_add(i as u16), byte);
    }
}

/// I/O-port view of a shared [`DualPic8259`].
///
/// `IoPortBus` maps one port to one device instance. The PIC pair answers on four to ten
/// ports, so the controller is shared behind `Rc<RefCell<_>>` and one `Pic8259Port` is
/// registered per port.
pub struct Pic8259Port {
    pic: SharedPic8259,
    port: u16,
}

impl Pic8259Port {
    pub fn new(pic: SharedPic8259, port: u16) -> Self {
        Self { pic, port }
    }
}

impl PortIoDevice for Pic8259Port {
    fn read(&mut self, port: u16, size: u8) -> u32 {
        debug_assert_eq!(port, self.port);
        let mut pic = self.pic.borrow_mut();
        read_split(port, size, |p| pic.port_read_u8(p))
    }

    fn write(&mut self, port: u16, size: u8, value: u32) {
        debug_assert_eq!(port, self.port);
        let mut pic = self.pic.borrow_mut();
        write_split(port, size, value, |p, v| pic.port_write_u8(p, v));
    }

    fn reset(&mut self) {
        // Every view shares the controller; resetting it more than once is harmless.
        self.pic.borrow_mut().reset();
    }
}

/// Port ranges, as `(start, len)`, that a PIC built from `pic`'s configuration answers on.
fn decoded_ranges(pic: &DualPic8259) -> Vec<(u16, u16)> {
    let config = pic.config();
    let mut ranges = vec![(MASTER_CMD, config.master_alias_span)];
    if config.is_cascaded() {
        ranges.push((SLAVE_CMD, 2));
    }
    if config.trigger_select == TriggerSelect::Elcr {
        ranges.push((ELCR_MASTER, 2));
    }
    ranges
}

/// Registers a PIC on an [`IoPortBus`]: the master (including its alias range on boards that
/// decode 0x20-0x27), the slave when cascaded, and the ELCR pair when the board has one.
pub fn register_pic8259(bus: &mut IoPortBus, pic: SharedPic8259) {
    let ranges = decoded_ranges(&pic.borrow());
    for (start, len) in ranges {
        bus.register_shared_range(start, len, |port| {
            Box::new(Pic8259Port::new(pic.clone(), port))
        });
    }
}

/// Registers the PIC I/O ports on an [`IoPortBus`], backed by a [`PlatformInterrupts`].
///
/// This is the machine wiring used by the PC board: guest accesses to the PIC ports update the
/// same controller the CPU polls through
/// [`InterruptController`](pcbox_platform::interrupts::InterruptController).
pub fn register_pic8259_on_platform_interrupts(
    bus: &mut IoPortBus,
    interrupts: SharedPlatformInterrupts,
) {
    struct PlatformPicPort {
        interrupts: SharedPlatformInterrupts,
        port: u16,
    }

    impl PortIoDevice for PlatformPicPort {
        fn read(&mut self, port: u16, size: u8) -> u32 {
            debug_assert_eq!(port, self.port);
            let mut ints = self.interrupts.borrow_mut();
            let pic = ints.pic_mut().inner_mut();
            read_split(port, size, |p| pic.port_read_u8(p))
        }

        fn write(&mut self, port: u16, size: u8, value: u32) {
            debug_assert_eq!(port, self.port);
            let mut ints = self.interrupts.borrow_mut();
            let pic = ints.pic_mut().inner_mut();
            write_split(port, size, value, |p, v| pic.port_write_u8(p, v));
        }

        fn reset(&mut self) {
            self.interrupts.borrow_mut().reset();
        }
    }

    let ranges = decoded_ranges(interrupts.borrow().pic().inner());
    for (start, len) in ranges {
        bus.register_shared_range(start, len, |port| {
            Box::new(PlatformPicPort {
                interrupts: interrupts.clone(),
                port,
            })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbox_interrupts::PicConfig;
    use pcbox_platform::interrupts::{InterruptController, InterruptInput};

    fn init_legacy_pc(bus: &mut IoPortBus) {
        // Master: base 0x20, slave on IRQ2, 8086 mode.
        bus.write_u8(MASTER_CMD, 0x11);
        bus.write_u8(MASTER_DATA, 0x20);
        bus.write_u8(MASTER_DATA, 0x04);
        bus.write_u8(MASTER_DATA, 0x01);

        // Slave: base 0x28, cascade identity 2, 8086 mode.
        bus.write_u8(SLAVE_CMD, 0x11);
        bus.write_u8(SLAVE_DATA, 0x28);
        bus.write_u8(SLAVE_DATA, 0x02);
        bus.write_u8(SLAVE_DATA, 0x01);
    }

    fn pic_on_bus(config: PicConfig) -> (SharedPic8259, IoPortBus) {
        let pic = Rc::new(RefCell::new(DualPic8259::with_config(config).unwrap()));
        let mut bus = IoPortBus::new();
        register_pic8259(&mut bus, pic.clone());
        (pic, bus)
    }

    #[test]
    fn init_sets_vector_bases() {
        let (pic, mut bus) = pic_on_bus(PicConfig::at());
        init_legacy_pc(&mut bus);

        pic.borrow_mut().assert_edge(0);
        assert_eq!(pic.borrow_mut().acknowledge(), Some(0x20));
        bus.write_u8(MASTER_CMD, 0x20);

        pic.borrow_mut().assert_edge(8);
        assert_eq!(pic.borrow_mut().acknowledge(), Some(0x28));
    }

    #[test]
    fn fixed_priority_and_eoi() {
        let (pic, mut bus) = pic_on_bus(PicConfig::at());
        init_legacy_pc(&mut bus);

        pic.borrow_mut().assert_edge(3);
        pic.borrow_mut().assert_edge(1);
        assert_eq!(pic.borrow_mut().acknowledge(), Some(0x21));

        // IRQ3 is lower priority than IRQ1; it is blocked until EOI.
        assert_eq!(pic.borrow_mut().acknowledge(), None);
        bus.write_u8(MASTER_CMD, 0x20);
        assert_eq!(pic.borrow_mut().acknowledge(), Some(0x23));
    }

    #[test]
    fn isr_and_irr_are_readable_through_the_bus() {
        let (pic, mut bus) = pic_on_bus(PicConfig::at());
        init_legacy_pc(&mut bus);
        bus.write_u8(MASTER_DATA, 0x40);

        pic.borrow_mut().assert_edge(6);
        pic.borrow_mut().assert_edge(4);
        assert_eq!(pic.borrow_mut().acknowledge(), Some(0x24));

        bus.write_u8(MASTER_CMD, 0x0A);
        assert_eq!(bus.read_u8(MASTER_CMD), 0x40);
        bus.write_u8(MASTER_CMD, 0x0B);
        assert_eq!(bus.read_u8(MASTER_CMD), 0x10);
    }

    #[test]
    fn poll_through_the_bus_acknowledges() {
        let (pic, mut bus) = pic_on_bus(PicConfig::at());
        init_legacy_pc(&mut bus);

        pic.borrow_mut().assert_edge(11);
        bus.write_u8(MASTER_CMD, 0x0C);
        assert_eq!(bus.read_u8(MASTER_CMD), 0x82);
        assert_eq!(pic.borrow().slave().in_service(), 0x08);
    }

    #[test]
    fn ioportbus_word_accesses_span_command_and_data_ports() {
        let (pic, mut bus) = pic_on_bus(PicConfig::at());
        init_legacy_pc(&mut bus);

        // 16-bit write to the command port: low byte goes to 0x20 (OCW3, read ISR), high byte
        // to 0x21 (IMR).
        bus.write(MASTER_CMD, 2, 0xAA0B);
        assert_eq!(bus.read_u8(MASTER_DATA), 0xAA);

        pic.borrow_mut().assert_edge(0);
        assert_eq!(pic.borrow_mut().acknowledge(), Some(0x20));
        let v = bus.read(MASTER_CMD, 2) as u16;
        assert_eq!(v, 0xAA01);
    }

    #[test]
    fn dword_read_past_the_master_floats_high() {
        let (_pic, mut bus) = pic_on_bus(PicConfig::at());
        init_legacy_pc(&mut bus);
        bus.write_u8(MASTER_DATA, 0x5A);
        bus.write_u8(MASTER_CMD, 0x0A);

        assert_eq!(bus.read(MASTER_DATA, 4), 0xFFFF_FF5A);
    }

    #[test]
    fn xt_board_leaves_slave_ports_unmapped() {
        let (_pic, mut bus) = pic_on_bus(PicConfig::xt());
        assert_eq!(bus.read_u8(SLAVE_DATA), 0xFF);
        bus.write_u8(MASTER_DATA, 0x3C);
        assert_eq!(bus.read_u8(MASTER_DATA), 0x3C);
    }

    #[test]
    fn aliased_board_decodes_eight_master_ports() {
        let (pic, mut bus) = pic_on_bus(PicConfig::xt_aliased());
        bus.write_u8(0x26, 0x13);
        bus.write_u8(0x25, 0x08);
        bus.write_u8(0x21, 0x01);
        bus.write_u8(0x27, 0xF0);

        assert_eq!(pic.borrow().master().vector_base(), 0x08);
        assert_eq!(bus.read_u8(0x23), 0xF0);
        assert_eq!(bus.read_u8(0x28), 0xFF);
    }

    #[test]
    fn elcr_ports_are_mapped_only_on_elcr_boards() {
        let (_pic, mut bus) = pic_on_bus(PicConfig::at());
        assert_eq!(bus.read_u8(ELCR_MASTER), 0xFF);

        let cfg = PicConfig {
            trigger_select: TriggerSelect::Elcr,
            ..PicConfig::at()
        };
        let (pic, mut bus) = pic_on_bus(cfg);
        bus.write(ELCR_MASTER, 2, 0x0E20);
        assert_eq!(pic.borrow().elcr(), 0x0E20);
        assert_eq!(bus.read(ELCR_MASTER, 2), 0x0E20);
    }

    #[test]
    fn bus_reset_returns_pic_to_masked_state() {
        let (pic, mut bus) = pic_on_bus(PicConfig::at());
        init_legacy_pc(&mut bus);
        pic.borrow_mut().assert_edge(3);
        assert!(pic.borrow().has_pending());

        bus.reset();
        assert!(!pic.borrow().has_pending());
        assert_eq!(bus.read_u8(MASTER_DATA), 0xFF);
        assert_eq!(bus.read_u8(SLAVE_DATA), 0xFF);
    }

    #[test]
    fn platform_wiring_shares_state_with_the_cpu_side() {
        let ints = PlatformInterrupts::new().into_shared();
        let mut bus = IoPortBus::new();
        register_pic8259_on_platform_interrupts(&mut bus, ints.clone());

        // The guest unmasks IRQ1 through the bus; the CPU sees it through the router.
        bus.write_u8(MASTER_DATA, 0xFD);
        ints.borrow_mut().raise_irq(InterruptInput::IsaPulse(1));
        assert!(ints.borrow().has_pending());
        assert_eq!(ints.borrow_mut().acknowledge(), Some(0x09));

        bus.write_u8(MASTER_CMD, 0x0B);
        assert_eq!(bus.read_u8(MASTER_CMD), 0x02);
        bus.write_u8(MASTER_CMD, 0x20);
        assert_eq!(bus.read_u8(MASTER_CMD), 0x00);
    }

    #[test]
    fn cpu_eoi_follows_vectors_the_guest_programmed() {
        let ints = PlatformInterrupts::new().into_shared();
        let mut bus = IoPortBus::new();
        register_pic8259_on_platform_interrupts(&mut bus, ints.clone());

        // Protected-mode remap away from the BIOS bases.
        init_legacy_pc(&mut bus);
        bus.write_u8(MASTER_DATA, 0xF9);
        bus.write_u8(SLAVE_DATA, 0xFB);
        assert_eq!(ints.borrow().pic().offsets(), (0x20, 0x28));

        ints.borrow_mut().raise_irq(InterruptInput::IsaPulse(1));
        assert_eq!(ints.borrow_mut().acknowledge(), Some(0x21));
        ints.borrow_mut().eoi(0x21);
        assert_eq!(ints.borrow().pic().inner().master().in_service(), 0);

        ints.borrow_mut().raise_irq(InterruptInput::IsaPulse(10));
        assert_eq!(ints.borrow_mut().acknowledge(), Some(0x2A));
        ints.borrow_mut().eoi(0x2A);
        assert_eq!(ints.borrow().pic().inner().slave().in_service(), 0);
        assert_eq!(ints.borrow().pic().inner().master().in_service(), 0);
    }
}
