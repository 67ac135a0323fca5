use std::io;
use std::sync::{Arc, Mutex};

use pcbox::devices::pic8259::{
    register_pic8259_on_platform_interrupts, MASTER_CMD, MASTER_DATA, SLAVE_CMD, SLAVE_DATA,
};
use pcbox::interrupts::PicConfig;
use pcbox::platform::interrupts::{
    InterruptController, InterruptInput, PlatformInterrupts, SharedPlatformInterrupts,
};
use pcbox::platform::io::IoPortBus;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn board(config_json: &str) -> (SharedPlatformInterrupts, IoPortBus) {
    let config: PicConfig = serde_json::from_str(config_json).unwrap();
    let ints = PlatformInterrupts::with_config(config).unwrap().into_shared();
    let mut bus = IoPortBus::new();
    register_pic8259_on_platform_interrupts(&mut bus, ints.clone());
    (ints, bus)
}

/// What a PC BIOS does during POST: remap both chips and unmask the lines it services.
fn bios_init(bus: &mut IoPortBus) {
    bus.write_u8(MASTER_CMD, 0x11);
    bus.write_u8(MASTER_DATA, 0x08);
    bus.write_u8(MASTER_DATA, 0x04);
    bus.write_u8(MASTER_DATA, 0x01);
    bus.write_u8(SLAVE_CMD, 0x11);
    bus.write_u8(SLAVE_DATA, 0x70);
    bus.write_u8(SLAVE_DATA, 0x02);
    bus.write_u8(SLAVE_DATA, 0x01);

    // Timer, keyboard, cascade; RTC and primary IDE on the slave.
    bus.write_u8(MASTER_DATA, 0xF8);
    bus.write_u8(SLAVE_DATA, 0xBE);
}

/// Guest interrupt handler epilogue: EOI to the slave first, then to the master.
fn guest_eoi(bus: &mut IoPortBus, vector: u8) {
    if (0x70..0x78).contains(&vector) {
        bus.write_u8(SLAVE_CMD, 0x20);
    }
    bus.write_u8(MASTER_CMD, 0x20);
}

#[test]
fn interrupts_arrive_in_priority_order_during_boot() {
    let (ints, mut bus) = board("{}");
    let timer_gate = ints.borrow().timer_gate().clone();
    bios_init(&mut bus);

    {
        let mut ints = ints.borrow_mut();
        ints.raise_irq(InterruptInput::IsaIrq(14));
        ints.raise_irq(InterruptInput::IsaPulse(1));
        ints.raise_irq(InterruptInput::IsaPulse(0));
        // COM2 is masked by the BIOS.
        ints.raise_irq(InterruptInput::IsaPulse(3));
    }

    let mut dispatched = Vec::new();
    while ints.borrow().has_pending() {
        let vector = ints.borrow_mut().acknowledge().unwrap();
        dispatched.push(vector);
        if vector == 0x76 {
            // The disk handler reads the status register, which drops the line.
            ints.borrow_mut().lower_irq(InterruptInput::IsaIrq(14));
        }
        guest_eoi(&mut bus, vector);
    }

    assert_eq!(dispatched, vec![0x08, 0x09, 0x76]);
    assert!(!timer_gate.level());

    bus.write_u8(MASTER_CMD, 0x0A);
    assert_eq!(bus.read_u8(MASTER_CMD), 0x08);
    bus.write_u8(MASTER_CMD, 0x0B);
    assert_eq!(bus.read_u8(MASTER_CMD), 0x00);
}

#[test]
fn nested_timer_interrupt_preempts_slave_handler() {
    let (ints, mut bus) = board("{}");
    bios_init(&mut bus);

    ints.borrow_mut().raise_irq(InterruptInput::IsaPulse(8));
    assert_eq!(ints.borrow_mut().acknowledge(), Some(0x70));

    // Timer fires while the RTC handler runs; the keyboard has to wait.
    ints.borrow_mut().raise_irq(InterruptInput::IsaPulse(1));
    ints.borrow_mut().raise_irq(InterruptInput::IsaPulse(0));
    assert_eq!(ints.borrow_mut().acknowledge(), Some(0x08));
    guest_eoi(&mut bus, 0x08);

    assert_eq!(ints.borrow_mut().acknowledge(), Some(0x09));
    guest_eoi(&mut bus, 0x09);
    assert!(!ints.borrow().has_pending());

    guest_eoi(&mut bus, 0x70);
    assert_eq!(ints.borrow().pic().inner().master().in_service(), 0);
}

#[test]
fn requests_on_the_cascade_line_are_logged_and_dropped() {
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(log.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let (ints, mut bus) = board("{}");
        bios_init(&mut bus);
        ints.borrow_mut().raise_irq(InterruptInput::IsaPulse(2));
        ints.borrow_mut().raise_irq(InterruptInput::IsaPulse(16));
        assert!(!ints.borrow().has_pending());
    });

    let out = log.contents();
    assert!(out.contains("cascade line"), "{out}");
    assert!(out.contains("nonexistent IRQ line"), "{out}");
}

#[test]
fn irq2_redirect_board_delivers_on_irq9() {
    let (ints, mut bus) = board(r#"{ "redirect_irq2": true }"#);
    bios_init(&mut bus);
    bus.write_u8(SLAVE_DATA, 0xBC);

    ints.borrow_mut().raise_irq(InterruptInput::IsaPulse(2));
    assert_eq!(ints.borrow_mut().acknowledge(), Some(0x71));
}
