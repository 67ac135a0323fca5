//! IBM PC-compatible interrupt controller emulation: the 8259A PIC pair, its port wiring and
//! the CPU-facing interrupt router.

#![forbid(unsafe_code)]

pub use pcbox_devices as devices;
pub use pcbox_interrupts as interrupts;
pub use pcbox_platform as platform;
