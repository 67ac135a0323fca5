//! x86 port I/O dispatch.
//!
//! Devices implement [`PortIoDevice`] and are mapped onto an [`IoPortBus`] either per port or
//! over a contiguous range. Exact-port mappings win over ranges, and an access nobody decodes
//! floats high like an open ISA bus.

use std::collections::HashMap;

use tracing::trace;

pub trait PortIoDevice {
    /// `size` is 1, 2 or 4; the bus never forwards anything else.
    fn read(&mut self, port: u16, size: u8) -> u32;
    fn write(&mut self, port: u16, size: u8, value: u32);

    /// Machine reset.
    fn reset(&mut self) {}
}

struct RangeMapping {
    start: u16,
    len: u16,
    dev: Box<dyn PortIoDevice>,
}

impl RangeMapping {
    fn end(&self) -> u32 {
        u32::from(self.start) + u32::from(self.len)
    }

    fn decodes(&self, port: u16) -> bool {
        port >= self.start && u32::from(port) < self.end()
    }
}

fn open_bus(size: u8) -> u32 {
    match size {
        1 => 0xFF,
        2 => 0xFFFF,
        _ => 0xFFFF_FFFF,
    }
}

#[derive(Default)]
pub struct IoPortBus {
    ports: HashMap<u16, Box<dyn PortIoDevice>>,
    /// Sorted by start port, never overlapping.
    ranges: Vec<RangeMapping>,
}

impl IoPortBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `device` on a single port, replacing any previous mapping of that port.
    pub fn register(&mut self, port: u16, device: Box<dyn PortIoDevice>) {
        self.ports.insert(port, device);
    }

    pub fn unregister(&mut self, port: u16) -> Option<Box<dyn PortIoDevice>> {
        self.ports.remove(&port)
    }

    /// Maps one device per port over `start..start + len`, built by `make(port)`.
    ///
    /// Typically used with per-port views over a device shared through `Rc<RefCell<_>>`.
    pub fn register_shared_range<F>(&mut self, start: u16, len: u16, mut make: F)
    where
        F: FnMut(u16) -> Box<dyn PortIoDevice>,
    {
        for offset in 0..len {
            let port = start.wrapping_add(offset);
            self.register(port, make(port));
        }
    }

    /// Maps a single device over `start..start + len`.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty, runs past port 0xFFFF, or overlaps another range mapping.
    pub fn register_range(&mut self, start: u16, len: u16, dev: Box<dyn PortIoDevice>) {
        assert!(len != 0, "empty I/O port range at {start:#x}");
        let end = u32::from(start) + u32::from(len);
        assert!(end <= 0x1_0000, "I/O port range {start:#x}+{len:#x} wraps");

        let idx = self.ranges.partition_point(|r| r.start < start);
        let clashes_prev = idx > 0 && self.ranges[idx - 1].end() > u32::from(start);
        let clashes_next = self
            .ranges
            .get(idx)
            .is_some_and(|next| u32::from(next.start) < end);
        assert!(
            !clashes_prev && !clashes_next,
            "I/O port range {start:#x}..{end:#x} overlaps an existing mapping"
        );

        self.ranges.insert(idx, RangeMapping { start, len, dev });
    }

    fn device_for(&mut self, port: u16) -> Option<&mut Box<dyn PortIoDevice>> {
        if let Some(dev) = self.ports.get_mut(&port) {
            return Some(dev);
        }
        let idx = self.ranges.partition_point(|r| r.start <= port);
        let range = self.ranges.get_mut(idx.checked_sub(1)?)?;
        range.decodes(port).then_some(&mut range.dev)
    }

    pub fn read(&mut self, port: u16, size: u8) -> u32 {
        if size == 0 {
            return 0;
        }
        if !matches!(size, 1 | 2 | 4) {
            return 0xFFFF_FFFF;
        }
        match self.device_for(port) {
            Some(dev) => dev.read(port, size),
            None => {
                trace!(port, size, "io read from unmapped port");
                open_bus(size)
            }
        }
    }

    pub fn write(&mut self, port: u16, size: u8, value: u32) {
        if !matches!(size, 1 | 2 | 4) {
            return;
        }
        match self.device_for(port) {
            Some(dev) => dev.write(port, size, value),
            None => trace!(port, size, value, "io write to unmapped port"),
        }
    }

    pub fn read_u8(&mut self, port: u16) -> u8 {
        self.read(port, 1) as u8
    }

    pub fn write_u8(&mut self, port: u16, value: u8) {
        self.write(port, 1, u32::from(value));
    }

    pub fn reset(&mut self) {
        for dev in self.ports.values_mut() {
            dev.reset();
        }
        for range in &mut self.ranges {
            range.dev.reset();
        }
    }
}
