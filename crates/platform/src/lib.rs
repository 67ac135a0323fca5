//! Platform glue between the PC chipset models and the CPU: port I/O dispatch and the
//! interrupt router.

#![forbid(unsafe_code)]

pub mod interrupts;
pub mod io;
