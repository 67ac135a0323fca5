//! Legacy interrupt controllers of the PC platform.
//!
//! The crate models the 8259A master/slave pair as a plain state machine: no port bus, no CPU
//! and no device objects. Platform glue lives in `pcbox-platform` and `pcbox-devices`.

#![forbid(unsafe_code)]

pub mod config;
pub mod pic8259;
pub mod sideband;

pub use config::{PicConfig, PicConfigError, PicTopology, SlaveReadSelect, TriggerSelect};
pub use pic8259::DualPic8259;
pub use sideband::{KeyWaitSignal, PicCallbacks, TimerGate};
