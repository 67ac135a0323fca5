mod latch;
mod pic;
mod router;

pub use latch::{KeyWaitLatch, TimerGateLatch};
pub use pic::LegacyPic;
pub use router::{
    InterruptController, InterruptInput, PlatformInterrupts, SharedPlatformInterrupts,
};
