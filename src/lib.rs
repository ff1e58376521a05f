pub mod api;
pub mod core;

pub use crate::core::pulse::{CMethodConfig, GMethodConfig, PulseConfig, PulseError, PulseMethod};
pub use crate::core::video::{Frame, FrameSequence, RawFrame};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("pulse_lib"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // host applications install their own `log` backend
    }
}
