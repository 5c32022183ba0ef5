pub mod cross;
pub mod signal;

pub use cross::{confirm_verify, cross_verify, hard_verify, HardVerifyOutcome};
pub use signal::{send_signal, DeliveryOptions, SignalOutcome};
