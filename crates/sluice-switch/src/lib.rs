#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Toggle entities that mirror Deluge daemon state.
//!
//! Layout: `entity.rs` (`ToggleEntity` contract and shared status),
//! `pause.rs` (`TorrentPauseSwitch`), `alt_speed.rs` (`AltSpeedSwitch`),
//! `platform.rs` (`setup_platform`), `methods.rs` (remote method names),
//! `error.rs` (`SwitchError`, `PlatformError`).

pub mod alt_speed;
pub mod entity;
pub mod error;
pub mod methods;
pub mod pause;
pub mod platform;

pub use alt_speed::{AltSpeedSwitch, AltSpeedThresholds};
pub use entity::{EntitySnapshot, SwitchState, ToggleEntity};
pub use error::{PlatformError, SwitchError, SwitchResult};
pub use pause::TorrentPauseSwitch;
pub use platform::setup_platform;
