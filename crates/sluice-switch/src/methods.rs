//! Remote method names and config keys used by the switches.

/// Lists the ids of every torrent in the session.
pub const GET_SESSION_STATE: &str = "core.get_session_state";
/// Resumes the given torrent ids.
pub const RESUME_TORRENT: &str = "core.resume_torrent";
/// Pauses the given torrent ids.
pub const PAUSE_TORRENT: &str = "core.pause_torrent";
/// Returns requested status fields keyed by torrent id.
pub const GET_TORRENTS_STATUS: &str = "core.get_torrents_status";
/// Writes daemon config values.
pub const SET_CONFIG: &str = "core.set_config";
/// Reads a single daemon config value.
pub const GET_CONFIG_VALUE: &str = "core.get_config_value";

/// Status field requested by the pause switch.
pub const PAUSED_FIELD: &str = "paused";
/// Daemon-wide upload cap in KiB/s.
pub const MAX_UPLOAD_SPEED: &str = "max_upload_speed";
/// Daemon-wide download cap in KiB/s.
pub const MAX_DOWNLOAD_SPEED: &str = "max_download_speed";
