pub(crate) mod status;
pub(crate) mod switch;
pub(crate) mod watch;
