pub mod preferences;
pub mod puzzle;
pub mod session;
pub mod util;
