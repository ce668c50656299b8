#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use self::windows::*;

// unix terminals honor VT escape sequences already
#[cfg(not(windows))]
pub fn init() {}
