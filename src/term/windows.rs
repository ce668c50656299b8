use windows::Win32::System::Console::*;

/// Make sure VT escape sequences will be honored by the console so colored
/// INFO/WARNING tags render on both stdout and stderr.
pub fn init() {
    for std_handle in [STD_OUTPUT_HANDLE, STD_ERROR_HANDLE] {
        unsafe {
            let mut cm: CONSOLE_MODE = CONSOLE_MODE::default();
            if let Ok(h) = GetStdHandle(std_handle) {
                GetConsoleMode(h, &mut cm as *mut CONSOLE_MODE);
                if (cm.0 & 0x4) == 0 {
                    cm.0 |= 0x4;
                    SetConsoleMode(h, cm);
                }
            }
        }
    }
}
