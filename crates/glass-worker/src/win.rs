//! Win32 implementation of [`Desktop`].

use std::{
    ffi::c_void,
    mem::size_of_val,
    ptr::{addr_of_mut, from_mut},
};

use glass_protocol::{ChannelAddress, CommandRecord, WindowHandle};
use tracing::{debug, trace};
use windows::{
    Win32::{
        Foundation::{COLORREF, HWND, LPARAM, WPARAM},
        System::{
            DataExchange::COPYDATASTRUCT,
            Registry::{HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ, RegGetValueW},
        },
        UI::WindowsAndMessaging::{
            GetLayeredWindowAttributes, IsWindow, LWA_ALPHA, SendMessageW,
            SetLayeredWindowAttributes, WM_COPYDATA,
        },
    },
    core::w,
};

use crate::{Error, Result, desktop::Desktop};

/// Convert a portable handle into an `HWND`.
fn hwnd(handle: u64) -> HWND {
    HWND(handle as usize as *mut c_void)
}

/// Desktop backed by user32 and the registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsDesktop;

impl Desktop for WindowsDesktop {
    fn os_build(&self) -> Option<u32> {
        let mut buf = [0u16; 32];
        let mut size = size_of_val(&buf) as u32;
        let status = unsafe {
            RegGetValueW(
                HKEY_LOCAL_MACHINE,
                w!("SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion"),
                w!("CurrentBuildNumber"),
                RRF_RT_REG_SZ,
                None,
                Some(buf.as_mut_ptr().cast()),
                Some(&mut size),
            )
        };
        if status.is_err() {
            debug!(?status, "CurrentBuildNumber lookup failed");
            return None;
        }
        let len = buf.iter().position(|c| *c == 0).unwrap_or(buf.len());
        String::from_utf16_lossy(&buf[..len]).trim().parse().ok()
    }

    fn window_exists(&self, window: WindowHandle) -> bool {
        unsafe { IsWindow(Some(hwnd(window.0))).as_bool() }
    }

    fn deliver(&self, to: ChannelAddress, from: WindowHandle, record: CommandRecord) -> bool {
        let mut record = record;
        let mut data = COPYDATASTRUCT {
            dwData: 0,
            cbData: CommandRecord::SIZE as u32,
            lpData: addr_of_mut!(record).cast(),
        };
        // The worker answers zero once it has consumed the record.
        let result = unsafe {
            SendMessageW(
                hwnd(to.0),
                WM_COPYDATA,
                Some(WPARAM(from.0 as usize)),
                Some(LPARAM(from_mut(&mut data) as isize)),
            )
        };
        trace!(to = %to, id = record.command_id, value = record.command_value, result = result.0, "copydata");
        result.0 == 0
    }

    fn window_alpha(&self, window: WindowHandle) -> Option<u8> {
        let mut alpha = 0u8;
        unsafe {
            GetLayeredWindowAttributes(hwnd(window.0), None, Some(&mut alpha), None).ok()?;
        }
        Some(alpha)
    }

    fn set_window_alpha(&self, window: WindowHandle, alpha: u8) -> Result<()> {
        unsafe { SetLayeredWindowAttributes(hwnd(window.0), COLORREF(0), alpha, LWA_ALPHA) }
            .map_err(|e| Error::Platform(e.to_string()))
    }
}
