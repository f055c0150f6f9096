// SPDX-License-Identifier: Apache-2.0

//! Privilege check: several probes (raw DMI reads, `dmidecode`,
//! `NtQuerySystemInformation` pool-tag scans) behave differently or aren't
//! available at all without elevated privileges, so the aggregator can log
//! a `debug` note explaining a probe's absence instead of leaving it silent.

/// True if the current process runs with elevated privileges (root on
/// Unix, an elevated token on Windows).
#[must_use]
pub fn is_admin() -> bool {
    imp::is_admin()
}

#[cfg(unix)]
mod imp {
    pub fn is_admin() -> bool {
        // SAFETY: `geteuid` takes no arguments and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }
}

#[cfg(windows)]
mod imp {
    use std::ptr;
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::{GetCurrentProcess, OpenProcessToken};
    use winapi::um::securitybaseapi::GetTokenInformation;
    use winapi::um::winnt::{TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};

    pub fn is_admin() -> bool {
        let mut token = ptr::null_mut();
        // SAFETY: `GetCurrentProcess` returns a pseudo-handle that never
        // needs closing; `token` is closed below if the call succeeds.
        let opened = unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) };
        if opened == 0 {
            return false;
        }
        let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
        let mut size = std::mem::size_of::<TOKEN_ELEVATION>() as u32;
        // SAFETY: `token` was just opened successfully; `elevation` and
        // `size` describe a buffer of the correct size for `TokenElevation`.
        let queried = unsafe {
            GetTokenInformation(
                token,
                TokenElevation,
                (&mut elevation as *mut TOKEN_ELEVATION).cast(),
                size,
                &mut size,
            )
        };
        // SAFETY: `token` is a valid handle owned by this function.
        unsafe { CloseHandle(token) };
        queried != 0 && elevation.TokenIsElevated != 0
    }
}

#[cfg(not(any(unix, windows)))]
mod imp {
    pub fn is_admin() -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_admin_does_not_panic() {
        let _ = is_admin();
    }
}
