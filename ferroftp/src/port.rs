//! # Port
//!
//! Allocation of local ports for active mode listeners

use std::net::{IpAddr, TcpListener};
use std::sync::Mutex;

use crate::{FtpError, FtpResult};

/// Lowest port handed out once the scan wraps around
const WRAP_PORT: u16 = 1024;

/// A port handed out by [`PortAllocator`], split the way PORT wants it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedPort {
    pub port: u16,
    pub n1: u8,
    pub n2: u8,
}

impl From<u16> for AllocatedPort {
    fn from(port: u16) -> Self {
        Self {
            port,
            n1: (port / 256) as u8,
            n2: (port % 256) as u8,
        }
    }
}

/// Hands out local ports scanning forward from the last one used.
///
/// Allocation is serialized by a mutex, so concurrent active mode transfers never get
/// the same port twice in a row.
#[derive(Debug)]
pub struct PortAllocator {
    last_used: Mutex<u16>,
}

impl PortAllocator {
    /// Create an allocator whose first candidate is `last_used + 1`
    pub fn new(last_used: u16) -> Self {
        Self {
            last_used: Mutex::new(last_used),
        }
    }

    /// Last port handed out
    pub fn last_used(&self) -> u16 {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Find the next port that can be bound on `ip`.
    ///
    /// Each candidate is probed by binding a throwaway listener which is released right away.
    /// The scan wraps from 65535 to 1024 and gives up after one full cycle.
    pub fn next_port(&self, ip: IpAddr) -> FtpResult<AllocatedPort> {
        let mut last_used = self.last_used.lock().unwrap_or_else(|e| e.into_inner());
        let mut candidate = *last_used;
        for _ in WRAP_PORT..=u16::MAX {
            candidate = match candidate {
                u16::MAX => WRAP_PORT,
                port => port + 1,
            };
            if Self::is_available(ip, candidate) {
                trace!("port {candidate} is available on {ip}");
                *last_used = candidate;
                return Ok(AllocatedPort::from(candidate));
            }
        }
        error!("no port available on {ip}");
        Err(FtpError::NoAvailablePort)
    }

    fn is_available(ip: IpAddr, port: u16) -> bool {
        TcpListener::bind((ip, port)).is_ok()
    }
}
