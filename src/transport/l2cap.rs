//! L2CAP `SOCK_SEQPACKET` sockets on top of `libc`.
//!
//! The standard library has no Bluetooth sockets, so the handful of calls the
//! HID transport needs are wrapped here. Descriptors are owned by
//! [`OwnedFd`] and closed on drop.

use crate::transport::{
    BdAddr, ChannelPair, Connector, HidChannel, PairingListener, TransportError, CONTROL_PSM,
    INTERRUPT_PSM,
};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tracing::{debug, info, warn};

const BTPROTO_L2CAP: libc::c_int = 0;

/// `struct sockaddr_l2` from `<bluetooth/l2cap.h>`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct SockaddrL2 {
    l2_family: libc::sa_family_t,
    l2_psm: u16,
    l2_bdaddr: [u8; 6],
    l2_cid: u16,
    l2_bdaddr_type: u8,
}

impl SockaddrL2 {
    fn new(address: BdAddr, psm: u16) -> Self {
        Self {
            l2_family: libc::AF_BLUETOOTH as libc::sa_family_t,
            l2_psm: psm.to_le(),
            l2_bdaddr: address.to_kernel_order(),
            l2_cid: 0,
            l2_bdaddr_type: 0,
        }
    }

    fn address(&self) -> BdAddr {
        BdAddr::from_kernel_order(self.l2_bdaddr)
    }
}

const SOCKADDR_L2_LEN: libc::socklen_t = mem::size_of::<SockaddrL2>() as libc::socklen_t;

fn check(result: libc::c_int) -> io::Result<libc::c_int> {
    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(result)
    }
}

#[derive(Debug)]
pub struct L2capSocket {
    fd: OwnedFd,
}

impl L2capSocket {
    pub fn open() -> io::Result<Self> {
        // SAFETY: socket(2) takes no pointers; the result is checked before use.
        let fd = check(unsafe {
            libc::socket(
                libc::AF_BLUETOOTH,
                libc::SOCK_SEQPACKET | libc::SOCK_CLOEXEC,
                BTPROTO_L2CAP,
            )
        })?;
        // SAFETY: `fd` was just returned by socket(2) and is owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(Self { fd })
    }

    pub fn bind(&self, address: BdAddr, psm: u16) -> io::Result<()> {
        let addr = SockaddrL2::new(address, psm);
        // SAFETY: `addr` is a valid sockaddr_l2 that outlives the call and the
        // length passed matches its size.
        check(unsafe {
            libc::bind(
                self.fd.as_raw_fd(),
                &addr as *const SockaddrL2 as *const libc::sockaddr,
                SOCKADDR_L2_LEN,
            )
        })
        .map(|_| ())
    }

    pub fn listen(&self, backlog: libc::c_int) -> io::Result<()> {
        // SAFETY: plain descriptor call, no pointers involved.
        check(unsafe { libc::listen(self.fd.as_raw_fd(), backlog) }).map(|_| ())
    }

    pub fn accept(&self) -> io::Result<(L2capSocket, BdAddr)> {
        let mut addr = SockaddrL2::default();
        let mut len = SOCKADDR_L2_LEN;
        // SAFETY: `addr` and `len` are valid for writes and `len` holds the
        // buffer size as accept(2) requires.
        let fd = check(unsafe {
            libc::accept4(
                self.fd.as_raw_fd(),
                &mut addr as *mut SockaddrL2 as *mut libc::sockaddr,
                &mut len,
                libc::SOCK_CLOEXEC,
            )
        })?;
        // SAFETY: `fd` is a fresh descriptor from accept4(2).
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok((Self { fd }, addr.address()))
    }

    pub fn connect(&self, address: BdAddr, psm: u16) -> io::Result<()> {
        let addr = SockaddrL2::new(address, psm);
        // SAFETY: `addr` is a valid sockaddr_l2 that outlives the call.
        check(unsafe {
            libc::connect(
                self.fd.as_raw_fd(),
                &addr as *const SockaddrL2 as *const libc::sockaddr,
                SOCKADDR_L2_LEN,
            )
        })
        .map(|_| ())
    }
}

impl HidChannel for L2capSocket {
    fn send(&mut self, data: &[u8]) -> io::Result<usize> {
        // SAFETY: `data` is valid for reads of `data.len()` bytes.
        let sent = unsafe {
            libc::send(
                self.fd.as_raw_fd(),
                data.as_ptr() as *const libc::c_void,
                data.len(),
                libc::MSG_NOSIGNAL,
            )
        };
        if sent < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(sent as usize)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
        let received = unsafe {
            libc::recv(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
            )
        };
        if received < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(received as usize)
    }

    fn set_nonblocking(&mut self) -> io::Result<()> {
        let fd = self.fd.as_raw_fd();
        // SAFETY: fcntl(2) on a descriptor we own, no pointers involved.
        let flags = check(unsafe { libc::fcntl(fd, libc::F_GETFL) })?;
        // SAFETY: as above.
        check(unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) }).map(|_| ())
    }

    fn peer_address(&self) -> io::Result<BdAddr> {
        let mut addr = SockaddrL2::default();
        let mut len = SOCKADDR_L2_LEN;
        // SAFETY: `addr` and `len` are valid for writes for the whole call.
        check(unsafe {
            libc::getpeername(
                self.fd.as_raw_fd(),
                &mut addr as *mut SockaddrL2 as *mut libc::sockaddr,
                &mut len,
            )
        })?;
        Ok(addr.address())
    }
}

/// Listening control and interrupt sockets.
#[derive(Debug)]
pub struct L2capListener {
    control: L2capSocket,
    interrupt: L2capSocket,
}

impl L2capListener {
    fn bind(local: BdAddr) -> Result<Self, TransportError> {
        let control = L2capSocket::open().map_err(TransportError::Socket)?;
        let interrupt = L2capSocket::open().map_err(TransportError::Socket)?;

        control
            .bind(local, CONTROL_PSM)
            .map_err(|source| TransportError::Bind {
                address: local,
                psm: CONTROL_PSM,
                source,
            })?;
        interrupt
            .bind(local, INTERRUPT_PSM)
            .map_err(|source| TransportError::Bind {
                address: local,
                psm: INTERRUPT_PSM,
                source,
            })?;

        Ok(Self { control, interrupt })
    }
}

impl PairingListener for L2capListener {
    fn accept(&mut self) -> Result<ChannelPair, TransportError> {
        info!("Waiting for a console to connect");
        let (control, control_peer) =
            self.control
                .accept()
                .map_err(|source| TransportError::Accept {
                    psm: CONTROL_PSM,
                    source,
                })?;
        debug!("Control channel accepted from {}", control_peer);

        let (interrupt, interrupt_peer) =
            self.interrupt
                .accept()
                .map_err(|source| TransportError::Accept {
                    psm: INTERRUPT_PSM,
                    source,
                })?;
        info!("Interrupt channel accepted from {}", interrupt_peer);

        Ok(ChannelPair {
            control: Box::new(control),
            interrupt: Box::new(interrupt),
        })
    }
}

/// Opens real L2CAP sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct L2capConnector;

impl Connector for L2capConnector {
    fn listen(&mut self, local: BdAddr) -> Result<Box<dyn PairingListener>, TransportError> {
        let listener = match L2capListener::bind(local) {
            Ok(listener) => listener,
            Err(err) => {
                warn!("{}, binding to any local address instead", err);
                L2capListener::bind(BdAddr::ANY)?
            }
        };

        for (socket, psm) in [
            (&listener.control, CONTROL_PSM),
            (&listener.interrupt, INTERRUPT_PSM),
        ] {
            socket
                .listen(1)
                .map_err(|source| TransportError::Listen { psm, source })?;
        }
        debug!("Listening on PSM {} and {}", CONTROL_PSM, INTERRUPT_PSM);

        Ok(Box::new(listener))
    }

    fn connect(&mut self, remote: BdAddr) -> Result<ChannelPair, TransportError> {
        let control = L2capSocket::open().map_err(TransportError::Socket)?;
        let interrupt = L2capSocket::open().map_err(TransportError::Socket)?;

        for (socket, psm) in [(&control, CONTROL_PSM), (&interrupt, INTERRUPT_PSM)] {
            socket
                .connect(remote, psm)
                .map_err(|source| TransportError::Connect {
                    address: remote,
                    psm,
                    source,
                })?;
        }
        info!("Connected to console {}", remote);

        Ok(ChannelPair {
            control: Box::new(control),
            interrupt: Box::new(interrupt),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sockaddr_uses_kernel_byte_order() {
        let addr = SockaddrL2::new(BdAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]), 19);
        assert_eq!(addr.l2_family, libc::AF_BLUETOOTH as libc::sa_family_t);
        assert_eq!(u16::from_le(addr.l2_psm), 19);
        assert_eq!(addr.l2_bdaddr, [0xFF, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(addr.address().to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn sockaddr_matches_the_kernel_layout() {
        assert_eq!(mem::size_of::<SockaddrL2>(), 14);
    }
}
