use std::io;
use std::net::TcpListener;

/// Reserves `count` distinct loopback ports.
///
/// Every listener stays bound until all ports are known, so the kernel can not
/// hand out the same port twice within one call.
pub(crate) fn allocate_ports(count: usize) -> io::Result<Vec<u16>> {
    let listeners = (0..count)
        .map(|_| TcpListener::bind("127.0.0.1:0"))
        .collect::<io::Result<Vec<_>>>()?;

    listeners
        .iter()
        .map(|listener| listener.local_addr().map(|addr| addr.port()))
        .collect()
}
