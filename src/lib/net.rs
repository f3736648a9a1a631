//! Resolution of the address advertised to the instance directory.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Public address used only to pick a route; no packet is sent.
const ROUTE_PROBE: &str = "8.8.8.8:80";

/// Configured IP if any, else the first non-loopback outbound address, else loopback.
pub async fn resolve_advertised_ip(configured: Option<IpAddr>) -> IpAddr {
    if let Some(ip) = configured {
        return ip;
    }
    match outbound_ip().await {
        Some(ip) => {
            debug!(target: "nacos_mcp::runtime", ip = %ip, "Resolved outbound address");
            ip
        }
        None => {
            warn!(
                target: "nacos_mcp::runtime",
                "No non-loopback address found; advertising 127.0.0.1"
            );
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

async fn outbound_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
        .await
        .ok()?;
    socket.connect(ROUTE_PROBE).await.ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_loopback() && !ip.is_unspecified()).then_some(ip)
}
