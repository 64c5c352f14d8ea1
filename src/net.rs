//! 멀티캐스트 소켓 구성
//!
//! socket2로 옵션을 설정한 뒤 tokio 소켓으로 변환한다.
//! 변환은 tokio 런타임 안에서 호출해야 한다.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::{Error, Result};

/// 수신 소켓 버퍼 크기 (라운드 사이 버스트 흡수용)
const RECV_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// 멀티캐스트 그룹 주소 해석
///
/// IPv4 멀티캐스트(224.0.0.0/4) 주소만 허용한다.
pub async fn resolve_group(addr: &str) -> Result<SocketAddrV4> {
    let resolved = tokio::net::lookup_host(addr)
        .await
        .map_err(|_| Error::AddressResolution {
            addr: addr.to_string(),
        })?
        .find_map(|a| match a {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| Error::AddressResolution {
            addr: addr.to_string(),
        })?;

    if !resolved.ip().is_multicast() {
        return Err(Error::NotMulticast {
            addr: addr.to_string(),
        });
    }

    Ok(resolved)
}

/// 송신용 소켓 생성 (임의 포트, 멀티캐스트 TTL/루프백 설정)
pub fn sender_socket(ttl: u32, multicast_loop: bool) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_multicast_ttl_v4(ttl)?;
    socket.set_multicast_loop_v4(multicast_loop)?;
    socket.set_nonblocking(true)?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    socket.bind(&bind_addr.into())?;

    debug!(ttl, multicast_loop, "송신 소켓 생성");
    Ok(UdpSocket::from_std(socket.into())?)
}

/// 그룹에 가입한 수신용 소켓 생성
///
/// 같은 호스트에서 여러 수신자가 동시에 듣도록 SO_REUSEADDR를 설정한다.
pub fn receiver_socket(group: SocketAddrV4, interface: Ipv4Addr) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_reuse_address(true)?;
    if let Err(e) = socket.set_recv_buffer_size(RECV_BUFFER_SIZE) {
        warn!("수신 버퍼 설정 실패: {}", e);
    }
    socket.set_nonblocking(true)?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, group.port());
    socket.bind(&bind_addr.into())?;
    socket.join_multicast_v4(group.ip(), &interface)?;

    debug!(group = %group, interface = %interface, "멀티캐스트 그룹 가입");
    Ok(UdpSocket::from_std(socket.into())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_group() {
        let group = resolve_group(crate::DEFAULT_GROUP).await.unwrap();
        assert_eq!(group.ip(), &Ipv4Addr::new(224, 3, 29, 71));
        assert_eq!(group.port(), 10000);
    }

    #[tokio::test]
    async fn test_resolve_rejects_unicast() {
        assert!(matches!(
            resolve_group("127.0.0.1:10000").await,
            Err(Error::NotMulticast { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_garbage() {
        let err = resolve_group("no-port-here").await.unwrap_err();
        assert!(matches!(err, Error::AddressResolution { .. }));
        assert_eq!(err.class(), crate::ErrorClass::Configuration);
    }

    #[tokio::test]
    async fn test_sender_socket_binds() {
        let socket = sender_socket(1, true).unwrap();
        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }
}
