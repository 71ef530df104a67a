//! 데이터그램 전송 계층 추상화
//!
//! 소켓의 생성/바인딩/수명은 호출자가 관리한다.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

/// 주소 정보가 붙은 데이터그램 송수신
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// `target`으로 데이터그램 하나 전송
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// 데이터그램 하나 수신, 발신지 주소 반환
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

impl Transport for UdpSocket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }
}
