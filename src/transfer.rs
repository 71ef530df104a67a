//! 전송 엔진 (클라이언트측)
//!
//! - 업로드: WRQ → (OACK|ACK 0) → DATA n / ACK n 반복 → 짧은 블록의 ACK에서 종료
//! - 다운로드: RRQ → (OACK → ACK 0)? → DATA n / ACK n 반복 → 짧은 블록에서 종료
//! - 재전송 없음: 수신 타임아웃이나 소켓 에러는 곧바로 전송 실패

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::codec;
use crate::message::{Message, Operation, Request, Response};
use crate::option::TransferOption;
use crate::stats::TransferStats;
use crate::transport::Transport;
use crate::{Config, Error, Result, DEFAULT_BLOCK_SIZE};

/// 전송 세션 한 번의 상태
///
/// 블록 카운터, 협상 결과, 응답 주소는 세션이 단독으로 소유한다.
struct Session<'a, T: Transport> {
    transport: &'a T,
    config: &'a Config,

    /// 요청을 보낸 주소
    endpoint: SocketAddr,

    /// 실제 응답한 주소 (첫 응답에서 확정)
    peer: Option<SocketAddr>,

    /// 마지막으로 확인된 블록 번호 (u16 wrap)
    block: u16,

    /// 협상된 블록 크기
    block_size: usize,

    recv_buf: Vec<u8>,
    stats: TransferStats,
}

impl<'a, T: Transport> Session<'a, T> {
    fn new(transport: &'a T, config: &'a Config, endpoint: SocketAddr) -> Self {
        Self {
            transport,
            config,
            endpoint,
            peer: None,
            block: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            recv_buf: vec![0u8; config.buffer_size_for(DEFAULT_BLOCK_SIZE)],
            stats: TransferStats::new(DEFAULT_BLOCK_SIZE),
        }
    }

    /// 응답 주소 (확정 전이면 요청 주소)
    fn peer(&self) -> SocketAddr {
        self.peer.unwrap_or(self.endpoint)
    }

    async fn send(&self, message: Message) -> Result<()> {
        let bytes = codec::encode(&message);
        self.transport.send_to(&bytes, message.peer()).await?;
        Ok(())
    }

    /// 응답 하나 수신
    ///
    /// 응답 주소가 확정된 뒤에는 다른 주소에서 온 데이터그램을 버린다.
    async fn recv(&mut self) -> Result<Response> {
        loop {
            let waiting_on = self.peer();
            let received = match self.config.recv_timeout {
                Some(limit) => {
                    tokio::time::timeout(limit, self.transport.recv_from(&mut self.recv_buf))
                        .await
                        .map_err(|_| Error::Timeout { peer: waiting_on })?
                }
                None => self.transport.recv_from(&mut self.recv_buf).await,
            };
            let (len, from) = received?;

            if matches!(self.peer, Some(peer) if peer != from) {
                warn!("다른 주소의 데이터그램 무시: {} (expected {})", from, waiting_on);
                self.stats.foreign_datagrams += 1;
                continue;
            }

            return codec::decode_response(&self.recv_buf[..len], from);
        }
    }

    /// 첫 응답의 발신지를 세션 상대로 확정
    fn accept_peer(&mut self, resp: &Response) {
        if resp.peer != self.endpoint {
            debug!("응답 주소 변경: {} -> {}", self.endpoint, resp.peer);
        }
        self.peer = Some(resp.peer);
        self.stats.peer = Some(resp.peer);
    }

    /// OACK 협상 결과 반영
    fn negotiate(&mut self, resp: &Response) -> Result<()> {
        if let Some(blksize) = resp.block_size() {
            blksize.validate()?;
            self.block_size = blksize.value() as usize;
        }

        for opt in resp.options.values() {
            info!("협상 옵션: {}", opt);
        }

        self.stats.negotiated = resp.options.clone();
        self.stats.block_size = self.block_size;

        let wanted = self.config.buffer_size_for(self.block_size);
        if self.recv_buf.len() < wanted {
            self.recv_buf.resize(wanted, 0);
        }
        Ok(())
    }

    fn finish(mut self) -> TransferStats {
        self.stats.finish();
        self.stats
    }
}

/// 업로드 루프에서 응답이 현재 카운터를 확인하는지 판정
///
/// OACK는 첫 응답일 때만 블록 0의 확인으로 취급한다.
fn acknowledges(resp: &Response, block: u16, initial: bool) -> bool {
    match resp.operation {
        Operation::Ack => resp.block == block,
        Operation::OptionAck => initial && resp.block == block,
        _ => false,
    }
}

/// 버퍼가 찰 때까지 또는 EOF까지 읽기
async fn read_chunk<R>(source: &mut R, chunk: &mut [u8]) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < chunk.len() {
        let n = source.read(&mut chunk[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// TFTP 클라이언트
///
/// 호출자가 소유한 전송 계층을 빌려 쓴다. 호출 하나가 세션 하나를 끝까지 진행한다.
pub struct Client<'a, T: Transport> {
    transport: &'a T,
    config: Config,
}

impl<'a, T: Transport> Client<'a, T> {
    pub fn new(transport: &'a T, config: Config) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn check_options(&self, options: &[TransferOption]) -> Result<()> {
        if self.config.validate_options {
            for opt in options {
                opt.validate()?;
            }
        }
        Ok(())
    }

    /// 파일 업로드 (WRQ)
    ///
    /// `source`를 EOF까지 읽어 원격 `filename`으로 보낸다.
    /// 파일 길이가 블록 크기의 배수면 마지막에 빈 DATA 블록을 하나 더 보낸다.
    pub async fn upload<R>(
        &self,
        endpoint: SocketAddr,
        source: &mut R,
        filename: &str,
        mode: &str,
        options: &[TransferOption],
    ) -> Result<TransferStats>
    where
        R: AsyncRead + Unpin,
    {
        self.check_options(options)?;

        let mut session = Session::new(self.transport, &self.config, endpoint);
        info!("업로드 시작: {} -> {} (mode={})", filename, endpoint, mode);

        session
            .send(Request::write(filename, mode, endpoint, options.to_vec()).into())
            .await?;

        let mut resp = session.recv().await?;
        session.accept_peer(&resp);
        if resp.operation == Operation::OptionAck {
            session.negotiate(&resp)?;
        }

        let mut chunk = vec![0u8; session.block_size];
        let mut initial = true;
        let mut finishing = false;

        loop {
            if acknowledges(&resp, session.block, initial) {
                if finishing {
                    break;
                }

                session.block = session.block.wrapping_add(1);
                let n = read_chunk(source, &mut chunk).await?;
                finishing = n < chunk.len();

                let payload = Bytes::copy_from_slice(&chunk[..n]);
                let data = Response::data(session.block, payload, session.peer());
                session.send(data.into()).await?;
                session.stats.record_block(n);

                debug!("DATA 전송: block={}, {} bytes", session.block, n);
            } else {
                debug!(
                    "응답 건너뜀: {} block={} (current={})",
                    resp.operation, resp.block, session.block
                );
                session.stats.skipped_responses += 1;
            }

            initial = false;
            resp = session.recv().await?;
        }

        let stats = session.finish();
        info!("업로드 완료: {}", stats.summary());
        Ok(stats)
    }

    /// 파일 다운로드 (RRQ)
    ///
    /// 받은 DATA를 순서대로 `sink`에 쓰고 블록마다 ACK를 보낸다.
    /// 블록 크기보다 짧은 DATA를 받으면 ACK 후 종료한다.
    pub async fn download<W>(
        &self,
        endpoint: SocketAddr,
        sink: &mut W,
        filename: &str,
        mode: &str,
        options: &[TransferOption],
    ) -> Result<TransferStats>
    where
        W: AsyncWrite + Unpin,
    {
        self.check_options(options)?;

        let mut session = Session::new(self.transport, &self.config, endpoint);
        info!("다운로드 시작: {} <- {} (mode={})", filename, endpoint, mode);

        session
            .send(Request::read(filename, mode, endpoint, options.to_vec()).into())
            .await?;

        let mut initial = true;

        loop {
            let resp = session.recv().await?;
            if initial {
                session.accept_peer(&resp);
            }

            let expected = session.block.wrapping_add(1);

            match resp.operation {
                Operation::OptionAck if initial => {
                    session.negotiate(&resp)?;
                    session.send(Response::ack(0, session.peer()).into()).await?;
                }

                Operation::Data if resp.block == expected => {
                    sink.write_all(&resp.payload).await?;
                    session.stats.record_block(resp.payload.len());
                    session.block = expected;
                    session.send(Response::ack(expected, session.peer()).into()).await?;

                    debug!("DATA 수신: block={}, {} bytes", expected, resp.payload.len());

                    if resp.payload.len() < session.block_size {
                        break;
                    }
                }

                _ => {
                    debug!(
                        "응답 건너뜀: {} block={} (expected={})",
                        resp.operation, resp.block, expected
                    );
                    session.stats.skipped_responses += 1;
                }
            }

            initial = false;
        }

        sink.flush().await?;

        let stats = session.finish();
        info!("다운로드 완료: {}", stats.summary());
        Ok(stats)
    }
}
