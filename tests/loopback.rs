//! 루프백 UDP 소켓으로 실제 전송 검증
//!
//! 요청 포트로 WRQ/RRQ를 받은 뒤 새 소켓(새 TID)에서 응답하는 최소 서버를 띄운다.

use std::net::SocketAddr;
use std::time::Duration;

use rand::RngCore;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use hedwig::codec::{decode_request, decode_response, encode_response};
use hedwig::{Client, Config, Error, ErrorCode, Operation, Response, TransferOption};

async fn bind() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

/// WRQ를 받아 모든 DATA를 모아 반환하는 서버
fn spawn_write_server(listener: UdpSocket, accept_options: bool) -> JoinHandle<(String, Vec<u8>)> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 70000];
        let (len, client) = listener.recv_from(&mut buf).await.unwrap();
        let request = decode_request(&buf[..len], client).unwrap();
        assert_eq!(request.operation, Operation::Write);

        let tid = bind().await;
        let mut block_size = 512;
        let first = if accept_options && !request.options.is_empty() {
            if let Some(blksize) = request.options.iter().find(|o| o.label() == "blksize") {
                block_size = blksize.value() as usize;
            }
            Response::option_ack(request.options.clone(), client)
        } else {
            Response::ack(0, client)
        };
        tid.send_to(&encode_response(&first), client).await.unwrap();

        let mut received = Vec::new();
        loop {
            let (len, from) = tid.recv_from(&mut buf).await.unwrap();
            let data = decode_response(&buf[..len], from).unwrap();
            assert_eq!(data.operation, Operation::Data);
            received.extend_from_slice(&data.payload);
            tid.send_to(&encode_response(&Response::ack(data.block, from)), from)
                .await
                .unwrap();
            if data.payload.len() < block_size {
                break;
            }
        }

        (request.filename, received)
    })
}

/// RRQ를 받아 `content`를 보내는 서버
fn spawn_read_server(listener: UdpSocket, content: Vec<u8>) -> JoinHandle<Vec<u16>> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 70000];
        let (len, client) = listener.recv_from(&mut buf).await.unwrap();
        let request = decode_request(&buf[..len], client).unwrap();
        assert_eq!(request.operation, Operation::Read);

        let tid = bind().await;
        let mut block_size = 512;
        let mut acks = Vec::new();

        if let Some(blksize) = request.options.iter().find(|o| o.label() == "blksize") {
            block_size = blksize.value() as usize;
            let oack = Response::option_ack(
                [blksize.clone(), TransferOption::tsize(content.len() as u64)],
                client,
            );
            tid.send_to(&encode_response(&oack), client).await.unwrap();
            let (len, from) = tid.recv_from(&mut buf).await.unwrap();
            acks.push(decode_response(&buf[..len], from).unwrap().block);
        }

        let mut block: u16 = 0;
        for chunk in content.chunks(block_size).chain(
            // 배수 길이면 빈 블록으로 끝을 알림
            (content.len() % block_size == 0).then_some(&content[..0]),
        ) {
            block = block.wrapping_add(1);
            let data = Response::data(block, chunk.to_vec(), client);
            tid.send_to(&encode_response(&data), client).await.unwrap();
            let (len, from) = tid.recv_from(&mut buf).await.unwrap();
            acks.push(decode_response(&buf[..len], from).unwrap().block);
        }

        acks
    })
}

fn random_content(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

#[tokio::test]
async fn test_upload_file_over_loopback() {
    let listener = bind().await;
    let server_addr = listener.local_addr().unwrap();
    let server = spawn_write_server(listener, true);

    let content = random_content(10_000);
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut tmp, &content).unwrap();
    let mut source = File::open(tmp.path()).await.unwrap();

    let socket = bind().await;
    let client = Client::new(&socket, Config::lan());
    let stats = client
        .upload(
            server_addr,
            &mut source,
            "upload.bin",
            "octet",
            &[TransferOption::blksize(1024), TransferOption::tsize(10_000)],
        )
        .await
        .unwrap();

    let (filename, received) = server.await.unwrap();
    assert_eq!(filename, "upload.bin");
    assert_eq!(received, content);
    assert_eq!(stats.block_size, 1024);
    assert_eq!(stats.total_blocks, 10);
    assert_ne!(stats.peer, Some(server_addr));
}

#[tokio::test]
async fn test_upload_exact_multiple_over_loopback() {
    let listener = bind().await;
    let server_addr = listener.local_addr().unwrap();
    let server = spawn_write_server(listener, false);

    let content = random_content(2048);
    let mut source = &content[..];

    let socket = bind().await;
    let client = Client::new(&socket, Config::lan());
    let stats = client
        .upload(server_addr, &mut source, "exact.bin", "octet", &[])
        .await
        .unwrap();

    let (_, received) = server.await.unwrap();
    assert_eq!(received, content);
    assert_eq!(stats.total_blocks, 5);
}

#[tokio::test]
async fn test_download_file_over_loopback() {
    let listener = bind().await;
    let server_addr = listener.local_addr().unwrap();
    let content = random_content(5_000);
    let server = spawn_read_server(listener, content.clone());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("download.bin");
    let mut sink = File::create(&path).await.unwrap();

    let socket = bind().await;
    let client = Client::new(&socket, Config::lan());
    let stats = client
        .download(
            server_addr,
            &mut sink,
            "download.bin",
            "octet",
            &[TransferOption::blksize(1000)],
        )
        .await
        .unwrap();
    sink.shutdown().await.unwrap();

    let acks = server.await.unwrap();
    assert_eq!(acks, vec![0, 1, 2, 3, 4, 5, 6]);
    assert_eq!(stats.transfer_size(), Some(5_000));

    let mut written = Vec::new();
    File::open(&path)
        .await
        .unwrap()
        .read_to_end(&mut written)
        .await
        .unwrap();
    assert_eq!(written, content);
}

#[tokio::test]
async fn test_download_error_over_loopback() {
    let listener = bind().await;
    let server_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        let (_, client) = listener.recv_from(&mut buf).await.unwrap();
        let err = Response::error(ErrorCode::FileNotFound, Some("no such file"), client);
        listener.send_to(&encode_response(&err), client).await.unwrap();
    });

    let socket = bind().await;
    let client = Client::new(&socket, Config::lan());
    let mut sink = Vec::new();
    let err = client
        .download(server_addr, &mut sink, "missing", "octet", &[])
        .await
        .unwrap_err();

    match err {
        Error::Protocol { code, message } => {
            assert_eq!(code, ErrorCode::FileNotFound);
            assert_eq!(message.as_deref(), Some("no such file"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_silent_server_times_out() {
    // 요청을 받기만 하고 응답하지 않음
    let listener = bind().await;
    let server_addr: SocketAddr = listener.local_addr().unwrap();

    let socket = bind().await;
    let config = Config::new().with_recv_timeout(Some(Duration::from_millis(100)));
    let client = Client::new(&socket, config);
    let mut source: &[u8] = b"hello";

    let err = client
        .upload(server_addr, &mut source, "f", "octet", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { peer } if peer == server_addr));
    assert!(err.is_transport());
    drop(listener);
}

#[tokio::test]
async fn test_sink_is_flushed() {
    let listener = bind().await;
    let server_addr = listener.local_addr().unwrap();
    let server = spawn_read_server(listener, b"tiny".to_vec());

    let socket = bind().await;
    let client = Client::new(&socket, Config::lan());
    let mut sink = tokio::io::BufWriter::new(Vec::new());
    client
        .download(server_addr, &mut sink, "tiny", "octet", &[])
        .await
        .unwrap();

    assert_eq!(server.await.unwrap(), vec![1]);
    assert_eq!(sink.get_ref(), b"tiny");
    sink.flush().await.unwrap();
}
