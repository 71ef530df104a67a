//! Hedwig 클라이언트 - TFTP put/get
//!
//! 사용법:
//!   cargo run --release --bin hedwig-client -- <put|get> <HOST[:PORT]> <LOCAL> <REMOTE> [OPTIONS]
//!
//! 예시:
//!   # 업로드 (블록 크기 1428 협상)
//!   cargo run --release --bin hedwig-client -- put 192.168.1.10 ./boot.img boot.img --blksize 1428
//!
//!   # 다운로드
//!   cargo run --release --bin hedwig-client -- get 127.0.0.1:6969 ./out.bin file.bin

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::net::UdpSocket;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hedwig::{Client, Config, TransferOption, DEFAULT_MODE, DEFAULT_PORT};

const USAGE: &str = r#"Hedwig Client - TFTP 클라이언트

사용법:
  hedwig-client <put|get> <HOST[:PORT]> <LOCAL> <REMOTE> [OPTIONS]

명령:
  put                      LOCAL 파일을 원격 REMOTE로 업로드
  get                      원격 REMOTE 파일을 LOCAL로 다운로드

옵션:
  -m, --mode <MODE>        전송 모드 (기본: octet)
  --blksize <BYTES>        blksize 옵션 제안 (8 ~ 65464)
  --timeout <SECS>         timeout 옵션 제안 (1 ~ 255)
  --tsize                  tsize 옵션 제안 (put: 파일 크기, get: 0)
  --recv-timeout-ms <MS>   수신 타임아웃 (0이면 무한 대기, 기본: 5000)
  -b, --bind <ADDR>        로컬 바인드 주소 (기본: 0.0.0.0:0)
  -h, --help               이 도움말 출력

환경 변수:
  RUST_LOG                 로그 레벨 (기본: info)
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Put,
    Get,
}

/// 클라이언트 실행 인자
struct ClientArgs {
    command: Command,
    server: String,
    local: PathBuf,
    remote: String,
    mode: String,
    blksize: Option<u64>,
    timeout: Option<u64>,
    tsize: bool,
    bind_addr: SocketAddr,
    config: Config,
}

fn usage_exit(message: &str) -> ! {
    eprintln!("{}\n\n{}", message, USAGE);
    std::process::exit(2);
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> T {
    match value.map(|v| v.parse::<T>()) {
        Some(Ok(n)) => n,
        _ => usage_exit(&format!("{} 에는 숫자가 필요합니다", flag)),
    }
}

fn parse_args() -> ClientArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        std::process::exit(0);
    }

    let mut positional = Vec::new();
    let mut mode = DEFAULT_MODE.to_string();
    let mut blksize = None;
    let mut timeout = None;
    let mut tsize = false;
    let mut bind_addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], 0));
    let mut config = Config::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--mode" | "-m" => {
                mode = args
                    .get(i + 1)
                    .cloned()
                    .unwrap_or_else(|| usage_exit("--mode 에는 값이 필요합니다"));
                i += 1;
            }
            "--blksize" => {
                blksize = Some(parse_number("--blksize", args.get(i + 1)));
                i += 1;
            }
            "--timeout" => {
                timeout = Some(parse_number("--timeout", args.get(i + 1)));
                i += 1;
            }
            "--tsize" => {
                tsize = true;
            }
            "--recv-timeout-ms" => {
                let ms: u64 = parse_number("--recv-timeout-ms", args.get(i + 1));
                config.recv_timeout = (ms > 0).then(|| Duration::from_millis(ms));
                i += 1;
            }
            "--bind" | "-b" => {
                bind_addr = args
                    .get(i + 1)
                    .and_then(|a| a.parse().ok())
                    .unwrap_or_else(|| usage_exit("유효한 바인드 주소가 필요합니다"));
                i += 1;
            }
            other if other.starts_with('-') => usage_exit(&format!("알 수 없는 옵션: {}", other)),
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    if positional.len() != 4 {
        usage_exit("인자가 부족합니다");
    }

    let command = match positional[0].as_str() {
        "put" => Command::Put,
        "get" => Command::Get,
        other => usage_exit(&format!("알 수 없는 명령: {}", other)),
    };

    ClientArgs {
        command,
        server: positional[1].clone(),
        local: PathBuf::from(&positional[2]),
        remote: positional[3].clone(),
        mode,
        blksize,
        timeout,
        tsize,
        bind_addr,
        config,
    }
}

/// `host[:port]` 해석 (포트 생략 시 69)
async fn resolve(server: &str) -> std::io::Result<SocketAddr> {
    let target = if server.rsplit_once(':').is_some_and(|(_, port)| port.parse::<u16>().is_ok()) {
        server.to_string()
    } else {
        format!("{}:{}", server, DEFAULT_PORT)
    };

    let addr = tokio::net::lookup_host(&target)
        .await?
        .next();
    addr.ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, target))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args();

    let server_addr = resolve(&args.server).await?;
    let socket = UdpSocket::bind(args.bind_addr).await?;
    info!("Bound to local address: {}", socket.local_addr()?);
    info!("Server address: {}", server_addr);

    let mut options = Vec::new();
    if let Some(blksize) = args.blksize {
        options.push(TransferOption::blksize(blksize));
    }
    if let Some(timeout) = args.timeout {
        options.push(TransferOption::timeout(timeout));
    }

    let client = Client::new(&socket, args.config.clone());

    let result = match args.command {
        Command::Put => {
            let mut file = File::open(&args.local).await?;
            if args.tsize {
                options.push(TransferOption::tsize(file.metadata().await?.len()));
            }
            info!("Sending {} -> {}", args.local.display(), args.remote);
            client
                .upload(server_addr, &mut file, &args.remote, &args.mode, &options)
                .await
        }
        Command::Get => {
            if args.tsize {
                options.push(TransferOption::tsize(0));
            }
            let mut file = File::create(&args.local).await?;
            info!("Receiving {} -> {}", args.remote, args.local.display());
            client
                .download(server_addr, &mut file, &args.remote, &args.mode, &options)
                .await
        }
    };

    match result {
        Ok(stats) => {
            info!("Transfer complete: {}", stats.summary());
            if let Some(tsize) = stats.transfer_size() {
                info!("  Server tsize: {} bytes", tsize);
            }
            Ok(())
        }
        Err(e) => {
            error!("Transfer failed: {}", e);
            Err(e.into())
        }
    }
}
