//! 프로토콜 메시지 정의
//!
//! 요청(RRQ/WRQ)과 응답(DATA/ACK/ERROR/OACK) 두 갈래로 나뉜다.
//! 모든 메시지는 교환 한 번 동안만 살아 있다.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;

use crate::option::{TransferOption, BLKSIZE, TIMEOUT, TSIZE};
use crate::{Error, Result};

/// 메시지 타입 (opcode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Operation {
    /// 읽기 요청 (RRQ)
    Read = 1,

    /// 쓰기 요청 (WRQ)
    Write = 2,

    /// 데이터 블록
    Data = 3,

    /// 블록 확인 응답
    Ack = 4,

    /// 에러
    Error = 5,

    /// 옵션 확인 응답 (RFC 2347)
    OptionAck = 6,
}

impl Operation {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            1 => Ok(Operation::Read),
            2 => Ok(Operation::Write),
            3 => Ok(Operation::Data),
            4 => Ok(Operation::Ack),
            5 => Ok(Operation::Error),
            6 => Ok(Operation::OptionAck),
            other => Err(Error::UnknownOperation(other)),
        }
    }

    /// 요청 메시지 여부
    pub fn is_request(self) -> bool {
        matches!(self, Operation::Read | Operation::Write)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Read => "RRQ",
            Operation::Write => "WRQ",
            Operation::Data => "DATA",
            Operation::Ack => "ACK",
            Operation::Error => "ERROR",
            Operation::OptionAck => "OACK",
        };
        f.write_str(name)
    }
}

/// 표준 에러 코드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    NotDefined = 0,
    FileNotFound = 1,
    AccessViolation = 2,
    DiskFull = 3,
    IllegalOperation = 4,
    UnknownTransferId = 5,
    FileAlreadyExists = 6,
    NoSuchUser = 7,
    OptionNegotiationFailed = 8,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            0 => Ok(ErrorCode::NotDefined),
            1 => Ok(ErrorCode::FileNotFound),
            2 => Ok(ErrorCode::AccessViolation),
            3 => Ok(ErrorCode::DiskFull),
            4 => Ok(ErrorCode::IllegalOperation),
            5 => Ok(ErrorCode::UnknownTransferId),
            6 => Ok(ErrorCode::FileAlreadyExists),
            7 => Ok(ErrorCode::NoSuchUser),
            8 => Ok(ErrorCode::OptionNegotiationFailed),
            other => Err(Error::UnknownErrorCode(other)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorCode::NotDefined => "not defined",
            ErrorCode::FileNotFound => "file not found",
            ErrorCode::AccessViolation => "access violation",
            ErrorCode::DiskFull => "disk full or allocation exceeded",
            ErrorCode::IllegalOperation => "illegal TFTP operation",
            ErrorCode::UnknownTransferId => "unknown transfer ID",
            ErrorCode::FileAlreadyExists => "file already exists",
            ErrorCode::NoSuchUser => "no such user",
            ErrorCode::OptionNegotiationFailed => "option negotiation failed",
        };
        write!(f, "{} ({})", self.code(), text)
    }
}

/// 읽기/쓰기 요청
///
/// `peer`는 요청을 보낼 목적지 주소
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub operation: Operation,

    /// 원격 파일 이름 (그대로 인코딩됨)
    pub filename: String,

    /// 전송 모드 레이블 ("octet", "netascii", "mail")
    pub mode: String,

    /// 제안 옵션 (순서 유지)
    pub options: Vec<TransferOption>,

    pub peer: SocketAddr,
}

impl Request {
    /// 원격 파일 쓰기 요청 (WRQ)
    pub fn write(
        filename: impl Into<String>,
        mode: impl Into<String>,
        peer: SocketAddr,
        options: Vec<TransferOption>,
    ) -> Self {
        Self {
            operation: Operation::Write,
            filename: filename.into(),
            mode: mode.into(),
            options,
            peer,
        }
    }

    /// 원격 파일 읽기 요청 (RRQ)
    pub fn read(
        filename: impl Into<String>,
        mode: impl Into<String>,
        peer: SocketAddr,
        options: Vec<TransferOption>,
    ) -> Self {
        Self {
            operation: Operation::Read,
            ..Self::write(filename, mode, peer, options)
        }
    }
}

/// DATA / ACK / ERROR / OACK 응답
///
/// 송신 메시지면 `peer`는 목적지, 수신 메시지면 발신지 주소다.
/// ERROR의 경우 `block` 자리에 에러 코드가, `payload`에 NUL로 끝나는 메시지가 들어간다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub operation: Operation,

    /// 블록 번호 (OACK는 항상 0)
    pub block: u16,

    /// DATA: 파일 조각, ERROR: 메시지 텍스트, 그 외: 비어 있음
    pub payload: Bytes,

    /// OACK로 확정된 옵션 (레이블 → 옵션)
    pub options: BTreeMap<String, TransferOption>,

    pub peer: SocketAddr,
}

impl Response {
    fn new(operation: Operation, block: u16, payload: Bytes, peer: SocketAddr) -> Self {
        Self {
            operation,
            block,
            payload,
            options: BTreeMap::new(),
            peer,
        }
    }

    /// DATA 응답
    pub fn data(block: u16, payload: impl Into<Bytes>, peer: SocketAddr) -> Self {
        Self::new(Operation::Data, block, payload.into(), peer)
    }

    /// ACK 응답
    pub fn ack(block: u16, peer: SocketAddr) -> Self {
        Self::new(Operation::Ack, block, Bytes::new(), peer)
    }

    /// ERROR 응답
    ///
    /// 메시지가 없으면 페이로드도 비어 있다 (NUL 하나만 붙이지 않음).
    pub fn error(code: ErrorCode, message: Option<&str>, peer: SocketAddr) -> Self {
        let payload = match message {
            Some(text) => {
                let mut buf = bytes::BytesMut::with_capacity(text.len() + 1);
                crate::option::put_text(&mut buf, text);
                buf.freeze()
            }
            None => Bytes::new(),
        };
        Self::new(Operation::Error, code.code(), payload, peer)
    }

    /// OACK 응답 (같은 레이블은 뒤의 것이 덮어씀)
    pub fn option_ack(options: impl IntoIterator<Item = TransferOption>, peer: SocketAddr) -> Self {
        let mut response = Self::new(Operation::OptionAck, 0, Bytes::new(), peer);
        for opt in options {
            response.options.insert(opt.label().to_string(), opt);
        }
        response
    }

    /// 레이블로 협상 옵션 조회
    pub fn option(&self, label: &str) -> Option<&TransferOption> {
        self.options.get(label)
    }

    pub fn block_size(&self) -> Option<&TransferOption> {
        self.option(BLKSIZE)
    }

    pub fn timeout(&self) -> Option<&TransferOption> {
        self.option(TIMEOUT)
    }

    pub fn transfer_size(&self) -> Option<&TransferOption> {
        self.option(TSIZE)
    }
}

/// 통합 메시지 enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    /// 메시지 타입 반환
    pub fn operation(&self) -> Operation {
        match self {
            Message::Request(req) => req.operation,
            Message::Response(resp) => resp.operation,
        }
    }

    /// 목적지 또는 발신지 주소
    pub fn peer(&self) -> SocketAddr {
        match self {
            Message::Request(req) => req.peer,
            Message::Response(resp) => resp.peer,
        }
    }
}

impl From<Request> for Message {
    fn from(req: Request) -> Self {
        Message::Request(req)
    }
}

impl From<Response> for Message {
    fn from(resp: Response) -> Self {
        Message::Response(resp)
    }
}
