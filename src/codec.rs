//! 와이어 코덱
//!
//! 모든 16비트 정수는 빅엔디언. 메시지 경계는 데이터그램 경계와 같다.
//!
//! | 메시지 | 레이아웃 |
//! |---|---|
//! | RRQ/WRQ | opcode · filename · NUL · mode · NUL · [option...] |
//! | DATA | opcode · block · payload |
//! | ACK | opcode · block |
//! | ERROR | opcode · errcode · [message · NUL] |
//! | OACK | opcode · [option...] |

use std::net::SocketAddr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::message::{ErrorCode, Message, Operation, Request, Response};
use crate::option::{put_text, TransferOption};
use crate::{Error, Result};

/// opcode(2) + block(2)
pub const HEADER_LEN: usize = 4;

/// 메시지를 데이터그램 페이로드로 인코딩
pub fn encode(message: &Message) -> Bytes {
    match message {
        Message::Request(req) => encode_request(req),
        Message::Response(resp) => encode_response(resp),
    }
}

pub fn encode_request(req: &Request) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + req.filename.len() + req.mode.len() + 2);
    buf.put_u16(req.operation.code());
    put_text(&mut buf, &req.filename);
    put_text(&mut buf, &req.mode);
    for opt in &req.options {
        opt.encode_into(&mut buf);
    }
    buf.freeze()
}

pub fn encode_response(resp: &Response) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + resp.payload.len());
    buf.put_u16(resp.operation.code());

    match resp.operation {
        Operation::OptionAck => {
            for opt in resp.options.values() {
                opt.encode_into(&mut buf);
            }
        }
        Operation::Ack => {
            buf.put_u16(resp.block);
        }
        Operation::Data | Operation::Error => {
            buf.put_u16(resp.block);
            buf.put_slice(&resp.payload);
        }
        // 요청 opcode를 단 응답은 블록 번호까지만 기록
        Operation::Read | Operation::Write => {
            buf.put_u16(resp.block);
        }
    }

    buf.freeze()
}

/// 수신 데이터그램을 응답으로 디코딩
///
/// ERROR 메시지는 응답 값이 아니라 `Error::Protocol`로 반환된다.
pub fn decode_response(datagram: &[u8], from: SocketAddr) -> Result<Response> {
    let mut buf = datagram;
    let operation = read_operation(&mut buf)?;

    match operation {
        Operation::Error => Err(decode_error(buf)?),

        Operation::OptionAck => {
            let mut options = Vec::new();
            while let Some(opt) = TransferOption::decode(&mut buf)? {
                options.push(opt);
            }
            Ok(Response::option_ack(options, from))
        }

        Operation::Data | Operation::Ack => {
            if buf.remaining() < 2 {
                return Err(Error::Malformed("블록 번호 누락"));
            }
            let block = buf.get_u16();
            let payload = if operation == Operation::Data {
                Bytes::copy_from_slice(buf)
            } else {
                Bytes::new()
            };

            Ok(Response {
                operation,
                block,
                payload,
                options: Default::default(),
                peer: from,
            })
        }

        Operation::Read | Operation::Write => Err(Error::Malformed("응답 자리에 요청 메시지")),
    }
}

/// 수신 데이터그램을 요청으로 디코딩
///
/// 잘린 꼬리 옵션은 무시한다.
pub fn decode_request(datagram: &[u8], from: SocketAddr) -> Result<Request> {
    let mut buf = datagram;
    let operation = read_operation(&mut buf)?;

    if !operation.is_request() {
        return Err(Error::Malformed("요청 자리에 응답 메시지"));
    }

    let filename = read_text(&mut buf).ok_or(Error::Malformed("파일 이름 종결자 누락"))?;
    let mode = read_text(&mut buf).ok_or(Error::Malformed("모드 종결자 누락"))?;

    let mut options = Vec::new();
    while let Some(opt) = TransferOption::decode(&mut buf)? {
        options.push(opt);
    }

    Ok(Request {
        operation,
        filename,
        mode,
        options,
        peer: from,
    })
}

fn read_operation(buf: &mut &[u8]) -> Result<Operation> {
    if buf.remaining() < 2 {
        return Err(Error::Malformed("데이터그램이 너무 짧음"));
    }
    Operation::from_code(buf.get_u16())
}

/// ERROR 본문 (errcode + 선택적 메시지) 해석
fn decode_error(mut buf: &[u8]) -> Result<Error> {
    if buf.remaining() < 2 {
        return Err(Error::Malformed("에러 코드 누락"));
    }
    let code = ErrorCode::from_code(buf.get_u16())?;

    // 첫 NUL 이후는 버림
    let text = match buf.iter().position(|&b| b == 0) {
        Some(end) => &buf[..end],
        None => buf,
    };
    let message = if buf.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(text).into_owned())
    };

    Ok(Error::Protocol { code, message })
}

fn read_text(buf: &mut &[u8]) -> Option<String> {
    let end = buf.iter().position(|&b| b == 0)?;
    let text = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.advance(end + 1);
    Some(text)
}
