//! 옵션 협상 (RFC 2347) 파라미터 코덱
//!
//! 옵션 하나는 `label NUL decimal(value) NUL` 형태로 인코딩된다.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result, MAX_BLOCK_SIZE, MAX_TIMEOUT_SECS, MIN_BLOCK_SIZE, MIN_TIMEOUT_SECS};

/// 블록 크기 옵션 레이블 (RFC 2348)
pub const BLKSIZE: &str = "blksize";

/// 타임아웃 옵션 레이블 (RFC 2349)
pub const TIMEOUT: &str = "timeout";

/// 전송 크기 옵션 레이블 (RFC 2349)
pub const TSIZE: &str = "tsize";

/// 협상 옵션 (레이블 + 값)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferOption {
    label: String,
    value: u64,
}

impl TransferOption {
    /// 임의 레이블로 옵션 생성
    pub fn new(label: impl Into<String>, value: u64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }

    /// `blksize` 옵션: DATA 패킷당 바이트 수 (8 ~ 65464)
    pub fn blksize(value: u64) -> Self {
        Self::new(BLKSIZE, value)
    }

    /// `timeout` 옵션: 재전송 대기 초 (1 ~ 255)
    pub fn timeout(value: u64) -> Self {
        Self::new(TIMEOUT, value)
    }

    /// `tsize` 옵션: 전송할 파일 크기 (바이트)
    pub fn tsize(value: u64) -> Self {
        Self::new(TSIZE, value)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// 바이트로 인코딩
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.label.len() + 22);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// 버퍼 뒤에 이어서 인코딩
    pub fn encode_into(&self, buf: &mut BytesMut) {
        put_text(buf, &self.label);
        put_text(buf, &self.value.to_string());
    }

    /// 커서 위치에서 옵션 하나를 읽는다.
    ///
    /// 두 토큰이 모두 NUL로 끝나기 전에 버퍼가 끝나면 `Ok(None)`을 반환한다.
    /// 잘린 꼬리 옵션은 에러가 아니라 "더 이상 옵션 없음"으로 취급한다.
    /// 성공 시에만 커서가 소비한 바이트만큼 전진한다.
    pub fn decode(cursor: &mut &[u8]) -> Result<Option<Self>> {
        let buf = *cursor;

        let Some(label_end) = buf.iter().position(|&b| b == 0) else {
            return Ok(None);
        };
        let rest = &buf[label_end + 1..];
        let Some(value_end) = rest.iter().position(|&b| b == 0) else {
            return Ok(None);
        };

        let label = String::from_utf8_lossy(&buf[..label_end]).into_owned();
        let value = parse_decimal(&rest[..value_end])?;

        *cursor = &rest[value_end + 1..];
        Ok(Some(Self { label, value }))
    }

    /// 잘 알려진 옵션의 유효 범위 검사
    ///
    /// 알 수 없는 레이블은 그대로 통과시킨다.
    pub fn validate(&self) -> Result<()> {
        let valid = match self.label.as_str() {
            BLKSIZE => ((MIN_BLOCK_SIZE as u64)..=(MAX_BLOCK_SIZE as u64)).contains(&self.value),
            TIMEOUT => (MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.value),
            _ => true,
        };

        if valid {
            Ok(())
        } else {
            Err(Error::InvalidOption {
                label: self.label.clone(),
                value: self.value,
            })
        }
    }
}

impl fmt::Display for TransferOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.label, self.value)
    }
}

/// US-ASCII 텍스트 + NUL 종결자 기록
///
/// ASCII 범위 밖 문자는 `?`로 치환된다.
pub(crate) fn put_text(buf: &mut BytesMut, text: &str) {
    buf.reserve(text.len() + 1);
    for c in text.chars() {
        buf.put_u8(if c.is_ascii() { c as u8 } else { b'?' });
    }
    buf.put_u8(0);
}

/// 부호/앞자리 기호 없는 십진수 파싱
fn parse_decimal(token: &[u8]) -> Result<u64> {
    let malformed = || Error::MalformedOptionValue(String::from_utf8_lossy(token).into_owned());

    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }

    // 숫자만 있으므로 UTF-8 변환은 실패하지 않는다
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(malformed)
}
