//! 스캔 제품: 닫힌 디스패치 집합
//!
//! 스캔 해석 시 제품 이름을 [`ScanProduct`]로 변환하며, 스윕 엔진은
//! 완전한 `match`로 제품별 처리를 선택합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// 스캔 제품
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScanProduct {
    /// 정적 분석 (SAST)
    #[serde(rename = "SAST")]
    Sast,
    /// 소프트웨어 구성 분석 (SCA)
    #[serde(rename = "SCA")]
    Sca,
}

impl ScanProduct {
    /// 레코드에 기록되는 제품 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sast => "SAST",
            Self::Sca => "SCA",
        }
    }
}

impl fmt::Display for ScanProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanProduct {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAST" => Ok(Self::Sast),
            "SCA" => Ok(Self::Sca),
            other => Err(TransformError::UnknownProduct(other.to_owned())),
        }
    }
}
