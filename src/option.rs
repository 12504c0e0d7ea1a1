//! Option vocabulary shared by client and server option families.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

/// Identity of an RPC endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct EndpointBasicInfo {
    pub service_name: String,
    pub method: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Transport protocols understood by the framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    PurePayload,
    TTHeader,
    Framed,
    Http,
    Grpc,
    Hessian2,
    TTHeaderFramed,
}

impl Protocol {
    /// Bit flags as used on the wire; `TTHeaderFramed` combines two flags.
    pub fn bits(self) -> u8 {
        match self {
            Protocol::PurePayload => 0,
            Protocol::TTHeader => 1 << 1,
            Protocol::Framed => 1 << 2,
            Protocol::Http => 1 << 3,
            Protocol::Grpc => 1 << 4,
            Protocol::Hessian2 => 1 << 5,
            Protocol::TTHeaderFramed => (1 << 1) | (1 << 2),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::PurePayload => "PurePayload",
            Protocol::TTHeader => "TTHeader",
            Protocol::Framed => "Framed",
            Protocol::Http => "HTTP",
            Protocol::Grpc => "GRPC",
            Protocol::Hessian2 => "HESSIAN2",
            Protocol::TTHeaderFramed => "TTHeaderFramed",
        }
    }
}

impl FromStr for Protocol {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PurePayload" => Ok(Protocol::PurePayload),
            "TTHeader" => Ok(Protocol::TTHeader),
            "Framed" => Ok(Protocol::Framed),
            "HTTP" => Ok(Protocol::Http),
            "GRPC" => Ok(Protocol::Grpc),
            "HESSIAN2" => Ok(Protocol::Hessian2),
            "TTHeaderFramed" => Ok(Protocol::TTHeaderFramed),
            other => Err(TranslateError::UnknownProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much the framework records per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsLevel {
    Disabled,
    Base,
    Detailed,
}

impl TryFrom<i32> for StatsLevel {
    type Error = TranslateError;

    fn try_from(level: i32) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(StatsLevel::Disabled),
            1 => Ok(StatsLevel::Base),
            2 => Ok(StatsLevel::Detailed),
            other => Err(TranslateError::UnknownStatsLevel(other)),
        }
    }
}
