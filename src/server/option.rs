//! Server option values.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::option::{EndpointBasicInfo, StatsLevel};

/// A resolved listen address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAddr {
    Tcp(SocketAddr),
    Udp(SocketAddr),
    Ip(IpAddr),
    Unix(PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerKeepalive {
    pub max_connection_idle: Option<Duration>,
    pub max_connection_age: Option<Duration>,
    pub max_connection_age_grace: Option<Duration>,
    pub time: Option<Duration>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcementPolicy {
    pub min_time: Option<Duration>,
    pub permit_without_stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrpcServerOption {
    WriteBufferSize(u32),
    ReadBufferSize(u32),
    InitialWindowSize(u32),
    InitialConnWindowSize(u32),
    KeepaliveParams(ServerKeepalive),
    KeepaliveEnforcementPolicy(EnforcementPolicy),
    MaxConcurrentStreams(u32),
    MaxHeaderListSize(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerOption {
    ServerBasicInfo(EndpointBasicInfo),
    ServiceAddr(ServiceAddr),
    MuxTransport,
    ReadWriteTimeout(Duration),
    ExitWaitTime(Duration),
    MaxConnIdleTime(Duration),
    StatsLevel(StatsLevel),
    Grpc(GrpcServerOption),
    /// Produced by user translators.
    Custom { name: String, value: serde_json::Value },
}
