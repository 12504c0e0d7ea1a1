//! Client, stream and call option values.

use std::time::Duration;

use crate::option::{EndpointBasicInfo, Protocol, StatsLevel};
use crate::retry::{BackupPolicy, FailurePolicy, RetryPolicy, ShouldResultRetry};

/// Connection-pool limits for long connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleConfig {
    pub min_idle_per_address: usize,
    pub max_idle_per_address: usize,
    pub max_idle_global: usize,
    pub max_idle_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientKeepalive {
    pub time: Duration,
    pub timeout: Duration,
    pub permit_without_stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrpcOption {
    ConnPoolSize(u32),
    WriteBufferSize(u32),
    ReadBufferSize(u32),
    InitialWindowSize(u32),
    InitialConnWindowSize(u32),
    MaxHeaderListSize(u32),
    KeepaliveParams(ClientKeepalive),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientOption {
    ClientBasicInfo(EndpointBasicInfo),
    HostPorts(Vec<String>),
    DestService(String),
    TransportProtocol(Protocol),
    ShortConnection,
    LongConnection(IdleConfig),
    MuxConnection(usize),
    FailureRetry(FailurePolicy),
    SpecifiedResultRetry(ShouldResultRetry),
    BackupRequest(BackupPolicy),
    RpcTimeout(Duration),
    ConnectTimeout(Duration),
    Tag { key: String, value: String },
    StatsLevel(StatsLevel),
    Grpc(GrpcOption),
    /// Produced by user translators.
    Custom { name: String, value: serde_json::Value },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamOption {
    ClientBasicInfo(EndpointBasicInfo),
    HostPorts(Vec<String>),
    DestService(String),
    ConnectTimeout(Duration),
    Tag { key: String, value: String },
    StatsLevel(StatsLevel),
    Grpc(GrpcOption),
    Custom { name: String, value: serde_json::Value },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallOption {
    HostPort(String),
    Url(String),
    Tag { key: String, value: String },
    RpcTimeout(Duration),
    ConnectTimeout(Duration),
    HttpHost(String),
    RetryPolicy(RetryPolicy),
    GrpcCompressor(String),
    Custom { name: String, value: serde_json::Value },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamCallOption {
    HostPort(String),
    Url(String),
    Tag { key: String, value: String },
    ConnectTimeout(Duration),
    GrpcCompressor(String),
    Custom { name: String, value: serde_json::Value },
}
