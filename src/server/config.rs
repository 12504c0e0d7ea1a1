//! Server-side configuration document.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decoder::{Extension, NoExtension};
use crate::option::EndpointBasicInfo;
use crate::reader::Document;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(bound(deserialize = "E: Extension"))]
pub struct ServerConfig<E = NoExtension> {
    #[serde(rename = "ServerBasicInfo", default, skip_serializing_if = "Option::is_none")]
    pub server_basic_info: Option<EndpointBasicInfo>,
    #[serde(rename = "ServiceAddr", default, skip_serializing_if = "Option::is_none")]
    pub service_addr: Option<Vec<Addr>>,
    #[serde(rename = "MuxTransport", default, skip_serializing_if = "Option::is_none")]
    pub mux_transport: Option<bool>,
    #[serde(rename = "ReadWriteTimeout", default, skip_serializing_if = "Option::is_none")]
    pub read_write_timeout: Option<String>,
    #[serde(rename = "ExitWaitTime", default, skip_serializing_if = "Option::is_none")]
    pub exit_wait_time: Option<String>,
    #[serde(rename = "MaxConnIdleTime", default, skip_serializing_if = "Option::is_none")]
    pub max_conn_idle_time: Option<String>,
    #[serde(rename = "StatsLevel", default, skip_serializing_if = "Option::is_none")]
    pub stats_level: Option<i32>,
    #[serde(rename = "GRPC", default, skip_serializing_if = "Option::is_none")]
    pub grpc: Option<ServerGrpc>,
    #[serde(rename = "MyConfig", default, skip_serializing_if = "Option::is_none")]
    pub my_config: Option<E>,
}

impl<E> Default for ServerConfig<E> {
    fn default() -> Self {
        Self {
            server_basic_info: None,
            service_addr: None,
            mux_transport: None,
            read_write_timeout: None,
            exit_wait_time: None,
            max_conn_idle_time: None,
            stats_level: None,
            grpc: None,
            my_config: None,
        }
    }
}

/// A listen address, e.g. `{"network": "tcp", "address": ":8888"}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Addr {
    pub network: String,
    pub address: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ServerGrpc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_buffer_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_buffer_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_window_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_conn_window_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_params: Option<ServerKeepaliveSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_enforcement_policy: Option<EnforcementSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_streams: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_header_list_size: Option<u32>,
}

/// Keepalive durations as written in the blob; empty strings are skipped.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServerKeepaliveSettings {
    pub max_connection_idle: String,
    pub max_connection_age: String,
    pub max_connection_age_grace: String,
    pub time: String,
    pub timeout: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct EnforcementSettings {
    pub min_time: String,
    pub permit_without_stream: bool,
}

impl<E: Extension> Document for ServerConfig<E> {
    const DEFAULT_PATH_FORMAT: &'static str = "/{{ServerServiceName}}";
}

impl<E: Extension> fmt::Display for ServerConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(info) = &self.server_basic_info {
            writeln!(f, "ServerBasicInfo: {:?}", info)?;
        }
        if let Some(addrs) = &self.service_addr {
            for addr in addrs {
                writeln!(f, "ServiceAddr: {}://{}", addr.network, addr.address)?;
            }
        }
        if let Some(mux) = self.mux_transport {
            writeln!(f, "MuxTransport: {}", mux)?;
        }
        if let Some(timeout) = &self.read_write_timeout {
            writeln!(f, "ReadWriteTimeout: {}", timeout)?;
        }
        if let Some(wait) = &self.exit_wait_time {
            writeln!(f, "ExitWaitTime: {}", wait)?;
        }
        if let Some(idle) = &self.max_conn_idle_time {
            writeln!(f, "MaxConnIdleTime: {}", idle)?;
        }
        if let Some(level) = self.stats_level {
            writeln!(f, "StatsLevel: {}", level)?;
        }
        if let Some(grpc) = &self.grpc {
            writeln!(f, "GRPC: {:?}", grpc)?;
        }
        if let Some(my_config) = &self.my_config {
            write!(f, "{}", my_config)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{ConfigDecoder, ConfigFormat, DefaultDecoder};

    #[test]
    fn decodes_json() {
        let json = br#"{
            "ServiceAddr": [{"network": "tcp", "address": "127.0.0.1:8888"}],
            "MuxTransport": true,
            "ExitWaitTime": "5s",
            "GRPC": {
                "MaxConcurrentStreams": 100,
                "KeepaliveParams": {"Time": "2h", "Timeout": "20s"},
                "KeepaliveEnforcementPolicy": {"MinTime": "5m", "PermitWithoutStream": true}
            }
        }"#;
        let config: ServerConfig = DefaultDecoder.decode(&ConfigFormat::Json, json).unwrap();
        assert_eq!(
            config.service_addr,
            Some(vec![Addr {
                network: "tcp".into(),
                address: "127.0.0.1:8888".into(),
            }])
        );
        assert_eq!(config.mux_transport, Some(true));
        let grpc = config.grpc.unwrap();
        assert_eq!(grpc.max_concurrent_streams, Some(100));
        assert_eq!(grpc.keepalive_params.unwrap().time, "2h");
        assert!(grpc.keepalive_enforcement_policy.unwrap().permit_without_stream);
    }

    #[test]
    fn serializes_only_populated_fields() {
        let config: ServerConfig = ServerConfig {
            read_write_timeout: Some("3s".into()),
            ..ServerConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"ReadWriteTimeout":"3s"}"#);
    }

    #[test]
    fn display_lists_fields() {
        let config: ServerConfig = ServerConfig {
            service_addr: Some(vec![Addr {
                network: "unix".into(),
                address: "/tmp/echo.sock".into(),
            }]),
            stats_level: Some(1),
            ..ServerConfig::default()
        };
        assert_eq!(config.to_string(), "ServiceAddr: unix:///tmp/echo.sock\nStatsLevel: 1\n");
    }
}
