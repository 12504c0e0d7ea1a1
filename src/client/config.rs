//! Client-side configuration document.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decoder::{Extension, NoExtension};
use crate::option::{EndpointBasicInfo, Tag};
use crate::reader::Document;
use crate::retry::{BackupPolicy, FailurePolicy, RetryPolicy, ShouldResultRetry};

/// Decoded client configuration. Every field is optional; an absent field
/// produces no options.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(bound(deserialize = "E: Extension"))]
pub struct ClientConfig<E = NoExtension> {
    #[serde(rename = "ClientBasicInfo", default, skip_serializing_if = "Option::is_none")]
    pub client_basic_info: Option<EndpointBasicInfo>,
    #[serde(rename = "HostPorts", default, skip_serializing_if = "Option::is_none")]
    pub host_ports: Option<Vec<String>>,
    #[serde(rename = "DestService", default, skip_serializing_if = "Option::is_none")]
    pub dest_service: Option<String>,
    #[serde(rename = "Protocol", default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(rename = "Connection", default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
    #[serde(rename = "FailureRetry", default, skip_serializing_if = "Option::is_none")]
    pub failure_retry: Option<FailurePolicy>,
    /// Result-retry predicate installed by the loader when no failure policy is configured.
    #[serde(skip)]
    pub should_result_retry: Option<ShouldResultRetry>,
    #[serde(rename = "BackupRequest", default, skip_serializing_if = "Option::is_none")]
    pub backup_request: Option<BackupPolicy>,
    #[serde(rename = "RPCTimeout", default, skip_serializing_if = "Option::is_none")]
    pub rpc_timeout: Option<String>,
    #[serde(rename = "ConnectionTimeout", default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout: Option<String>,
    #[serde(rename = "Tags", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(rename = "StatsLevel", default, skip_serializing_if = "Option::is_none")]
    pub stats_level: Option<i32>,
    #[serde(rename = "GRPC", default, skip_serializing_if = "Option::is_none")]
    pub grpc: Option<Grpc>,
    #[serde(rename = "CallOpt", default, skip_serializing_if = "Option::is_none")]
    pub call_opt: Option<CallOpt>,
    #[serde(rename = "Stream", default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamConfig>,
    #[serde(rename = "StreamCallOpt", default, skip_serializing_if = "Option::is_none")]
    pub stream_call_opt: Option<StreamCallOpt>,
    #[serde(rename = "MyConfig", default, skip_serializing_if = "Option::is_none")]
    pub my_config: Option<E>,
}

impl<E> Default for ClientConfig<E> {
    fn default() -> Self {
        Self {
            client_basic_info: None,
            host_ports: None,
            dest_service: None,
            protocol: None,
            connection: None,
            failure_retry: None,
            should_result_retry: None,
            backup_request: None,
            rpc_timeout: None,
            connection_timeout: None,
            tags: None,
            stats_level: None,
            grpc: None,
            call_opt: None,
            stream: None,
            stream_call_opt: None,
            my_config: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Connection {
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "LongConnection")]
    pub long_connection: IdleSettings,
    #[serde(rename = "MuxConnection")]
    pub mux_connection: MuxConnection,
}

/// Long-connection pool settings as written in the blob.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct IdleSettings {
    pub min_idle_per_address: usize,
    pub max_idle_per_address: usize,
    pub max_idle_global: usize,
    pub max_idle_timeout: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct MuxConnection {
    pub conn_num: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Grpc {
    #[serde(rename = "GRPCConnPoolSize", default, skip_serializing_if = "Option::is_none")]
    pub conn_pool_size: Option<u32>,
    #[serde(rename = "GRPCWriteBufferSize", default, skip_serializing_if = "Option::is_none")]
    pub write_buffer_size: Option<u32>,
    #[serde(rename = "GRPCReadBufferSize", default, skip_serializing_if = "Option::is_none")]
    pub read_buffer_size: Option<u32>,
    #[serde(rename = "GRPCInitialWindowSize", default, skip_serializing_if = "Option::is_none")]
    pub initial_window_size: Option<u32>,
    #[serde(rename = "GRPCInitialConnWindowSize", default, skip_serializing_if = "Option::is_none")]
    pub initial_conn_window_size: Option<u32>,
    #[serde(rename = "GRPCMaxHeaderListSize", default, skip_serializing_if = "Option::is_none")]
    pub max_header_list_size: Option<u32>,
    #[serde(rename = "GRPCKeepaliveParams", default, skip_serializing_if = "Option::is_none")]
    pub keepalive_params: Option<KeepaliveSettings>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct KeepaliveSettings {
    pub time: String,
    pub timeout: String,
    pub permit_without_stream: bool,
}

/// Options applied to individual calls, keyed by call-option name.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CallOpt {
    #[serde(rename = "HostPorts", default, skip_serializing_if = "Option::is_none")]
    pub host_ports: Option<BTreeMap<String, String>>,
    #[serde(rename = "Urls", default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<BTreeMap<String, String>>,
    #[serde(rename = "Tags", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, Tag>>,
    #[serde(rename = "RPCTimeout", default, skip_serializing_if = "Option::is_none")]
    pub rpc_timeout: Option<String>,
    #[serde(rename = "ConnectionTimeout", default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout: Option<String>,
    #[serde(rename = "HTTPHost", default, skip_serializing_if = "Option::is_none")]
    pub http_host: Option<String>,
    #[serde(rename = "RetryPolicy", default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
    #[serde(rename = "CompressorName", default, skip_serializing_if = "Option::is_none")]
    pub compressor_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StreamConfig {
    #[serde(rename = "ClientBasicInfo", default, skip_serializing_if = "Option::is_none")]
    pub client_basic_info: Option<EndpointBasicInfo>,
    #[serde(rename = "HostPorts", default, skip_serializing_if = "Option::is_none")]
    pub host_ports: Option<Vec<String>>,
    #[serde(rename = "DestService", default, skip_serializing_if = "Option::is_none")]
    pub dest_service: Option<String>,
    #[serde(rename = "ConnectionTimeout", default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout: Option<String>,
    #[serde(rename = "Tags", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(rename = "StatsLevel", default, skip_serializing_if = "Option::is_none")]
    pub stats_level: Option<i32>,
    #[serde(rename = "GRPC", default, skip_serializing_if = "Option::is_none")]
    pub grpc: Option<Grpc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StreamCallOpt {
    #[serde(rename = "HostPorts", default, skip_serializing_if = "Option::is_none")]
    pub host_ports: Option<BTreeMap<String, String>>,
    #[serde(rename = "Urls", default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<BTreeMap<String, String>>,
    #[serde(rename = "Tags", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, Tag>>,
    #[serde(rename = "ConnectionTimeout", default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout: Option<String>,
    #[serde(rename = "CompressorName", default, skip_serializing_if = "Option::is_none")]
    pub compressor_name: Option<String>,
}

impl<E: Extension> Document for ClientConfig<E> {
    const DEFAULT_PATH_FORMAT: &'static str = "/{{ClientServiceName}}/{{ServerServiceName}}";
}

impl<E: Extension> fmt::Display for ClientConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(info) = &self.client_basic_info {
            writeln!(f, "ClientBasicInfo: {:?}", info)?;
        }
        if let Some(host_ports) = &self.host_ports {
            writeln!(f, "HostPorts: {:?}", host_ports)?;
        }
        if let Some(dest_service) = &self.dest_service {
            writeln!(f, "DestService: {}", dest_service)?;
        }
        if let Some(protocol) = &self.protocol {
            writeln!(f, "Protocol: {}", protocol)?;
        }
        if let Some(connection) = &self.connection {
            writeln!(f, "Connection: {:?}", connection)?;
        }
        if let Some(policy) = &self.failure_retry {
            writeln!(f, "FailureRetry: {:?}", policy)?;
        }
        if let Some(policy) = &self.backup_request {
            writeln!(f, "BackupRequest: {:?}", policy)?;
        }
        if let Some(timeout) = &self.rpc_timeout {
            writeln!(f, "RPCTimeout: {}", timeout)?;
        }
        if let Some(timeout) = &self.connection_timeout {
            writeln!(f, "ConnectionTimeout: {}", timeout)?;
        }
        if let Some(tags) = &self.tags {
            writeln!(f, "Tags: {:?}", tags)?;
        }
        if let Some(level) = &self.stats_level {
            writeln!(f, "StatsLevel: {}", level)?;
        }
        if let Some(grpc) = &self.grpc {
            writeln!(f, "GRPC: {:?}", grpc)?;
        }
        if let Some(call_opt) = &self.call_opt {
            writeln!(f, "CallOpt: {:?}", call_opt)?;
        }
        if let Some(stream) = &self.stream {
            writeln!(f, "Stream: {:?}", stream)?;
        }
        if let Some(stream_call_opt) = &self.stream_call_opt {
            writeln!(f, "StreamCallOpt: {:?}", stream_call_opt)?;
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

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    struct Custom {
        #[serde(rename = "configOne")]
        config_one: Option<String>,
    }

    impl fmt::Display for Custom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "configOne: {:?}", self.config_one)
        }
    }

    #[test]
    fn empty_blob_leaves_everything_absent() {
        let config: ClientConfig = DefaultDecoder.decode(&ConfigFormat::Json, b"{}").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn decodes_yaml_with_extension() {
        let yaml = br#"
HostPorts: ["127.0.0.1:8888"]
Connection:
  Method: LongConnection
  LongConnection:
    MaxIdlePerAddress: 10
    MaxIdleTimeout: 30s
MyConfig:
  configOne: hello
"#;
        let config: ClientConfig<Custom> = DefaultDecoder.decode(&ConfigFormat::Yaml, yaml).unwrap();
        assert_eq!(config.host_ports, Some(vec!["127.0.0.1:8888".to_string()]));
        let connection = config.connection.as_ref().unwrap();
        assert_eq!(connection.long_connection.max_idle_per_address, 10);
        assert_eq!(connection.long_connection.max_idle_timeout, "30s");
        assert_eq!(config.my_config.as_ref().unwrap().config_one.as_deref(), Some("hello"));
    }

    #[test]
    fn display_appends_extension() {
        let config = ClientConfig {
            dest_service: Some("echo".into()),
            my_config: Some(Custom {
                config_one: Some("x".into()),
            }),
            ..ClientConfig::default()
        };
        assert_eq!(config.to_string(), "DestService: echo\nconfigOne: Some(\"x\")\n");
    }
}
