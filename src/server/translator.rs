//! Built-in server translators.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use super::config::{Addr, ServerConfig, ServerGrpc};
use super::option::{EnforcementPolicy, GrpcServerOption, ServerKeepalive, ServerOption, ServiceAddr};
use crate::decoder::Extension;
use crate::duration::field_duration;
use crate::error::TranslateError;
use crate::option::StatsLevel;
use crate::registry::{translator, Registry, Translator};

type Options = Result<Vec<ServerOption>, TranslateError>;

pub fn basic_info<E>(config: &ServerConfig<E>) -> Options {
    Ok(config
        .server_basic_info
        .iter()
        .map(|info| ServerOption::ServerBasicInfo(info.clone()))
        .collect())
}

pub fn service_addr<E>(config: &ServerConfig<E>) -> Options {
    config
        .service_addr
        .iter()
        .flatten()
        .map(|addr| resolve(addr).map(ServerOption::ServiceAddr))
        .collect()
}

pub fn mux_transport<E>(config: &ServerConfig<E>) -> Options {
    match config.mux_transport {
        Some(true) => Ok(vec![ServerOption::MuxTransport]),
        _ => Ok(vec![]),
    }
}

pub fn read_write_timeout<E>(config: &ServerConfig<E>) -> Options {
    match &config.read_write_timeout {
        Some(value) => Ok(vec![ServerOption::ReadWriteTimeout(field_duration(
            "ReadWriteTimeout",
            value,
        )?)]),
        None => Ok(vec![]),
    }
}

pub fn exit_wait_time<E>(config: &ServerConfig<E>) -> Options {
    match &config.exit_wait_time {
        Some(value) => Ok(vec![ServerOption::ExitWaitTime(field_duration("ExitWaitTime", value)?)]),
        None => Ok(vec![]),
    }
}

pub fn max_conn_idle_time<E>(config: &ServerConfig<E>) -> Options {
    match &config.max_conn_idle_time {
        Some(value) => Ok(vec![ServerOption::MaxConnIdleTime(field_duration(
            "MaxConnIdleTime",
            value,
        )?)]),
        None => Ok(vec![]),
    }
}

pub fn stats_level<E>(config: &ServerConfig<E>) -> Options {
    match config.stats_level {
        Some(level) => Ok(vec![ServerOption::StatsLevel(StatsLevel::try_from(level)?)]),
        None => Ok(vec![]),
    }
}

pub fn grpc<E>(config: &ServerConfig<E>) -> Options {
    match &config.grpc {
        Some(grpc) => Ok(grpc_options(grpc)?.into_iter().map(ServerOption::Grpc).collect()),
        None => Ok(vec![]),
    }
}

fn grpc_options(grpc: &ServerGrpc) -> Result<Vec<GrpcServerOption>, TranslateError> {
    let mut options = Vec::new();
    if let Some(size) = grpc.write_buffer_size {
        options.push(GrpcServerOption::WriteBufferSize(size));
    }
    if let Some(size) = grpc.read_buffer_size {
        options.push(GrpcServerOption::ReadBufferSize(size));
    }
    if let Some(size) = grpc.initial_window_size {
        options.push(GrpcServerOption::InitialWindowSize(size));
    }
    if let Some(size) = grpc.initial_conn_window_size {
        options.push(GrpcServerOption::InitialConnWindowSize(size));
    }
    if let Some(params) = &grpc.keepalive_params {
        options.push(GrpcServerOption::KeepaliveParams(ServerKeepalive {
            max_connection_idle: optional_duration(
                "GRPC.KeepaliveParams.MaxConnectionIdle",
                &params.max_connection_idle,
            )?,
            max_connection_age: optional_duration(
                "GRPC.KeepaliveParams.MaxConnectionAge",
                &params.max_connection_age,
            )?,
            max_connection_age_grace: optional_duration(
                "GRPC.KeepaliveParams.MaxConnectionAgeGrace",
                &params.max_connection_age_grace,
            )?,
            time: optional_duration("GRPC.KeepaliveParams.Time", &params.time)?,
            timeout: optional_duration("GRPC.KeepaliveParams.Timeout", &params.timeout)?,
        }));
    }
    if let Some(policy) = &grpc.keepalive_enforcement_policy {
        options.push(GrpcServerOption::KeepaliveEnforcementPolicy(EnforcementPolicy {
            min_time: optional_duration("GRPC.KeepaliveEnforcementPolicy.MinTime", &policy.min_time)?,
            permit_without_stream: policy.permit_without_stream,
        }));
    }
    if let Some(streams) = grpc.max_concurrent_streams {
        options.push(GrpcServerOption::MaxConcurrentStreams(streams));
    }
    if let Some(size) = grpc.max_header_list_size {
        options.push(GrpcServerOption::MaxHeaderListSize(size));
    }
    Ok(options)
}

fn optional_duration(field: &str, value: &str) -> Result<Option<Duration>, TranslateError> {
    if value.is_empty() {
        return Ok(None);
    }
    field_duration(field, value).map(Some)
}

#[derive(Clone, Copy)]
enum Family {
    Any,
    V4,
    V6,
}

impl Family {
    fn accepts(self, ip: &IpAddr) -> bool {
        match self {
            Family::Any => true,
            Family::V4 => ip.is_ipv4(),
            Family::V6 => ip.is_ipv6(),
        }
    }
}

/// Resolves a network/address pair into a listen address.
pub fn resolve(addr: &Addr) -> Result<ServiceAddr, TranslateError> {
    let network = addr.network.as_str();
    match network {
        "tcp" => resolve_socket(addr, Family::Any).map(ServiceAddr::Tcp),
        "tcp4" => resolve_socket(addr, Family::V4).map(ServiceAddr::Tcp),
        "tcp6" => resolve_socket(addr, Family::V6).map(ServiceAddr::Tcp),
        "udp" => resolve_socket(addr, Family::Any).map(ServiceAddr::Udp),
        "udp4" => resolve_socket(addr, Family::V4).map(ServiceAddr::Udp),
        "udp6" => resolve_socket(addr, Family::V6).map(ServiceAddr::Udp),
        "ip" => resolve_ip(addr, Family::Any).map(ServiceAddr::Ip),
        "ip4" => resolve_ip(addr, Family::V4).map(ServiceAddr::Ip),
        "ip6" => resolve_ip(addr, Family::V6).map(ServiceAddr::Ip),
        "unix" | "unixgram" | "unixpacket" => {
            if addr.address.is_empty() {
                return Err(unresolvable(addr, "empty socket path"));
            }
            Ok(ServiceAddr::Unix(PathBuf::from(&addr.address)))
        }
        other => Err(TranslateError::UnknownNetwork(other.to_string())),
    }
}

fn resolve_socket(addr: &Addr, family: Family) -> Result<SocketAddr, TranslateError> {
    let (host, port) = addr
        .address
        .rsplit_once(':')
        .ok_or_else(|| unresolvable(addr, "missing port"))?;
    let port: u16 = port
        .parse()
        .map_err(|_| unresolvable(addr, &format!("invalid port {:?}", port)))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    // ":port" listens on every interface of the requested family.
    if host.is_empty() {
        let ip = match family {
            Family::V6 => IpAddr::from([0u16; 8]),
            _ => IpAddr::from([0u8; 4]),
        };
        return Ok(SocketAddr::new(ip, port));
    }

    (host, port)
        .to_socket_addrs()
        .map_err(|e| unresolvable(addr, &e.to_string()))?
        .find(|candidate| family.accepts(&candidate.ip()))
        .ok_or_else(|| unresolvable(addr, "no address of the requested family"))
}

fn resolve_ip(addr: &Addr, family: Family) -> Result<IpAddr, TranslateError> {
    if let Ok(ip) = addr.address.parse::<IpAddr>() {
        if family.accepts(&ip) {
            return Ok(ip);
        }
        return Err(unresolvable(addr, "address family does not match network"));
    }
    (addr.address.as_str(), 0)
        .to_socket_addrs()
        .map_err(|e| unresolvable(addr, &e.to_string()))?
        .map(|candidate| candidate.ip())
        .find(|ip| family.accepts(ip))
        .ok_or_else(|| unresolvable(addr, "no address of the requested family"))
}

fn unresolvable(addr: &Addr, reason: &str) -> TranslateError {
    TranslateError::UnresolvableAddress {
        network: addr.network.clone(),
        address: addr.address.clone(),
        reason: reason.to_string(),
    }
}

pub(crate) fn builtin_translators<E: Extension>() -> Registry<Translator<ServerConfig<E>, ServerOption>>
{
    let mut registry = Registry::new("server");
    registry.register("basicInfo", translator(basic_info::<E>));
    registry.register("serviceAddr", translator(service_addr::<E>));
    registry.register("muxTransport", translator(mux_transport::<E>));
    registry.register("readWriteTimeout", translator(read_write_timeout::<E>));
    registry.register("exitWaitTime", translator(exit_wait_time::<E>));
    registry.register("maxConnIdleTime", translator(max_conn_idle_time::<E>));
    registry.register("statsLevel", translator(stats_level::<E>));
    registry.register("grpc", translator(grpc::<E>));
    registry
}
