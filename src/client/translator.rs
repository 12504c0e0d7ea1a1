//! Built-in client translators, one per configuration field.

use indexmap::IndexMap;

use super::config::{ClientConfig, Grpc};
use super::option::{
    CallOption, ClientKeepalive, ClientOption, GrpcOption, IdleConfig, StreamCallOption,
    StreamOption,
};
use crate::decoder::Extension;
use crate::duration::field_duration;
use crate::error::TranslateError;
use crate::option::{Protocol, StatsLevel, Tag};
use crate::registry::{
    call_option_map_translator, call_option_translator, translator, CallOptionMapTranslator,
    CallOptionTranslator, Registry, Translator,
};

type Options = Result<Vec<ClientOption>, TranslateError>;
type StreamOptions = Result<Vec<StreamOption>, TranslateError>;

pub fn basic_info<E>(config: &ClientConfig<E>) -> Options {
    Ok(config
        .client_basic_info
        .iter()
        .map(|info| ClientOption::ClientBasicInfo(info.clone()))
        .collect())
}

pub fn host_ports<E>(config: &ClientConfig<E>) -> Options {
    Ok(config
        .host_ports
        .iter()
        .map(|hosts| ClientOption::HostPorts(hosts.clone()))
        .collect())
}

pub fn dest_service<E>(config: &ClientConfig<E>) -> Options {
    Ok(config
        .dest_service
        .iter()
        .map(|service| ClientOption::DestService(service.clone()))
        .collect())
}

pub fn protocol<E>(config: &ClientConfig<E>) -> Options {
    let Some(name) = &config.protocol else {
        return Ok(vec![]);
    };
    let protocol: Protocol = name.parse()?;
    Ok(vec![ClientOption::TransportProtocol(protocol)])
}

pub fn connection<E>(config: &ClientConfig<E>) -> Options {
    let Some(connection) = &config.connection else {
        return Ok(vec![]);
    };
    let option = match connection.method.as_str() {
        "ShortConnection" => ClientOption::ShortConnection,
        "LongConnection" => {
            let settings = &connection.long_connection;
            ClientOption::LongConnection(IdleConfig {
                min_idle_per_address: settings.min_idle_per_address,
                max_idle_per_address: settings.max_idle_per_address,
                max_idle_global: settings.max_idle_global,
                max_idle_timeout: field_duration(
                    "Connection.LongConnection.MaxIdleTimeout",
                    &settings.max_idle_timeout,
                )?,
            })
        }
        "MuxConnection" => ClientOption::MuxConnection(connection.mux_connection.conn_num),
        other => return Err(TranslateError::UnsupportedConnectionMethod(other.to_string())),
    };
    Ok(vec![option])
}

pub fn failure_retry<E>(config: &ClientConfig<E>) -> Options {
    let Some(policy) = &config.failure_retry else {
        return Ok(vec![]);
    };
    policy.validate()?;
    Ok(vec![ClientOption::FailureRetry(policy.clone())])
}

pub fn specified_result_retry<E>(config: &ClientConfig<E>) -> Options {
    Ok(config
        .should_result_retry
        .iter()
        .map(|predicate| ClientOption::SpecifiedResultRetry(predicate.clone()))
        .collect())
}

pub fn backup_request<E>(config: &ClientConfig<E>) -> Options {
    Ok(config
        .backup_request
        .iter()
        .map(|policy| ClientOption::BackupRequest(policy.clone()))
        .collect())
}

pub fn rpc_timeout<E>(config: &ClientConfig<E>) -> Options {
    match &config.rpc_timeout {
        Some(value) => Ok(vec![ClientOption::RpcTimeout(field_duration("RPCTimeout", value)?)]),
        None => Ok(vec![]),
    }
}

pub fn connection_timeout<E>(config: &ClientConfig<E>) -> Options {
    match &config.connection_timeout {
        Some(value) => Ok(vec![ClientOption::ConnectTimeout(field_duration(
            "ConnectionTimeout",
            value,
        )?)]),
        None => Ok(vec![]),
    }
}

pub fn tags<E>(config: &ClientConfig<E>) -> Options {
    Ok(config
        .tags
        .iter()
        .flatten()
        .map(|Tag { key, value }| ClientOption::Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect())
}

pub fn stats_level<E>(config: &ClientConfig<E>) -> Options {
    match config.stats_level {
        Some(level) => Ok(vec![ClientOption::StatsLevel(StatsLevel::try_from(level)?)]),
        None => Ok(vec![]),
    }
}

pub fn grpc<E>(config: &ClientConfig<E>) -> Options {
    match &config.grpc {
        Some(grpc) => Ok(grpc_options("GRPC", grpc)?
            .into_iter()
            .map(ClientOption::Grpc)
            .collect()),
        None => Ok(vec![]),
    }
}

/// One option per populated knob, in declaration order.
fn grpc_options(field: &str, grpc: &Grpc) -> Result<Vec<GrpcOption>, TranslateError> {
    let sizes = [
        (grpc.conn_pool_size, GrpcOption::ConnPoolSize as fn(u32) -> GrpcOption),
        (grpc.write_buffer_size, GrpcOption::WriteBufferSize),
        (grpc.read_buffer_size, GrpcOption::ReadBufferSize),
        (grpc.initial_window_size, GrpcOption::InitialWindowSize),
        (grpc.initial_conn_window_size, GrpcOption::InitialConnWindowSize),
        (grpc.max_header_list_size, GrpcOption::MaxHeaderListSize),
    ];
    let mut options: Vec<GrpcOption> = sizes
        .into_iter()
        .filter_map(|(value, make)| value.map(make))
        .collect();

    if let Some(keepalive) = &grpc.keepalive_params {
        options.push(GrpcOption::KeepaliveParams(ClientKeepalive {
            time: field_duration(&format!("{}.GRPCKeepaliveParams.Time", field), &keepalive.time)?,
            timeout: field_duration(
                &format!("{}.GRPCKeepaliveParams.Timeout", field),
                &keepalive.timeout,
            )?,
            permit_without_stream: keepalive.permit_without_stream,
        }));
    }
    Ok(options)
}

pub fn stream_basic_info<E>(config: &ClientConfig<E>) -> StreamOptions {
    Ok(config
        .stream
        .iter()
        .filter_map(|stream| stream.client_basic_info.clone())
        .map(StreamOption::ClientBasicInfo)
        .collect())
}

pub fn stream_host_ports<E>(config: &ClientConfig<E>) -> StreamOptions {
    Ok(config
        .stream
        .iter()
        .filter_map(|stream| stream.host_ports.clone())
        .map(StreamOption::HostPorts)
        .collect())
}

pub fn stream_dest_service<E>(config: &ClientConfig<E>) -> StreamOptions {
    Ok(config
        .stream
        .iter()
        .filter_map(|stream| stream.dest_service.clone())
        .map(StreamOption::DestService)
        .collect())
}

pub fn stream_connection_timeout<E>(config: &ClientConfig<E>) -> StreamOptions {
    match config.stream.as_ref().and_then(|s| s.connection_timeout.as_ref()) {
        Some(value) => Ok(vec![StreamOption::ConnectTimeout(field_duration(
            "Stream.ConnectionTimeout",
            value,
        )?)]),
        None => Ok(vec![]),
    }
}

pub fn stream_tags<E>(config: &ClientConfig<E>) -> StreamOptions {
    Ok(config
        .stream
        .iter()
        .filter_map(|stream| stream.tags.as_ref())
        .flatten()
        .map(|Tag { key, value }| StreamOption::Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect())
}

pub fn stream_stats_level<E>(config: &ClientConfig<E>) -> StreamOptions {
    match config.stream.as_ref().and_then(|s| s.stats_level) {
        Some(level) => Ok(vec![StreamOption::StatsLevel(StatsLevel::try_from(level)?)]),
        None => Ok(vec![]),
    }
}

pub fn stream_grpc<E>(config: &ClientConfig<E>) -> StreamOptions {
    match config.stream.as_ref().and_then(|s| s.grpc.as_ref()) {
        Some(grpc) => Ok(grpc_options("Stream.GRPC", grpc)?
            .into_iter()
            .map(StreamOption::Grpc)
            .collect()),
        None => Ok(vec![]),
    }
}

pub fn call_host_ports<E>(config: &ClientConfig<E>) -> Result<IndexMap<String, CallOption>, TranslateError> {
    Ok(config
        .call_opt
        .iter()
        .filter_map(|c| c.host_ports.as_ref())
        .flatten()
        .map(|(name, host_port)| (name.clone(), CallOption::HostPort(host_port.clone())))
        .collect())
}

pub fn call_urls<E>(config: &ClientConfig<E>) -> Result<IndexMap<String, CallOption>, TranslateError> {
    Ok(config
        .call_opt
        .iter()
        .filter_map(|c| c.urls.as_ref())
        .flatten()
        .map(|(name, url)| (name.clone(), CallOption::Url(url.clone())))
        .collect())
}

pub fn call_tags<E>(config: &ClientConfig<E>) -> Result<IndexMap<String, CallOption>, TranslateError> {
    Ok(config
        .call_opt
        .iter()
        .filter_map(|c| c.tags.as_ref())
        .flatten()
        .map(|(name, tag)| {
            let option = CallOption::Tag {
                key: tag.key.clone(),
                value: tag.value.clone(),
            };
            (name.clone(), option)
        })
        .collect())
}

pub fn call_rpc_timeout<E>(config: &ClientConfig<E>) -> Result<Option<CallOption>, TranslateError> {
    config
        .call_opt
        .as_ref()
        .and_then(|c| c.rpc_timeout.as_ref())
        .map(|value| field_duration("CallOpt.RPCTimeout", value).map(CallOption::RpcTimeout))
        .transpose()
}

pub fn call_connection_timeout<E>(
    config: &ClientConfig<E>,
) -> Result<Option<CallOption>, TranslateError> {
    config
        .call_opt
        .as_ref()
        .and_then(|c| c.connection_timeout.as_ref())
        .map(|value| field_duration("CallOpt.ConnectionTimeout", value).map(CallOption::ConnectTimeout))
        .transpose()
}

pub fn call_http_host<E>(config: &ClientConfig<E>) -> Result<Option<CallOption>, TranslateError> {
    Ok(config
        .call_opt
        .as_ref()
        .and_then(|c| c.http_host.clone())
        .map(CallOption::HttpHost))
}

pub fn call_retry_policy<E>(config: &ClientConfig<E>) -> Result<Option<CallOption>, TranslateError> {
    let Some(policy) = config.call_opt.as_ref().and_then(|c| c.retry_policy.as_ref()) else {
        return Ok(None);
    };
    policy.validate()?;
    Ok(Some(CallOption::RetryPolicy(policy.clone())))
}

pub fn call_grpc_compressor<E>(config: &ClientConfig<E>) -> Result<Option<CallOption>, TranslateError> {
    Ok(config
        .call_opt
        .as_ref()
        .and_then(|c| c.compressor_name.clone())
        .map(CallOption::GrpcCompressor))
}

pub fn stream_call_host_ports<E>(
    config: &ClientConfig<E>,
) -> Result<IndexMap<String, StreamCallOption>, TranslateError> {
    Ok(config
        .stream_call_opt
        .iter()
        .filter_map(|c| c.host_ports.as_ref())
        .flatten()
        .map(|(name, host_port)| (name.clone(), StreamCallOption::HostPort(host_port.clone())))
        .collect())
}

pub fn stream_call_urls<E>(
    config: &ClientConfig<E>,
) -> Result<IndexMap<String, StreamCallOption>, TranslateError> {
    Ok(config
        .stream_call_opt
        .iter()
        .filter_map(|c| c.urls.as_ref())
        .flatten()
        .map(|(name, url)| (name.clone(), StreamCallOption::Url(url.clone())))
        .collect())
}

pub fn stream_call_tags<E>(
    config: &ClientConfig<E>,
) -> Result<IndexMap<String, StreamCallOption>, TranslateError> {
    Ok(config
        .stream_call_opt
        .iter()
        .filter_map(|c| c.tags.as_ref())
        .flatten()
        .map(|(name, tag)| {
            let option = StreamCallOption::Tag {
                key: tag.key.clone(),
                value: tag.value.clone(),
            };
            (name.clone(), option)
        })
        .collect())
}

pub fn stream_call_connection_timeout<E>(
    config: &ClientConfig<E>,
) -> Result<Option<StreamCallOption>, TranslateError> {
    config
        .stream_call_opt
        .as_ref()
        .and_then(|c| c.connection_timeout.as_ref())
        .map(|value| {
            field_duration("StreamCallOpt.ConnectionTimeout", value).map(StreamCallOption::ConnectTimeout)
        })
        .transpose()
}

pub fn stream_call_grpc_compressor<E>(
    config: &ClientConfig<E>,
) -> Result<Option<StreamCallOption>, TranslateError> {
    Ok(config
        .stream_call_opt
        .as_ref()
        .and_then(|c| c.compressor_name.clone())
        .map(StreamCallOption::GrpcCompressor))
}

pub(crate) fn builtin_translators<E: Extension>() -> Registry<Translator<ClientConfig<E>, ClientOption>> {
    let mut registry = Registry::new("client");
    registry.register("basicInfo", translator(basic_info::<E>));
    registry.register("hostPorts", translator(host_ports::<E>));
    registry.register("destService", translator(dest_service::<E>));
    registry.register("protocol", translator(protocol::<E>));
    registry.register("connection", translator(connection::<E>));
    registry.register("failureRetry", translator(failure_retry::<E>));
    registry.register("specifiedResultRetry", translator(specified_result_retry::<E>));
    registry.register("backupRequest", translator(backup_request::<E>));
    registry.register("rpcTimeout", translator(rpc_timeout::<E>));
    registry.register("connectionTimeout", translator(connection_timeout::<E>));
    registry.register("tags", translator(tags::<E>));
    registry.register("statsLevel", translator(stats_level::<E>));
    registry.register("grpc", translator(grpc::<E>));
    registry
}

pub(crate) fn builtin_stream_translators<E: Extension>(
) -> Registry<Translator<ClientConfig<E>, StreamOption>> {
    let mut registry = Registry::new("stream");
    registry.register("streamBasicInfo", translator(stream_basic_info::<E>));
    registry.register("streamHostPorts", translator(stream_host_ports::<E>));
    registry.register("streamDestService", translator(stream_dest_service::<E>));
    registry.register("streamConnectionTimeout", translator(stream_connection_timeout::<E>));
    registry.register("streamTags", translator(stream_tags::<E>));
    registry.register("streamStatsLevel", translator(stream_stats_level::<E>));
    registry.register("streamGrpc", translator(stream_grpc::<E>));
    registry
}

pub(crate) fn builtin_call_option_map_translators<E: Extension>(
) -> Registry<CallOptionMapTranslator<ClientConfig<E>, CallOption>> {
    let mut registry = Registry::new("call-option-map");
    registry.register("callOptionHostPorts", call_option_map_translator(call_host_ports::<E>));
    registry.register("callOptionUrls", call_option_map_translator(call_urls::<E>));
    registry.register("callOptionTags", call_option_map_translator(call_tags::<E>));
    registry
}

pub(crate) fn builtin_call_option_translators<E: Extension>(
) -> Registry<CallOptionTranslator<ClientConfig<E>, CallOption>> {
    let mut registry = Registry::new("call-option");
    registry.register("callOptionRPCTimeout", call_option_translator(call_rpc_timeout::<E>));
    registry.register(
        "callOptionConnectionTimeout",
        call_option_translator(call_connection_timeout::<E>),
    );
    registry.register("callOptionHTTPHost", call_option_translator(call_http_host::<E>));
    registry.register("callOptionRetryPolicy", call_option_translator(call_retry_policy::<E>));
    registry.register(
        "callOptionGRPCCompressor",
        call_option_translator(call_grpc_compressor::<E>),
    );
    registry
}

pub(crate) fn builtin_stream_call_option_map_translators<E: Extension>(
) -> Registry<CallOptionMapTranslator<ClientConfig<E>, StreamCallOption>> {
    let mut registry = Registry::new("stream-call-option-map");
    registry.register(
        "streamCallOptionHostPorts",
        call_option_map_translator(stream_call_host_ports::<E>),
    );
    registry.register("streamCallOptionUrls", call_option_map_translator(stream_call_urls::<E>));
    registry.register("streamCallOptionTags", call_option_map_translator(stream_call_tags::<E>));
    registry
}

pub(crate) fn builtin_stream_call_option_translators<E: Extension>(
) -> Registry<CallOptionTranslator<ClientConfig<E>, StreamCallOption>> {
    let mut registry = Registry::new("stream-call-option");
    registry.register(
        "streamCallOptionConnectionTimeout",
        call_option_translator(stream_call_connection_timeout::<E>),
    );
    registry.register(
        "streamCallOptionGRPCCompressor",
        call_option_translator(stream_call_grpc_compressor::<E>),
    );
    registry
}
