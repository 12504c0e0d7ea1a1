use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use mockito::{mock, Matcher};
use serde::{Deserialize, Serialize};

use optionloader::client::config::{CallOpt, Connection, IdleSettings};
use optionloader::client::{ClientOption, StreamOption};
use optionloader::option::{EndpointBasicInfo, Protocol, Tag};
use optionloader::retry::{BackOffPolicy, FailurePolicy, StopPolicy};
use optionloader::server::ServerOption;
use optionloader::store::ConsulOptions;
use optionloader::{
    ClientConfig, ClientLoader, ClientLoaderOptions, ConfigFormat, FetchError, LoadError, Reader,
    ReaderError, ReaderOptions, ServerConfig, ServerLoader, ServerLoaderOptions,
};

fn consul() -> ConsulOptions {
    ConsulOptions {
        address: mockito::server_url(),
        ..ConsulOptions::default()
    }
}

fn kv_path(key: &str) -> Matcher {
    Matcher::Regex(format!(r"^/v1/kv/{}(\?.*)?$", key))
}

fn client_loader(client: &str, server: &str) -> ClientLoader {
    let reader = Reader::consul(consul(), ReaderOptions::default()).unwrap();
    ClientLoader::new(client, server, reader, ClientLoaderOptions::default())
}

#[tokio::test]
async fn client_options_from_consul() {
    let _m = mock("GET", kv_path("KitexConfig/it-caller/it-echo"))
        .match_query(Matcher::UrlEncoded("dc".into(), "dc1".into()))
        .with_status(200)
        .with_body(r#"{"HostPorts": ["127.0.0.1:8888"]}"#)
        .create();

    let loader = client_loader("it-caller", "it-echo");
    loader.load().await.unwrap();

    assert_eq!(
        loader.suite().unwrap().options(),
        vec![ClientOption::HostPorts(vec!["127.0.0.1:8888".into()])]
    );
    assert!(loader.stream_suite().unwrap().is_empty());
    assert!(loader.call_options().unwrap().is_empty());
}

#[tokio::test]
async fn token_is_sent() {
    let _m = mock("GET", kv_path("KitexConfig/it-token"))
        .match_header("X-Consul-Token", "secret")
        .with_status(200)
        .with_body(r#"{"ExitWaitTime": "2s"}"#)
        .create();

    let options = ConsulOptions {
        token: "secret".into(),
        ..consul()
    };
    let reader = Reader::consul(options, ReaderOptions::default()).unwrap();
    let loader: ServerLoader = ServerLoader::new("it-token", reader, ServerLoaderOptions::default());
    loader.load().await.unwrap();
    assert_eq!(
        loader.suite().unwrap().options(),
        vec![ServerOption::ExitWaitTime(Duration::from_secs(2))]
    );
}

#[tokio::test]
async fn missing_key_is_reported() {
    let _m = mock("GET", kv_path("KitexConfig/it-nobody/it-missing"))
        .with_status(404)
        .create();

    let loader = client_loader("it-nobody", "it-missing");
    let err = loader.load().await.unwrap_err();
    assert!(matches!(
        err,
        LoadError::Reader(ReaderError::Fetch {
            source: FetchError::KeyNotFound(_),
            ..
        })
    ));
    assert!(matches!(loader.suite(), Err(LoadError::NotLoaded)));
}

#[tokio::test]
async fn failed_fetch_keeps_previous_suite() {
    let ok = mock("GET", kv_path("KitexConfig/it-caller/it-flaky"))
        .with_status(200)
        .with_body(r#"{"DestService": "flaky", "RPCTimeout": "1s"}"#)
        .create();

    let loader = client_loader("it-caller", "it-flaky");
    loader.load().await.unwrap();
    let before = loader.suite().unwrap();
    drop(ok);

    let _broken = mock("GET", kv_path("KitexConfig/it-caller/it-flaky"))
        .with_status(500)
        .create();
    let err = loader.load().await.unwrap_err();
    assert!(matches!(
        err,
        LoadError::Reader(ReaderError::Fetch {
            source: FetchError::HttpStatus { status: 500, .. },
            ..
        })
    ));
    assert_eq!(loader.suite().unwrap(), before);
    assert_eq!(before.len(), 2);
}

#[tokio::test]
async fn undecodable_blob_keeps_previous_suite() {
    let ok = mock("GET", kv_path("KitexConfig/it-caller/it-garbled"))
        .with_status(200)
        .with_body(r#"{"DestService": "garbled"}"#)
        .create();
    let loader = client_loader("it-caller", "it-garbled");
    loader.load().await.unwrap();
    drop(ok);

    let _bad = mock("GET", kv_path("KitexConfig/it-caller/it-garbled"))
        .with_status(200)
        .with_body(r#"{"DestService": "#)
        .create();
    assert!(matches!(
        loader.load().await,
        Err(LoadError::Reader(ReaderError::Decode { .. }))
    ));
    assert_eq!(
        loader.suite().unwrap().options(),
        vec![ClientOption::DestService("garbled".into())]
    );
}

#[tokio::test]
async fn failing_translator_does_not_abort_load() {
    let _m = mock("GET", kv_path("KitexConfig/it-caller/it-partial"))
        .with_status(200)
        .with_body(
            r#"{
                "HostPorts": ["10.0.0.1:80"],
                "Protocol": "carrier-pigeon",
                "ConnectionTimeout": "50x",
                "StatsLevel": 2,
                "Stream": {"Tags": [{"Key": "k", "Value": "v"}]}
            }"#,
        )
        .create();

    let loader = client_loader("it-caller", "it-partial");
    loader.load().await.unwrap();
    assert_eq!(
        loader.suite().unwrap().options(),
        vec![
            ClientOption::HostPorts(vec!["10.0.0.1:80".into()]),
            ClientOption::StatsLevel(optionloader::option::StatsLevel::Detailed),
        ]
    );
    assert_eq!(
        loader.stream_suite().unwrap().options(),
        vec![StreamOption::Tag {
            key: "k".into(),
            value: "v".into(),
        }]
    );
}

#[tokio::test]
async fn registered_translator_replaces_builtin() {
    let _m = mock("GET", kv_path("KitexConfig/it-caller/it-override"))
        .with_status(200)
        .with_body(r#"{"HostPorts": ["10.0.0.1:80"], "DestService": "override"}"#)
        .create();

    let loader = client_loader("it-caller", "it-override");
    loader.load().await.unwrap();
    assert_eq!(loader.suite().unwrap().len(), 2);

    loader.register_translator("hostPorts", |config: &ClientConfig| {
        Ok(config
            .host_ports
            .iter()
            .flatten()
            .map(|hp| ClientOption::HostPorts(vec![format!("override-{}", hp)]))
            .collect())
    });
    loader.load().await.unwrap();
    assert_eq!(
        loader.suite().unwrap().options(),
        vec![
            ClientOption::HostPorts(vec!["override-10.0.0.1:80".into()]),
            ClientOption::DestService("override".into()),
        ]
    );
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Team {
    #[serde(rename = "Owner")]
    owner: String,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Owner: {}", self.owner)
    }
}

#[tokio::test]
async fn populated_document_survives_the_wire() {
    let mut call_hosts = BTreeMap::new();
    call_hosts.insert("primary".to_string(), "10.0.0.2:80".to_string());
    let mut cfg_items = BTreeMap::new();
    cfg_items.insert("fix_ms".to_string(), 20.0);

    let document: ClientConfig<Team> = ClientConfig {
        client_basic_info: Some(EndpointBasicInfo {
            service_name: "it-caller".into(),
            method: "Echo".into(),
            tags: BTreeMap::new(),
        }),
        host_ports: Some(vec!["10.0.0.1:80".into()]),
        dest_service: Some("it-roundtrip".into()),
        protocol: Some("TTHeader".into()),
        connection: Some(Connection {
            method: "LongConnection".into(),
            long_connection: IdleSettings {
                min_idle_per_address: 1,
                max_idle_per_address: 4,
                max_idle_global: 16,
                max_idle_timeout: "1m".into(),
            },
            ..Connection::default()
        }),
        failure_retry: Some(FailurePolicy {
            stop_policy: StopPolicy {
                max_retry_times: 2,
                ..StopPolicy::default()
            },
            back_off_policy: Some(BackOffPolicy {
                back_off_type: "fixed".into(),
                cfg_items,
            }),
            ..FailurePolicy::default()
        }),
        rpc_timeout: Some("3s".into()),
        tags: Some(vec![Tag {
            key: "cluster".into(),
            value: "a".into(),
        }]),
        stats_level: Some(1),
        call_opt: Some(CallOpt {
            host_ports: Some(call_hosts),
            http_host: Some("example.com".into()),
            ..CallOpt::default()
        }),
        my_config: Some(Team {
            owner: "infra".into(),
        }),
        ..ClientConfig::default()
    };

    let _m = mock("GET", kv_path("KitexConfig/it-caller/it-roundtrip"))
        .with_status(200)
        .with_body(serde_json::to_string(&document).unwrap())
        .create();

    let reader = Reader::consul(consul(), ReaderOptions::default()).unwrap();
    let loader: ClientLoader<Team> =
        ClientLoader::new("it-caller", "it-roundtrip", reader, ClientLoaderOptions::default());
    loader.load().await.unwrap();

    assert_eq!(loader.config().await.unwrap(), document);
    let suite = loader.suite().unwrap();
    assert_eq!(suite.len(), 9);
    assert!(suite
        .iter()
        .any(|opt| *opt == ClientOption::TransportProtocol(Protocol::TTHeader)));
    assert_eq!(
        loader.call_option("callOptionHTTPHost").unwrap(),
        Some(optionloader::client::CallOption::HttpHost("example.com".into()))
    );
    assert!(document.to_string().ends_with("Owner: infra\n"));
}

#[tokio::test]
async fn server_yaml_document() {
    let _m = mock("GET", kv_path("KitexConfig/it-yaml-server"))
        .with_status(200)
        .with_body("MuxTransport: true\nServiceAddr:\n  - network: tcp\n    address: 127.0.0.1:9999\n")
        .create();

    let options = ReaderOptions {
        format: ConfigFormat::Yaml,
        ..ReaderOptions::default()
    };
    let reader = Reader::consul(consul(), options).unwrap();
    let loader: ServerLoader = ServerLoader::new("it-yaml-server", reader, ServerLoaderOptions::default());
    loader.load().await.unwrap();

    let config: ServerConfig = loader.config().await.unwrap();
    assert_eq!(config.mux_transport, Some(true));
    assert_eq!(
        loader.suite().unwrap().options(),
        vec![
            ServerOption::ServiceAddr(optionloader::server::ServiceAddr::Tcp(
                "127.0.0.1:9999".parse().unwrap()
            )),
            ServerOption::MuxTransport,
        ]
    );
}

#[tokio::test]
async fn slow_agent_times_out() {
    // Accepts connections into the backlog but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let options = ConsulOptions {
        address: listener.local_addr().unwrap().to_string(),
        ..ConsulOptions::default()
    };
    let reader = Reader::consul(
        options,
        ReaderOptions {
            timeout: Some(Duration::from_millis(200)),
            ..ReaderOptions::default()
        },
    )
    .unwrap();
    let loader: ServerLoader = ServerLoader::new("it-slow", reader, ServerLoaderOptions::default());

    let err = loader.load().await.unwrap_err();
    assert!(matches!(
        err,
        LoadError::Reader(ReaderError::Fetch {
            source: FetchError::Timeout,
            ..
        })
    ));
    drop(listener);
}
