//! Provider adapters against a local HTTP server.

use std::time::Duration;

use mockito::{Matcher, Server};

use btc_lottery::balance::{
    build_lookup, BackoffConfig, BlockchainInfo, Blockstream, Covalent, LookupConfig,
};
use btc_lottery::{Address, BalanceError, BalanceLookup, ProviderKind};

const ADDRESS: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";

fn address() -> Address {
    ADDRESS.parse().unwrap()
}

fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[test]
fn blockchain_info_requests_rawaddr_without_transactions() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", format!("/rawaddr/{}", ADDRESS).as_str())
        .match_query(Matcher::UrlEncoded("limit".into(), "0".into()))
        .with_status(200)
        .with_body(r#"{"address":"1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH","final_balance":150000000}"#)
        .create();

    let provider = BlockchainInfo::new(client(), Some(server.url()));
    assert_eq!(provider.lookup_balance(&address()).unwrap(), 1.5);
    mock.assert();
}

#[test]
fn blockstream_reads_chain_stats() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", format!("/api/address/{}", ADDRESS).as_str())
        .with_status(200)
        .with_body(r#"{"chain_stats":{"funded_txo_sum":250000000,"spent_txo_sum":50000000}}"#)
        .create();

    let provider = Blockstream::new(client(), Some(format!("{}/api/", server.url())));
    assert_eq!(provider.lookup_balance(&address()).unwrap(), 2.0);
    mock.assert();
}

#[test]
fn blockstream_server_error_keeps_status() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", format!("/address/{}", ADDRESS).as_str())
        .with_status(503)
        .with_body("Service Unavailable")
        .create();

    let provider = Blockstream::new(client(), Some(server.url()));
    let err = provider.lookup_balance(&address()).unwrap_err();
    assert_eq!(
        err,
        BalanceError::Status {
            status: 503,
            body: "Service Unavailable".into()
        }
    );
    assert!(err.is_transient());
    mock.assert();
}

#[test]
fn covalent_sends_key_as_basic_auth_user() {
    let mut server = Server::new();
    let mock = server
        .mock(
            "GET",
            format!("/v1/btc-mainnet/address/{}/balances_v2/", ADDRESS).as_str(),
        )
        // base64("ckey_x:")
        .match_header("authorization", "Basic Y2tleV94Og==")
        .with_status(200)
        .with_body(r#"{"data":{"items":[{"balance":"150000000"}]},"error":false}"#)
        .create();

    let provider = Covalent::new(client(), Some(server.url()), "ckey_x".into());
    assert_eq!(provider.lookup_balance(&address()).unwrap(), 1.5);
    mock.assert();
}

#[test]
fn covalent_rejected_key_is_unauthorized() {
    let mut server = Server::new();
    let mock = server
        .mock(
            "GET",
            format!("/v1/btc-mainnet/address/{}/balances_v2/", ADDRESS).as_str(),
        )
        .with_status(401)
        .with_body(r#"{"error":true,"error_message":"Invalid API key"}"#)
        .create();

    let provider = Covalent::new(client(), Some(server.url()), "ckey_wrong".into());
    assert_eq!(
        provider.lookup_balance(&address()).unwrap_err(),
        BalanceError::Unauthorized(401)
    );
    mock.assert();
}

fn lookup_config(server: &Server, kind: ProviderKind, attempts: u32) -> LookupConfig {
    LookupConfig {
        kind,
        api_key: None,
        base_url: Some(server.url()),
        timeout: Duration::from_secs(5),
        backoff: BackoffConfig::immediate(attempts),
    }
}

#[test]
fn built_lookup_retries_server_errors() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", format!("/address/{}", ADDRESS).as_str())
        .with_status(502)
        .expect(3)
        .create();

    let lookup = build_lookup(&lookup_config(&server, ProviderKind::Blockstream, 3)).unwrap();
    assert!(matches!(
        lookup.lookup_balance(&address()),
        Err(BalanceError::Status { status: 502, .. })
    ));
    mock.assert();
}

#[test]
fn built_lookup_does_not_retry_rejections() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", format!("/rawaddr/{}", ADDRESS).as_str())
        .match_query(Matcher::Any)
        .with_status(403)
        .expect(1)
        .create();

    let lookup = build_lookup(&lookup_config(&server, ProviderKind::Auto, 3)).unwrap();
    assert_eq!(
        lookup.lookup_balance(&address()).unwrap_err(),
        BalanceError::Unauthorized(403)
    );
    mock.assert();
}
