use std::time::Duration;

use assessd::Args;
use clap::Parser;

#[test]
fn zero_retention_is_rejected() {
    assert!(Args::try_parse_from(["test", "--retention", "0"]).is_err());
}

#[test]
fn retention_flag_overrides_default() {
    let args = Args::parse_from(["test", "--retention", "50"]);
    assert_eq!(args.retention.get(), 50);
}

#[test]
fn blank_api_key_means_no_chat_config() {
    let args = Args::parse_from(["test", "--api-key", "   "]);
    assert!(args.chat_config().is_none());
}

#[test]
fn chat_config_follows_flags() {
    let args = Args::parse_from([
        "test",
        "--api-key",
        "k",
        "--api-url",
        "http://llm/chat",
        "--model",
        "small",
        "--max-tokens",
        "64",
        "--timeout-secs",
        "5",
    ]);
    let config = args.chat_config().unwrap();
    assert_eq!(config.api_key, "k");
    assert_eq!(config.url, "http://llm/chat");
    assert_eq!(config.model, "small");
    assert_eq!(config.max_tokens, 64);
    assert_eq!(config.timeout, Duration::from_secs(5));
}

#[test]
fn addr_joins_host_and_port() {
    let args = Args::parse_from(["test", "--host", "127.0.0.1", "--port", "9000"]);
    assert_eq!(args.addr(), "127.0.0.1:9000");
}
