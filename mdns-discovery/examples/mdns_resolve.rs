//! mDNS Resolve Example
//!
//! Runs one transaction for a name and prints what the cache and the
//! network return before the transaction ends.
//!
//! # Usage
//!
//! ```
//! cargo run --package mdns-discovery --example mdns_resolve -- --name printer.local
//! cargo run --package mdns-discovery --example mdns_resolve -- --name _ipp._tcp.local --record-type ptr
//! ```

use std::time::Duration;

use clap::Parser;
use mdns_discovery::{
    DnsType, InterfaceSocketFactory, MdnsConfig, MdnsEvent, MdnsService, TransactionFlags,
    TransactionResult,
};

#[derive(Parser, Debug)]
#[command(name = "mDNS Resolve")]
#[command(version = "0.1.0")]
#[command(about = "Resolves a name over multicast DNS")]
struct Args {
    /// Name to resolve
    #[arg(long, default_value = "webrtc-rs-test.local")]
    name: String,

    /// Record type: a, aaaa, ptr, srv, txt or cname
    #[arg(long, default_value = "a", value_parser = parse_type)]
    record_type: DnsType,

    /// Transaction timeout in seconds
    #[arg(long, default_value = "3")]
    timeout: u64,

    /// Stop after the first answer
    #[arg(long)]
    single: bool,

    /// Do not use IPv6 sockets
    #[arg(long)]
    no_ipv6: bool,
}

fn parse_type(s: &str) -> Result<DnsType, String> {
    match s.to_ascii_lowercase().as_str() {
        "a" => Ok(DnsType::A),
        "aaaa" => Ok(DnsType::Aaaa),
        "ptr" => Ok(DnsType::Ptr),
        "srv" => Ok(DnsType::Srv),
        "txt" => Ok(DnsType::Txt),
        "cname" => Ok(DnsType::Cname),
        other => Err(format!("unsupported record type {other}")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = MdnsConfig::default().with_transaction_timeout(Duration::from_secs(args.timeout));
    let mut service = MdnsService::new(config);
    service.start_listening(&InterfaceSocketFactory::new().with_ipv6(!args.no_ipv6))?;

    let mut flags = TransactionFlags::QUERY_CACHE | TransactionFlags::QUERY_NETWORK;
    if args.single {
        flags = flags | TransactionFlags::SINGLE_RESULT;
    }
    let id = service
        .mdns_mut()
        .create_transaction(args.record_type, &args.name, flags);
    service.mdns_mut().start_transaction(id)?;
    log::info!(
        "Resolving '{}' {} (transaction={}, timeout={}s)",
        args.name,
        args.record_type,
        id,
        args.timeout
    );

    let mut answers = 0;
    while service.mdns().is_transaction_active(id) {
        service.drive().await?;

        while let Some(event) = service.poll_event() {
            match event {
                MdnsEvent::TransactionResult(_, TransactionResult::Record(record)) => {
                    answers += 1;
                    println!("{record}");
                }
                MdnsEvent::TransactionResult(_, TransactionResult::Nsec) => {
                    println!("{} has no {} record", args.name, args.record_type);
                }
                MdnsEvent::TransactionResult(_, result) => {
                    log::info!("Transaction finished: {result:?}");
                }
                MdnsEvent::ConnectionError(err) => {
                    log::warn!("{err}");
                }
                _ => {}
            }
        }
    }

    log::info!("{answers} answer(s) for '{}'", args.name);
    service.stop_listening()?;
    Ok(())
}
