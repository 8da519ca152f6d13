//! mDNS Browse Example
//!
//! Follows a service type (or any name) with a listener that keeps its
//! records fresh, printing every change until Ctrl-C.
//!
//! # Usage
//!
//! ```
//! cargo run --package mdns-discovery --example mdns_browse -- --service _http._tcp.local
//! ```

use clap::Parser;
use mdns_discovery::{
    DnsType, InterfaceSocketFactory, MdnsConfig, MdnsEvent, MdnsService, RecordUpdate,
};

#[derive(Parser, Debug)]
#[command(name = "mDNS Browse")]
#[command(version = "0.1.0")]
#[command(about = "Watches PTR records of a DNS-SD service type")]
struct Args {
    /// Service type to browse
    #[arg(long, default_value = "_http._tcp.local")]
    service: String,

    /// Do not re-query before records expire
    #[arg(long)]
    passive: bool,

    /// Do not use IPv6 sockets
    #[arg(long)]
    no_ipv6: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut service = MdnsService::new(MdnsConfig::default());
    service.start_listening(&InterfaceSocketFactory::new().with_ipv6(!args.no_ipv6))?;

    let mdns = service.mdns_mut();
    let listener = mdns.create_listener(DnsType::Ptr, &args.service);
    mdns.start_listener(listener)?;
    mdns.set_active_refresh(listener, !args.passive)?;
    mdns.send_query(DnsType::Ptr, &args.service)?;
    log::info!("Browsing '{}' (listener={listener}), Ctrl-C to stop", args.service);

    loop {
        tokio::select! {
            result = service.drive() => result?,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }

        while let Some(event) = service.poll_event() {
            match event {
                MdnsEvent::RecordUpdate(_, update, record) => {
                    let tag = match update {
                        RecordUpdate::Added => "+",
                        RecordUpdate::Changed => "~",
                        RecordUpdate::Removed => "-",
                    };
                    println!("{tag} {} (ttl {})", record.data(), record.ttl());
                }
                MdnsEvent::NsecRecord(_, name, typ) => {
                    println!("{name} has no {typ} record");
                }
                MdnsEvent::ConnectionError(err) => {
                    log::warn!("{err}");
                }
                MdnsEvent::TransactionResult(..) => {}
            }
        }
    }

    service.stop_listening()?;
    Ok(())
}
