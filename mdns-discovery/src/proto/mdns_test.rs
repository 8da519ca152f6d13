use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use sansio::Protocol;

use super::*;
use crate::message::{DNSCLASS_CACHE_FLUSH, DnsClass, build_response};
use crate::record::NsecData;

fn a_record(name: &str, ip: [u8; 4], ttl: u32, now: Instant) -> ResourceRecord {
    ResourceRecord::new(
        name,
        DnsClass(DNSCLASS_INET.0 | DNSCLASS_CACHE_FLUSH),
        ttl,
        now,
        RecordData::A(Ipv4Addr::from(ip)),
    )
}

fn nsec_record(name: &str, types: &[DnsType], now: Instant) -> ResourceRecord {
    ResourceRecord::new(
        name,
        DnsClass(DNSCLASS_INET.0 | DNSCLASS_CACHE_FLUSH),
        120,
        now,
        RecordData::Nsec(NsecData::new(name, types)),
    )
}

fn response(records: &[ResourceRecord], now: Instant) -> TaggedBytesMut {
    let raw = build_response(0, records, &[]).expect("records should encode");
    TransportMessage {
        now,
        transport: TransportContext::default(),
        message: BytesMut::from(&raw[..]),
    }
}

fn drain_events(mdns: &mut Mdns) -> Vec<MdnsEvent> {
    std::iter::from_fn(|| mdns.poll_event()).collect()
}

fn drain_writes(mdns: &mut Mdns) -> Vec<TaggedBytesMut> {
    std::iter::from_fn(|| mdns.poll_write()).collect()
}

fn started_listener(mdns: &mut Mdns, typ: DnsType, name: &str) -> ListenerId {
    let id = mdns.create_listener(typ, name);
    mdns.start_listener(id).expect("listener should start");
    id
}

#[test]
fn test_listener_sees_cache_transitions() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = started_listener(&mut mdns, DnsType::A, "Host.local");

    let first = a_record("host.local", [192, 168, 1, 2], 120, now);
    mdns.handle_read(response(&[first.clone()], now))?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::RecordUpdate(id, RecordUpdate::Added, first.clone())]
    );

    // Same data again: no event.
    let later = now + Duration::from_secs(1);
    mdns.handle_read(response(&[a_record("host.local", [192, 168, 1, 2], 120, later)], later))?;
    assert!(drain_events(&mut mdns).is_empty());

    let moved = a_record("host.local", [192, 168, 1, 3], 120, later);
    mdns.handle_read(response(&[moved.clone()], later))?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::RecordUpdate(id, RecordUpdate::Changed, moved)]
    );

    let goodbye = a_record("host.local", [192, 168, 1, 3], 0, later);
    mdns.handle_read(response(&[goodbye.clone()], later))?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::RecordUpdate(id, RecordUpdate::Removed, goodbye)]
    );
    assert!(mdns.lookup(Some(DnsType::A), "host.local", later).is_empty());

    Ok(())
}

#[test]
fn test_listener_misuse_is_reported() {
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = started_listener(&mut mdns, DnsType::A, "host.local");

    assert_eq!(
        mdns.start_listener(id),
        Err(Error::ErrListenerAlreadyStarted(id))
    );
    assert_eq!(mdns.remove_listener(id), Ok(()));
    assert_eq!(mdns.remove_listener(id), Err(Error::ErrUnknownListener(id)));
    assert_eq!(mdns.start_listener(99), Err(Error::ErrUnknownListener(99)));
    assert_eq!(
        mdns.set_active_refresh(99, true),
        Err(Error::ErrUnknownListener(99))
    );
}

#[test]
fn test_unstarted_listener_gets_nothing() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = mdns.create_listener(DnsType::A, "host.local");
    assert!(!mdns.is_listener_started(id));

    mdns.handle_read(response(&[a_record("host.local", [10, 0, 0, 1], 120, now)], now))?;
    assert!(drain_events(&mut mdns).is_empty());
    assert_eq!(mdns.cache().len(), 1);
    Ok(())
}

#[test]
fn test_removed_listener_key_is_purged_later() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let first = started_listener(&mut mdns, DnsType::A, "host.local");
    let second = started_listener(&mut mdns, DnsType::A, "HOST.local");
    assert_eq!(mdns.registry.len(), 1);

    mdns.remove_listener(first)?;
    mdns.remove_listener(second)?;
    // The empty entry survives until the next loop iteration.
    assert_eq!(mdns.registry.len(), 1);

    mdns.handle_read(response(&[a_record("host.local", [10, 0, 0, 1], 120, now)], now))?;
    assert!(mdns.registry.is_empty());
    assert!(drain_events(&mut mdns).is_empty());
    Ok(())
}

#[test]
fn test_every_listener_on_a_key_is_alerted() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let first = started_listener(&mut mdns, DnsType::A, "host.local");
    let second = started_listener(&mut mdns, DnsType::A, "host.local");
    let other = started_listener(&mut mdns, DnsType::Aaaa, "host.local");

    let record = a_record("host.local", [10, 0, 0, 1], 120, now);
    mdns.handle_read(response(&[record.clone()], now))?;
    let events = drain_events(&mut mdns);
    assert_eq!(
        events,
        vec![
            MdnsEvent::RecordUpdate(first, RecordUpdate::Added, record.clone()),
            MdnsEvent::RecordUpdate(second, RecordUpdate::Added, record),
        ]
    );
    assert!(!events.iter().any(|e| matches!(e, MdnsEvent::RecordUpdate(id, _, _) if *id == other)));
    Ok(())
}

#[test]
fn test_queries_and_garbage_are_dropped() -> Result<()> {
    let mut mdns = Mdns::new(MdnsConfig::default());
    started_listener(&mut mdns, DnsType::A, "host.local");

    let query = crate::message::build_query(Some(1), "host.local", DnsType::A)?;
    for payload in [&query[..], &[0xde, 0xad][..]] {
        mdns.handle_read(TransportMessage {
            now: Instant::now(),
            transport: TransportContext::default(),
            message: BytesMut::from(payload),
        })?;
    }
    assert!(drain_events(&mut mdns).is_empty());
    assert!(mdns.cache().is_empty());
    Ok(())
}

#[test]
fn test_non_in_records_are_ignored() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    started_listener(&mut mdns, DnsType::A, "host.local");

    let chaos = ResourceRecord::new(
        "host.local",
        DnsClass(3 | DNSCLASS_CACHE_FLUSH),
        120,
        now,
        RecordData::A(Ipv4Addr::new(10, 0, 0, 1)),
    );
    mdns.handle_read(response(&[chaos], now))?;
    assert!(drain_events(&mut mdns).is_empty());
    assert!(mdns.cache().is_empty());
    Ok(())
}

#[test]
fn test_repeated_key_in_one_packet_alerts_once() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = started_listener(&mut mdns, DnsType::A, "host.local");

    let first = a_record("host.local", [10, 0, 0, 1], 120, now);
    let second = a_record("host.local", [10, 0, 0, 2], 120, now);
    mdns.handle_read(response(&[first, second.clone()], now))?;

    // Classified by the first occurrence, reported with what the cache now
    // holds.
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::RecordUpdate(id, RecordUpdate::Added, second)]
    );
    Ok(())
}

#[test]
fn test_goodbye_later_in_packet_wins() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = started_listener(&mut mdns, DnsType::A, "host.local");
    mdns.set_active_refresh(id, true)?;

    mdns.handle_read(response(&[a_record("host.local", [10, 0, 0, 1], 120, now)], now))?;
    drain_events(&mut mdns);

    // The change is undone by the goodbye right behind it. The repeated
    // goodbye finds nothing left to remove.
    let moved = a_record("host.local", [10, 0, 0, 2], 120, now);
    let goodbye = a_record("host.local", [10, 0, 0, 2], 0, now);
    mdns.handle_read(response(&[moved, goodbye.clone(), goodbye.clone()], now))?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::RecordUpdate(id, RecordUpdate::Removed, goodbye)]
    );
    assert!(mdns.cache().is_empty());
    assert_eq!(mdns.poll_timeout(), None);
    Ok(())
}

#[test]
fn test_record_after_goodbye_in_packet_wins() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = started_listener(&mut mdns, DnsType::A, "host.local");

    mdns.handle_read(response(&[a_record("host.local", [10, 0, 0, 1], 120, now)], now))?;
    drain_events(&mut mdns);

    let goodbye = a_record("host.local", [10, 0, 0, 1], 0, now);
    let back = a_record("host.local", [10, 0, 0, 3], 120, now);
    mdns.handle_read(response(&[goodbye, back.clone()], now))?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::RecordUpdate(id, RecordUpdate::Added, back)]
    );
    assert_eq!(mdns.cache().len(), 1);
    Ok(())
}

#[test]
fn test_expiry_cleanup() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = started_listener(&mut mdns, DnsType::A, "host.local");
    assert_eq!(mdns.poll_timeout(), None);

    let record = a_record("host.local", [10, 0, 0, 1], 10, now);
    mdns.handle_read(response(&[record.clone()], now))?;
    drain_events(&mut mdns);

    let deadline = now + Duration::from_secs(10);
    assert_eq!(mdns.poll_timeout(), Some(deadline));

    mdns.handle_timeout(deadline - Duration::from_millis(1))?;
    assert!(drain_events(&mut mdns).is_empty());

    mdns.handle_timeout(deadline)?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::RecordUpdate(id, RecordUpdate::Removed, record)]
    );
    assert!(mdns.cache().is_empty());
    assert_eq!(mdns.poll_timeout(), None);
    Ok(())
}

#[test]
fn test_overfilled_cache_evicts_immediately() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default().with_cache_entry_limit(2));
    let id = started_listener(&mut mdns, DnsType::A, "b.local");

    let a = a_record("a.local", [10, 0, 0, 1], 300, now);
    let b = a_record("b.local", [10, 0, 0, 2], 100, now);
    let c = a_record("c.local", [10, 0, 0, 3], 200, now);
    mdns.handle_read(response(&[a, b.clone(), c], now))?;
    drain_events(&mut mdns);

    assert_eq!(mdns.poll_timeout(), Some(now));
    mdns.handle_timeout(now)?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::RecordUpdate(id, RecordUpdate::Removed, b)]
    );
    assert_eq!(mdns.cache().len(), 2);
    Ok(())
}

#[test]
fn test_active_refresh_queries() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = started_listener(&mut mdns, DnsType::A, "host.local");
    mdns.set_active_refresh(id, true)?;

    mdns.handle_read(response(&[a_record("host.local", [10, 0, 0, 1], 100, now)], now))?;
    drain_events(&mut mdns);
    assert!(drain_writes(&mut mdns).is_empty());

    assert_eq!(mdns.poll_timeout(), Some(now + Duration::from_secs(85)));
    mdns.handle_timeout(now + Duration::from_secs(85))?;
    let writes = drain_writes(&mut mdns);
    assert_eq!(writes.len(), 1);
    assert_eq!(
        &writes[0].message[..],
        &crate::message::build_query(Some(0), "host.local", DnsType::A)?[..]
    );
    assert_eq!(writes[0].transport.peer_addr, crate::MDNS_DEST_ADDR);

    assert_eq!(mdns.poll_timeout(), Some(now + Duration::from_secs(95)));
    mdns.handle_timeout(now + Duration::from_secs(95))?;
    assert_eq!(drain_writes(&mut mdns).len(), 1);

    // Only the expiry cleanup is left.
    assert_eq!(mdns.poll_timeout(), Some(now + Duration::from_secs(100)));
    assert!(drain_events(&mut mdns).is_empty());
    Ok(())
}

#[test]
fn test_shared_key_refreshes_once() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    for _ in 0..2 {
        let id = started_listener(&mut mdns, DnsType::A, "host.local");
        mdns.set_active_refresh(id, true)?;
    }

    mdns.handle_read(response(&[a_record("host.local", [10, 0, 0, 1], 100, now)], now))?;
    drain_events(&mut mdns);

    mdns.handle_timeout(now + Duration::from_secs(85))?;
    assert_eq!(drain_writes(&mut mdns).len(), 1);
    mdns.handle_timeout(now + Duration::from_secs(95))?;
    assert_eq!(drain_writes(&mut mdns).len(), 1);
    Ok(())
}

#[test]
fn test_removing_listener_cancels_refresh() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = started_listener(&mut mdns, DnsType::A, "host.local");
    mdns.set_active_refresh(id, true)?;
    mdns.handle_read(response(&[a_record("host.local", [10, 0, 0, 1], 100, now)], now))?;

    mdns.remove_listener(id)?;
    mdns.handle_timeout(now + Duration::from_secs(96))?;
    assert!(drain_writes(&mut mdns).is_empty());
    Ok(())
}

#[test]
fn test_cache_hit_transaction_skips_network() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let record = a_record("printer.local", [10, 0, 0, 7], 120, now);
    mdns.handle_read(response(&[record.clone()], now))?;

    let id = mdns.create_transaction(
        DnsType::A,
        "printer.local",
        TransactionFlags::QUERY_CACHE
            | TransactionFlags::QUERY_NETWORK
            | TransactionFlags::SINGLE_RESULT,
    );
    assert!(mdns.is_transaction_active(id));
    mdns.start_transaction(id)?;

    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::TransactionResult(
            id,
            TransactionResult::Record(record)
        )]
    );
    assert!(drain_writes(&mut mdns).is_empty());
    assert!(!mdns.is_transaction_active(id));
    assert!(!mdns.cancel_transaction(id));
    Ok(())
}

#[test]
fn test_cache_only_transaction_streams_then_finishes() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let office = ResourceRecord::new(
        "_ipp._tcp.local",
        DNSCLASS_INET,
        4500,
        now,
        RecordData::Ptr("office._ipp._tcp.local".to_owned()),
    );
    let lab = ResourceRecord::new(
        "_ipp._tcp.local",
        DNSCLASS_INET,
        4500,
        now,
        RecordData::Ptr("lab._ipp._tcp.local".to_owned()),
    );
    mdns.handle_read(response(&[office.clone(), lab.clone()], now))?;

    let id = mdns.create_transaction(DnsType::Ptr, "_ipp._tcp.local", TransactionFlags::QUERY_CACHE);
    mdns.start_transaction(id)?;

    // Cache order is by key, so "lab" sorts before "office".
    assert_eq!(
        drain_events(&mut mdns),
        vec![
            MdnsEvent::TransactionResult(id, TransactionResult::Record(lab)),
            MdnsEvent::TransactionResult(id, TransactionResult::Record(office)),
            MdnsEvent::TransactionResult(id, TransactionResult::Done),
        ]
    );
    assert!(!mdns.is_transaction_active(id));
    assert_eq!(mdns.poll_timeout(), Some(now + Duration::from_secs(4500)));
    Ok(())
}

#[test]
fn test_cache_only_transaction_without_results() -> Result<()> {
    let mut mdns = Mdns::new(MdnsConfig::default());

    let single = mdns.create_transaction(
        DnsType::A,
        "nobody.local",
        TransactionFlags::QUERY_CACHE | TransactionFlags::SINGLE_RESULT,
    );
    mdns.start_transaction(single)?;
    let streaming = mdns.create_transaction(DnsType::A, "nobody.local", TransactionFlags::QUERY_CACHE);
    mdns.start_transaction(streaming)?;

    assert_eq!(
        drain_events(&mut mdns),
        vec![
            MdnsEvent::TransactionResult(single, TransactionResult::NoResults),
            MdnsEvent::TransactionResult(streaming, TransactionResult::Done),
        ]
    );
    assert!(drain_writes(&mut mdns).is_empty());
    Ok(())
}

#[test]
fn test_transaction_misuse_is_reported() -> Result<()> {
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = mdns.create_transaction(DnsType::A, "host.local", TransactionFlags::QUERY_NETWORK);
    mdns.start_transaction(id)?;
    assert_eq!(
        mdns.start_transaction(id),
        Err(Error::ErrTransactionAlreadyStarted(id))
    );
    assert_eq!(
        mdns.start_transaction(42),
        Err(Error::ErrUnknownTransaction(42))
    );
    Ok(())
}

#[test]
fn test_network_transaction_streams_until_timeout() -> Result<()> {
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = mdns.create_transaction(DnsType::Aaaa, "host.local", TransactionFlags::QUERY_NETWORK);
    mdns.start_transaction(id)?;
    assert_eq!(drain_writes(&mut mdns).len(), 1);

    let now = Instant::now();
    let record = ResourceRecord::new(
        "host.local",
        DNSCLASS_INET,
        120,
        now,
        RecordData::Aaaa(Ipv6Addr::LOCALHOST),
    );
    mdns.handle_read(response(&[record.clone()], now))?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::TransactionResult(
            id,
            TransactionResult::Record(record)
        )]
    );
    assert!(mdns.is_transaction_active(id));

    mdns.handle_timeout(Instant::now() + Duration::from_secs(4))?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::TransactionResult(id, TransactionResult::Done)]
    );
    assert!(!mdns.is_transaction_active(id));
    assert!(mdns.listeners.is_empty());
    Ok(())
}

#[test]
fn test_cancelled_transaction_is_silent() -> Result<()> {
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = mdns.create_transaction(DnsType::A, "host.local", TransactionFlags::QUERY_NETWORK);
    mdns.start_transaction(id)?;
    assert!(mdns.cancel_transaction(id));
    assert_eq!(mdns.poll_timeout(), None);

    let now = Instant::now();
    mdns.handle_read(response(&[a_record("host.local", [10, 0, 0, 1], 120, now)], now))?;
    mdns.handle_timeout(now + Duration::from_secs(10))?;
    assert!(drain_events(&mut mdns).is_empty());
    Ok(())
}

#[test]
fn test_transaction_cache_nsec() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    mdns.handle_read(response(&[nsec_record("host.local", &[DnsType::A], now)], now))?;

    let id = mdns.create_transaction(
        DnsType::Aaaa,
        "host.local",
        TransactionFlags::QUERY_CACHE | TransactionFlags::QUERY_NETWORK,
    );
    mdns.start_transaction(id)?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::TransactionResult(id, TransactionResult::Nsec)]
    );
    assert!(drain_writes(&mut mdns).is_empty());
    assert!(!mdns.is_transaction_active(id));
    Ok(())
}

#[test]
fn test_network_transaction_nsec() -> Result<()> {
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = mdns.create_transaction(
        DnsType::Srv,
        "web._http._tcp.local",
        TransactionFlags::QUERY_NETWORK,
    );
    mdns.start_transaction(id)?;

    let now = Instant::now();
    mdns.handle_read(response(
        &[nsec_record("web._http._tcp.local", &[DnsType::Txt], now)],
        now,
    ))?;
    assert_eq!(
        drain_events(&mut mdns),
        vec![MdnsEvent::TransactionResult(id, TransactionResult::Nsec)]
    );
    assert!(!mdns.is_transaction_active(id));
    Ok(())
}

#[test]
fn test_connection_error_event() -> Result<()> {
    let mut mdns = Mdns::new(MdnsConfig::default());
    let err = ConnectionError {
        local_addr: "0.0.0.0:5353".parse().expect("valid address"),
        kind: io::ErrorKind::NetworkDown,
    };
    mdns.handle_event(err)?;
    assert_eq!(drain_events(&mut mdns), vec![MdnsEvent::ConnectionError(err)]);
    Ok(())
}

#[test]
fn test_close() -> Result<()> {
    let now = Instant::now();
    let mut mdns = Mdns::new(MdnsConfig::default());
    let id = started_listener(&mut mdns, DnsType::A, "host.local");
    mdns.handle_read(response(&[a_record("host.local", [10, 0, 0, 1], 120, now)], now))?;
    mdns.send_query(DnsType::A, "host.local")?;

    mdns.close()?;
    assert!(mdns.is_closed());
    assert!(mdns.cache().is_empty());
    assert!(mdns.poll_event().is_none());
    assert!(mdns.poll_write().is_none());
    assert_eq!(mdns.poll_timeout(), None);
    assert!(!mdns.is_listener_started(id));

    assert_eq!(
        mdns.handle_read(response(&[], now)),
        Err(Error::ErrConnectionClosed)
    );
    assert_eq!(mdns.handle_timeout(now), Err(Error::ErrConnectionClosed));
    assert_eq!(
        mdns.send_query(DnsType::A, "host.local"),
        Err(Error::ErrConnectionClosed)
    );
    Ok(())
}
