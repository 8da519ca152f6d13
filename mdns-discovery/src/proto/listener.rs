use std::time::{Duration, Instant};

use crate::cache::UpdateType;
use crate::config::REFRESH_PERMILLE;
use crate::message::DnsType;
use crate::record::ResourceRecord;

use super::{RecordUpdate, TransactionId};

/// Unique identifier of a listener created with
/// [`Mdns::create_listener()`](super::Mdns::create_listener).
pub type ListenerId = u64;

// Who receives what a listener observes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ListenerOwner {
    // Delivered to the application as MdnsEvent.
    Caller,
    // Feeds the network half of a transaction.
    Transaction(TransactionId),
}

// Registry key: listeners are found by lower-cased name and type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ListenerKey {
    pub(crate) name: String,
    pub(crate) typ: DnsType,
}

impl ListenerKey {
    pub(crate) fn new(name: &str, typ: DnsType) -> Self {
        Self {
            name: name.trim_end_matches('.').to_ascii_lowercase(),
            typ,
        }
    }
}

/// A standing subscription to one (name, type).
#[derive(Debug)]
pub(crate) struct Listener {
    pub(crate) typ: DnsType,
    pub(crate) name: String,
    pub(crate) owner: ListenerOwner,
    pub(crate) started: bool,
    active_refresh: bool,
    // ttl and creation time of the last record seen.
    last_update: Option<(u32, Instant)>,
    // Pending refresh deadlines, earliest first.
    refreshes: Vec<Instant>,
}

impl Listener {
    pub(crate) fn new(typ: DnsType, name: &str, owner: ListenerOwner) -> Self {
        Self {
            typ,
            name: name.trim_end_matches('.').to_owned(),
            owner,
            started: false,
            active_refresh: false,
            last_update: None,
            refreshes: vec![],
        }
    }

    pub(crate) fn key(&self) -> ListenerKey {
        ListenerKey::new(&self.name, self.typ)
    }

    pub(crate) fn active_refresh(&self) -> bool {
        self.active_refresh
    }

    /// Records what the cache reported for this listener's key and returns
    /// the update to surface, if any.
    ///
    /// Every observation other than a removal restarts the refresh
    /// schedule from the record's creation time. A goodbye cancels it.
    pub(crate) fn handle_update(
        &mut self,
        update: UpdateType,
        record: &ResourceRecord,
    ) -> Option<RecordUpdate> {
        if record.ttl() == 0 {
            self.refreshes.clear();
        } else if update != UpdateType::Removed {
            self.last_update = Some((record.ttl(), record.created_at()));
            self.schedule_refreshes();
        }

        match update {
            UpdateType::Added => Some(RecordUpdate::Added),
            UpdateType::Changed => Some(RecordUpdate::Changed),
            UpdateType::Removed => Some(RecordUpdate::Removed),
            UpdateType::NoChange => None,
        }
    }

    pub(crate) fn set_active_refresh(&mut self, active_refresh: bool) {
        self.active_refresh = active_refresh;
        if !self.started {
            return;
        }
        if active_refresh {
            self.schedule_refreshes();
        } else {
            self.refreshes.clear();
        }
    }

    fn schedule_refreshes(&mut self) {
        self.refreshes.clear();
        if !self.active_refresh {
            return;
        }
        let Some((ttl, created_at)) = self.last_update else {
            return;
        };
        if ttl == 0 {
            return;
        }
        for permille in REFRESH_PERMILLE {
            self.refreshes
                .push(created_at + Duration::from_millis(u64::from(ttl) * permille));
        }
    }

    pub(crate) fn next_refresh(&self) -> Option<Instant> {
        self.refreshes.first().copied()
    }

    /// Drops the refresh deadlines that are due and returns how many
    /// queries they stand for.
    pub(crate) fn take_due_refreshes(&mut self, now: Instant) -> usize {
        let due = self.refreshes.iter().take_while(|at| **at <= now).count();
        self.refreshes.drain(..due);
        due
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::message::DNSCLASS_INET;
    use crate::record::RecordData;

    fn record(ttl: u32, created_at: Instant) -> ResourceRecord {
        ResourceRecord::new(
            "host.local",
            DNSCLASS_INET,
            ttl,
            created_at,
            RecordData::A(Ipv4Addr::new(10, 0, 0, 1)),
        )
    }

    fn started_listener(active_refresh: bool) -> Listener {
        let mut listener = Listener::new(DnsType::A, "Host.local.", ListenerOwner::Caller);
        listener.started = true;
        listener.set_active_refresh(active_refresh);
        listener
    }

    #[test]
    fn test_listener_key() {
        let listener = Listener::new(DnsType::A, "Host.Local.", ListenerOwner::Caller);
        assert_eq!(listener.name, "Host.Local");
        assert_eq!(listener.key(), ListenerKey::new("host.local", DnsType::A));
    }

    #[test]
    fn test_refresh_schedule() {
        let now = Instant::now();
        let mut listener = started_listener(true);
        assert_eq!(listener.next_refresh(), None);

        let update = listener.handle_update(UpdateType::Added, &record(100, now));
        assert_eq!(update, Some(RecordUpdate::Added));
        assert_eq!(listener.next_refresh(), Some(now + Duration::from_secs(85)));

        assert_eq!(listener.take_due_refreshes(now + Duration::from_secs(84)), 0);
        assert_eq!(listener.take_due_refreshes(now + Duration::from_secs(85)), 1);
        assert_eq!(listener.next_refresh(), Some(now + Duration::from_secs(95)));
        assert_eq!(listener.take_due_refreshes(now + Duration::from_secs(200)), 1);
        assert_eq!(listener.next_refresh(), None);
    }

    #[test]
    fn test_no_change_reschedules_silently() {
        let now = Instant::now();
        let mut listener = started_listener(true);
        listener.handle_update(UpdateType::Added, &record(100, now));

        let later = now + Duration::from_secs(90);
        let update = listener.handle_update(UpdateType::NoChange, &record(100, later));
        assert_eq!(update, None);
        assert_eq!(
            listener.next_refresh(),
            Some(later + Duration::from_secs(85))
        );
    }

    #[test]
    fn test_goodbye_cancels_refresh() {
        let now = Instant::now();
        let mut listener = started_listener(true);
        listener.handle_update(UpdateType::Added, &record(100, now));
        assert!(listener.next_refresh().is_some());

        let update = listener.handle_update(UpdateType::Removed, &record(0, now));
        assert_eq!(update, Some(RecordUpdate::Removed));
        assert_eq!(listener.next_refresh(), None);
    }

    #[test]
    fn test_passive_listener_never_refreshes() {
        let now = Instant::now();
        let mut listener = started_listener(false);
        listener.handle_update(UpdateType::Added, &record(100, now));
        assert_eq!(listener.next_refresh(), None);

        // Turning refresh on later schedules from the last observation.
        listener.set_active_refresh(true);
        assert_eq!(listener.next_refresh(), Some(now + Duration::from_secs(85)));

        listener.set_active_refresh(false);
        assert_eq!(listener.next_refresh(), None);
    }
}
