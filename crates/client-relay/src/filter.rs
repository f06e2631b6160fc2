//! Event filtering: which variants the relay forwards.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use client_core::Event;

/// One event variant, by its kebab-case name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    Ack,
    CancelAck,
    Reject,
    CancelReject,
    Trade,
    TopOfBook,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Ack,
        EventKind::CancelAck,
        EventKind::Reject,
        EventKind::CancelReject,
        EventKind::Trade,
        EventKind::TopOfBook,
    ];

    pub fn of(event: &Event) -> Self {
        match event {
            Event::Ack(_) => EventKind::Ack,
            Event::CancelAck(_) => EventKind::CancelAck,
            Event::Reject(_) => EventKind::Reject,
            Event::CancelReject(_) => EventKind::CancelReject,
            Event::Trade(_) => EventKind::Trade,
            Event::TopOfBook(_) => EventKind::TopOfBook,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Ack => "ack",
            EventKind::CancelAck => "cancel-ack",
            EventKind::Reject => "reject",
            EventKind::CancelReject => "cancel-reject",
            EventKind::Trade => "trade",
            EventKind::TopOfBook => "top-of-book",
        }
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ack" => Ok(EventKind::Ack),
            "cancel-ack" => Ok(EventKind::CancelAck),
            "reject" => Ok(EventKind::Reject),
            "cancel-reject" => Ok(EventKind::CancelReject),
            "trade" => Ok(EventKind::Trade),
            "top-of-book" => Ok(EventKind::TopOfBook),
            other => Err(format!("unknown event kind: {other:?}")),
        }
    }
}

/// The subset of event variants the relay forwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    kinds: BTreeSet<EventKind>,
}

impl Default for FilterSet {
    /// Forward everything.
    fn default() -> Self {
        FilterSet {
            kinds: EventKind::ALL.into_iter().collect(),
        }
    }
}

impl FilterSet {
    pub fn allows(&self, event: &Event) -> bool {
        self.kinds.contains(&EventKind::of(event))
    }

    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.kinds.iter().copied()
    }
}

impl FromStr for FilterSet {
    type Err = String;

    /// Parse a comma-separated kind list, e.g. `"trade,top-of-book"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut kinds = BTreeSet::new();
        for token in s.split(',') {
            if token.trim().is_empty() {
                continue;
            }
            kinds.insert(token.parse::<EventKind>()?);
        }
        if kinds.is_empty() {
            return Err("filter must name at least one event kind".to_string());
        }
        Ok(FilterSet { kinds })
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.kinds.iter().map(|k| k.name()).collect();
        write!(f, "{}", names.join(","))
    }
}
