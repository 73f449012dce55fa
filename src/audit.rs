//! Append-only records: one audit entry per accepted transition and one
//! quote record per submitted quote. Neither is ever updated or deleted.
use super::booking::{BookingStatus, Money, TimeStamp};
use chrono::Utc;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct AuditEntry {
    #[n(0)]
    pub booking_id: String,
    #[n(1)]
    pub from: BookingStatus,
    #[n(2)]
    pub to: BookingStatus,
    #[n(3)]
    pub changed_by: String,
    #[n(4)]
    pub reason: Option<String>,
    #[n(5)]
    pub at: TimeStamp<Utc>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    #[n(0)]
    pub booking_id: String,
    #[n(1)]
    pub quoted_price: Money,
    #[n(2)]
    pub labor_cost: Option<Money>,
    #[n(3)]
    pub material_cost: Option<Money>,
    #[n(4)]
    pub estimated_days: Option<u32>,
    #[n(5)]
    pub notes: Option<String>,
    #[n(6)]
    pub submitted_by: String,
    #[n(7)]
    pub at: TimeStamp<Utc>,
}

// Keys are `booking_id 0x00 seq_be64`, so a prefix scan over one booking
// yields its records in insertion order. The separator keeps one id from
// shadowing another as a prefix.
pub fn record_key(booking_id: &str, seq: u64) -> Vec<u8> {
    let mut key = record_prefix(booking_id);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

pub fn record_prefix(booking_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(booking_id.len() + 9);
    prefix.extend_from_slice(booking_id.as_bytes());
    prefix.push(0);
    prefix
}

/// Replays an ordered audit chain and returns the final status, or `None` if
/// the chain is empty or broken (an entry whose `from` is not the previous
/// entry's `to`).
pub fn replay_chain(entries: &[AuditEntry]) -> Option<BookingStatus> {
    let mut current: Option<BookingStatus> = None;
    for entry in entries {
        if let Some(status) = current {
            if entry.from != status {
                return None;
            }
        }
        current = Some(entry.to);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    fn entry(from: BookingStatus, to: BookingStatus) -> AuditEntry {
        AuditEntry {
            booking_id: "bkg_chain".into(),
            from,
            to,
            changed_by: "user_x".into(),
            reason: None,
            at: TimeStamp::new(),
        }
    }

    #[test]
    fn replay_follows_the_chain() {
        let entries = vec![
            entry(Pending, Pending), // creation entry
            entry(Pending, Accepted),
            entry(Accepted, QuoteSent),
            entry(QuoteSent, QuoteApproved),
        ];
        assert_eq!(replay_chain(&entries), Some(QuoteApproved));
    }

    #[test]
    fn replay_detects_a_broken_chain() {
        let entries = vec![entry(Pending, Accepted), entry(QuoteSent, QuoteApproved)];
        assert_eq!(replay_chain(&entries), None);
    }

    #[test]
    fn replay_of_nothing_is_nothing() {
        assert_eq!(replay_chain(&[]), None);
    }

    #[test]
    fn record_keys_sort_by_sequence() {
        let k0 = record_key("bkg_a", 0);
        let k1 = record_key("bkg_a", 1);
        let k255 = record_key("bkg_a", 255);
        let k256 = record_key("bkg_a", 256);

        assert!(k0 < k1);
        assert!(k255 < k256); // big-endian keeps byte order numeric

        // "bkg_a" must not shadow "bkg_ab"
        let other = record_key("bkg_ab", 0);
        assert!(!other.starts_with(&record_prefix("bkg_a")));
    }

    #[test]
    fn audit_entry_encoding() {
        let original = entry(Pending, Accepted);

        let encoding = minicbor::to_vec(&original).unwrap();
        let decode: AuditEntry = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }
}
