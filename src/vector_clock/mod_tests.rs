// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn get_is_zero_for_an_absent_node() {
    let vc = VectorClock::new();
    assert_eq!(vc.get(3), 0);
}

#[test]
fn increment_inserts_at_sorted_position() {
    let vc = VectorClock::new().increment(5).unwrap().increment(1).unwrap().increment(3).unwrap();
    assert_eq!(vc.to_text(), "1:1,3:1,5:1");
}

#[test]
fn increment_of_an_existing_node_bumps_its_counter() {
    let vc = VectorClock::new().increment(1).unwrap().increment(1).unwrap();
    assert_eq!(vc.get(1), 2);
    assert_eq!(vc.node_count(), 1);
}

#[test]
fn increment_does_not_mutate_the_original() {
    let a = VectorClock::new().increment(1).unwrap();
    let b = a.increment(1).unwrap();
    assert_eq!(a.get(1), 1);
    assert_eq!(b.get(1), 2);
}

#[test]
fn merge_takes_the_max_on_common_node_ids() {
    let a = VectorClock::parse("1:3,2:1").unwrap();
    let b = VectorClock::parse("1:1,2:5,3:2").unwrap();
    let merged = a.merge(&b);
    assert_eq!(merged.get(1), 3);
    assert_eq!(merged.get(2), 5);
    assert_eq!(merged.get(3), 2);
}

#[test]
fn merge_is_commutative_associative_and_idempotent() {
    let a = VectorClock::parse("1:3,2:1").unwrap();
    let b = VectorClock::parse("2:5,3:2").unwrap();
    let c = VectorClock::parse("1:1,4:9").unwrap();

    assert_eq!(a.merge(&b), b.merge(&a));
    assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
    assert_eq!(a.merge(&a), a);
}

#[test]
fn compare_identical_clocks_is_equal() {
    let a = VectorClock::parse("1:3,2:1").unwrap();
    let b = VectorClock::parse("1:3,2:1").unwrap();
    assert_eq!(a.compare(&b), ClockOrdering::Equal);
}

#[test]
fn compare_strictly_dominating_is_after() {
    let a = VectorClock::parse("1:3,2:2").unwrap();
    let b = VectorClock::parse("1:3,2:1").unwrap();
    assert_eq!(a.compare(&b), ClockOrdering::After);
    assert_eq!(b.compare(&a), ClockOrdering::Before);
    assert!(b.happens_before(&a));
    assert!(a.happens_after(&b));
}

#[test]
fn compare_mixed_differences_is_concurrent() {
    let a = VectorClock::parse("1:3,2:1").unwrap();
    let b = VectorClock::parse("1:1,2:5").unwrap();
    assert_eq!(a.compare(&b), ClockOrdering::Concurrent);
    assert!(a.is_concurrent_with(&b));
}

#[test]
fn compare_treats_missing_entries_as_zero() {
    let a = VectorClock::parse("1:3").unwrap();
    let b = VectorClock::parse("1:3,2:1").unwrap();
    assert_eq!(a.compare(&b), ClockOrdering::Before);
}

#[test]
fn binary_round_trips() {
    let vc = VectorClock::parse("1:3,2:1,65535:9").unwrap();
    let bytes = vc.to_bytes();
    assert_eq!(bytes.len(), 4 + 10 * 3);
    assert_eq!(VectorClock::from_bytes(&bytes).unwrap(), vc);
}

#[test]
fn binary_decode_canonicalizes_unsorted_and_duplicated_input() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&3u32.to_be_bytes());
    bytes.extend_from_slice(&5u16.to_be_bytes());
    bytes.extend_from_slice(&1u64.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&9u64.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&2u64.to_be_bytes());

    let vc = VectorClock::from_bytes(&bytes).unwrap();
    assert_eq!(vc.to_text(), "1:9,5:1");
}

#[test]
fn binary_decode_rejects_a_truncated_buffer() {
    let err = VectorClock::from_bytes(&[0, 0, 0, 2]).unwrap_err();
    assert!(matches!(err, Error::BufferTooSmall { .. }));
}

#[test]
fn text_round_trips() {
    let vc = VectorClock::parse("1:3,2:1").unwrap();
    assert_eq!(VectorClock::parse(&vc.to_text()).unwrap(), vc);
}

#[test]
fn empty_clock_has_empty_text_form() {
    let vc = VectorClock::new();
    assert_eq!(vc.to_text(), "");
    assert_eq!(VectorClock::parse("").unwrap(), vc);
}

#[test]
fn text_parse_canonicalizes_unsorted_and_duplicated_input() {
    let vc = VectorClock::parse("5:1,1:9,1:2").unwrap();
    assert_eq!(vc.to_text(), "1:9,5:1");
}

#[test]
fn text_parse_rejects_malformed_entries() {
    assert!(VectorClock::parse("1-3").is_err());
    assert!(VectorClock::parse("abc:3").is_err());
    assert!(VectorClock::parse("1:abc").is_err());
}

#[test]
fn header_text_round_trips_with_both_ids() {
    let header = VectorClockHeader {
        clock: VectorClock::parse("1:3,2:1").unwrap(),
        correlation_id: Some([0xAA; 16]),
        causation_id: Some([0xBB; 16]),
    };
    let text = header.to_text();
    assert_eq!(VectorClockHeader::parse(&text).unwrap(), header);
}

#[test]
fn header_text_omits_trailing_empty_segments() {
    let header = VectorClockHeader { clock: VectorClock::parse("1:1").unwrap(), correlation_id: None, causation_id: None };
    assert_eq!(header.to_text(), "1:1");
}

#[test]
fn header_text_empty_clock_yields_empty_leading_segment() {
    let header = VectorClockHeader {
        clock: VectorClock::new(),
        correlation_id: Some([0x11; 16]),
        causation_id: None,
    };
    let text = header.to_text();
    assert!(text.starts_with(';'));
    assert_eq!(VectorClockHeader::parse(&text).unwrap(), header);
}

#[test]
fn header_try_parse_rejects_structurally_invalid_input_without_panicking() {
    assert!(VectorClockHeader::try_parse("1:3;not-hex;bbbb").is_none());
    assert!(VectorClockHeader::try_parse("not a clock").is_none());
}

#[test]
fn header_binary_round_trips_with_both_ids() {
    let header = VectorClockHeader {
        clock: VectorClock::parse("1:3,2:1").unwrap(),
        correlation_id: Some([0xAA; 16]),
        causation_id: Some([0xBB; 16]),
    };
    let bytes = header.to_bytes();
    assert_eq!(VectorClockHeader::from_bytes(&bytes).unwrap(), header);
}

#[test]
fn header_binary_round_trips_with_no_ids() {
    let header = VectorClockHeader { clock: VectorClock::parse("1:3").unwrap(), correlation_id: None, causation_id: None };
    let bytes = header.to_bytes();
    assert_eq!(VectorClockHeader::from_bytes(&bytes).unwrap(), header);
}
