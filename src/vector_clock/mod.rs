// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable sparse vector clocks: `node_id -> counter` maps with a
//! partial order, plus binary/text wire encodings and the message header
//! that carries one alongside correlation/causation ids.

pub mod coordinator;

pub use coordinator::{VectorClockCoordinator, VectorClockCoordinatorStats};

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_NODE_IDS: usize = 65_536;

/// The partial order between two [`VectorClock`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockOrdering {
    Equal,
    Before,
    After,
    Concurrent,
}

/// An immutable sparse vector clock: sorted, deduplicated `(node_id,
/// counter)` pairs. Every operation returns a new value rather than
/// mutating in place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct VectorClock {
    entries: Vec<(u16, u64)>,
}

impl VectorClock {
    pub fn new() -> Self {
        VectorClock { entries: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.entries.len()
    }

    /// 0 if `node_id` is absent.
    pub fn get(&self, node_id: u16) -> u64 {
        self.entries
            .binary_search_by_key(&node_id, |(id, _)| *id)
            .map(|idx| self.entries[idx].1)
            .unwrap_or(0)
    }

    /// Copy-with-increment for `node_id`, inserting it at its sorted
    /// position if absent. Fails with [`Error::CapacityExceeded`] if the
    /// clock already tracks the maximum of 65 536 distinct node ids.
    pub fn increment(&self, node_id: u16) -> Result<VectorClock> {
        let mut entries = self.entries.clone();
        match entries.binary_search_by_key(&node_id, |(id, _)| *id) {
            Ok(idx) => entries[idx].1 += 1,
            Err(idx) => {
                if entries.len() >= MAX_NODE_IDS {
                    return Err(Error::CapacityExceeded { limit: MAX_NODE_IDS });
                }
                entries.insert(idx, (node_id, 1));
            }
        }
        Ok(VectorClock { entries })
    }

    /// The least upper bound of `self` and `other`: per-node max via a
    /// linear two-pointer merge. Commutative, associative, idempotent.
    pub fn merge(&self, other: &VectorClock) -> VectorClock {
        let mut result = Vec::with_capacity(self.entries.len() + other.entries.len());
        let (mut i, mut j) = (0, 0);
        while i < self.entries.len() && j < other.entries.len() {
            let (a_id, a_c) = self.entries[i];
            let (b_id, b_c) = other.entries[j];
            match a_id.cmp(&b_id) {
                Ordering::Less => {
                    result.push((a_id, a_c));
                    i += 1;
                }
                Ordering::Greater => {
                    result.push((b_id, b_c));
                    j += 1;
                }
                Ordering::Equal => {
                    result.push((a_id, a_c.max(b_c)));
                    i += 1;
                    j += 1;
                }
            }
        }
        result.extend_from_slice(&self.entries[i..]);
        result.extend_from_slice(&other.entries[j..]);
        VectorClock { entries: result }
    }

    /// Compares the partial order against `other` via a linear merge,
    /// tracking `this_le`/`other_le` and exiting early to `Concurrent` once
    /// both go false.
    pub fn compare(&self, other: &VectorClock) -> ClockOrdering {
        let (mut i, mut j) = (0, 0);
        let mut this_le = true;
        let mut other_le = true;

        while i < self.entries.len() || j < other.entries.len() {
            let a = self.entries.get(i);
            let b = other.entries.get(j);

            let (a_c, b_c, advance_a, advance_b) = match (a, b) {
                (Some(&(a_id, a_c)), Some(&(b_id, b_c))) => match a_id.cmp(&b_id) {
                    Ordering::Less => (a_c, 0, true, false),
                    Ordering::Greater => (0, b_c, false, true),
                    Ordering::Equal => (a_c, b_c, true, true),
                },
                (Some(&(_, a_c)), None) => (a_c, 0, true, false),
                (None, Some(&(_, b_c))) => (0, b_c, false, true),
                (None, None) => unreachable!("loop condition guarantees at least one side has an entry"),
            };

            if a_c > b_c {
                other_le = false;
            }
            if b_c > a_c {
                this_le = false;
            }
            if !this_le && !other_le {
                return ClockOrdering::Concurrent;
            }
            if advance_a {
                i += 1;
            }
            if advance_b {
                j += 1;
            }
        }

        match (this_le, other_le) {
            (true, true) => ClockOrdering::Equal,
            (true, false) => ClockOrdering::Before,
            (false, true) => ClockOrdering::After,
            (false, false) => ClockOrdering::Concurrent,
        }
    }

    pub fn happens_before(&self, other: &VectorClock) -> bool {
        self.compare(other) == ClockOrdering::Before
    }

    pub fn happens_after(&self, other: &VectorClock) -> bool {
        self.compare(other) == ClockOrdering::After
    }

    pub fn is_concurrent_with(&self, other: &VectorClock) -> bool {
        self.compare(other) == ClockOrdering::Concurrent
    }

    /// 4-byte big-endian count, then `count` entries of `(u16 be node_id,
    /// u64 be counter)`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 10 * self.entries.len());
        buf.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for (id, counter) in &self.entries {
            buf.extend_from_slice(&id.to_be_bytes());
            buf.extend_from_slice(&counter.to_be_bytes());
        }
        buf
    }

    /// Tolerates unsorted or duplicated input, canonicalizing by taking
    /// the per-node max.
    pub fn from_bytes(bytes: &[u8]) -> Result<VectorClock> {
        if bytes.len() < 4 {
            return Err(Error::BufferTooSmall { needed: 4, available: bytes.len() });
        }
        let count = u32::from_be_bytes(bytes[0..4].try_into().unwrap_or([0; 4])) as usize;
        let needed = 4 + 10 * count;
        if bytes.len() < needed {
            return Err(Error::BufferTooSmall { needed, available: bytes.len() });
        }

        let mut entries = Vec::with_capacity(count);
        let mut offset = 4;
        for _ in 0..count {
            let id = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
            let counter = u64::from_be_bytes(bytes[offset + 2..offset + 10].try_into().unwrap_or([0; 8]));
            entries.push((id, counter));
            offset += 10;
        }
        Ok(Self::canonicalize(entries))
    }

    /// `"n1:c1,n2:c2,..."` ascending by node id; the empty clock is the
    /// empty string.
    pub fn to_text(&self) -> String {
        self.entries.iter().map(|(id, c)| format!("{id}:{c}")).collect::<Vec<_>>().join(",")
    }

    /// Tolerates unsorted/duplicated input, canonicalizing by max.
    pub fn parse(s: &str) -> Result<VectorClock> {
        if s.is_empty() {
            return Ok(VectorClock::new());
        }
        let mut entries = Vec::new();
        for part in s.split(',') {
            let (id_str, counter_str) = part
                .split_once(':')
                .ok_or_else(|| Error::InvalidArgument(format!("malformed vector clock entry {part:?}")))?;
            let node_id: u16 = id_str
                .parse()
                .map_err(|_| Error::InvalidArgument(format!("bad node id in vector clock entry {part:?}")))?;
            let counter: u64 = counter_str
                .parse()
                .map_err(|_| Error::InvalidArgument(format!("bad counter in vector clock entry {part:?}")))?;
            entries.push((node_id, counter));
        }
        Ok(Self::canonicalize(entries))
    }

    fn canonicalize(mut entries: Vec<(u16, u64)>) -> VectorClock {
        entries.sort_by_key(|(id, _)| *id);
        let mut result: Vec<(u16, u64)> = Vec::with_capacity(entries.len());
        for (id, counter) in entries {
            match result.last_mut() {
                Some(last) if last.0 == id => last.1 = last.1.max(counter),
                _ => result.push((id, counter)),
            }
        }
        VectorClock { entries: result }
    }
}

/// A 16-byte id (correlation or causation), encoded as 32 lowercase hex
/// characters in text form.
pub type HeaderId = [u8; 16];

/// A vector clock paired with optional correlation/causation ids, as
/// carried on `X-VectorClock`-style headers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VectorClockHeader {
    pub clock: VectorClock,
    pub correlation_id: Option<HeaderId>,
    pub causation_id: Option<HeaderId>,
}

impl VectorClockHeader {
    /// `"{clock_text};{correlation_hex32};{causation_hex32}"`, with both id
    /// segments optional and trailing-only.
    pub fn to_text(&self) -> String {
        let mut s = self.clock.to_text();
        if self.correlation_id.is_some() || self.causation_id.is_some() {
            s.push(';');
            if let Some(id) = self.correlation_id {
                s.push_str(&hex::encode(id));
            }
        }
        if self.causation_id.is_some() {
            s.push(';');
            if let Some(id) = self.causation_id {
                s.push_str(&hex::encode(id));
            }
        }
        s
    }

    /// Rejects structurally invalid input without throwing.
    pub fn try_parse(s: &str) -> Option<Self> {
        let mut segments = s.splitn(3, ';');
        let clock_part = segments.next().unwrap_or("");
        let correlation_part = segments.next();
        let causation_part = segments.next();

        let clock = VectorClock::parse(clock_part).ok()?;
        let correlation_id = parse_header_id(correlation_part)?;
        let causation_id = parse_header_id(causation_part)?;

        Some(VectorClockHeader { clock, correlation_id, causation_id })
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::try_parse(s).ok_or_else(|| Error::InvalidArgument(format!("malformed vector clock header {s:?}")))
    }

    /// Concatenates the clock's binary encoding with two optional 16-byte
    /// ids, each preceded by a presence byte (`1` then the 16 bytes, or a
    /// lone `0`).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.clock.to_bytes();
        write_optional_id(&mut buf, self.correlation_id);
        write_optional_id(&mut buf, self.causation_id);
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::BufferTooSmall { needed: 4, available: bytes.len() });
        }
        let count = u32::from_be_bytes(bytes[0..4].try_into().unwrap_or([0; 4])) as usize;
        let clock_len = 4 + 10 * count;
        let clock = VectorClock::from_bytes(bytes)?;

        let mut offset = clock_len;
        let correlation_id = read_optional_id(bytes, &mut offset)?;
        let causation_id = read_optional_id(bytes, &mut offset)?;
        Ok(VectorClockHeader { clock, correlation_id, causation_id })
    }
}

fn parse_header_id(segment: Option<&str>) -> Option<Option<HeaderId>> {
    match segment {
        None | Some("") => Some(None),
        Some(hex_str) => {
            let bytes = hex::decode(hex_str).ok()?;
            let array: HeaderId = bytes.try_into().ok()?;
            Some(Some(array))
        }
    }
}

fn write_optional_id(buf: &mut Vec<u8>, id: Option<HeaderId>) {
    match id {
        Some(bytes) => {
            buf.push(1);
            buf.extend_from_slice(&bytes);
        }
        None => buf.push(0),
    }
}

fn read_optional_id(bytes: &[u8], offset: &mut usize) -> Result<Option<HeaderId>> {
    if *offset >= bytes.len() {
        return Err(Error::BufferTooSmall { needed: *offset + 1, available: bytes.len() });
    }
    let present = bytes[*offset];
    *offset += 1;
    if present == 0 {
        return Ok(None);
    }
    if *offset + 16 > bytes.len() {
        return Err(Error::BufferTooSmall { needed: *offset + 16, available: bytes.len() });
    }
    let array: HeaderId = bytes[*offset..*offset + 16].try_into().unwrap_or([0; 16]);
    *offset += 16;
    Ok(Some(array))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
