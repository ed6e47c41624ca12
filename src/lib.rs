// MIT License

// Copyright (c) 2016 Jerome Froelich

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Consistent hashing of string keys onto a changing set of named hosts.
//!
//! Every host is placed on a 32-bit ring at `vnodes` virtual-node positions.
//! The positions are drawn from a pseudo-random stream seeded with the 64-bit
//! FNV-1a hash of the hostname. A key hashes to a point on the ring with
//! 32-bit FNV-1a and is owned by the first position at or after that point,
//! wrapping to the lowest position past the top of the keyspace.
//!
//! Positions are never stored per host. Removing a host replays its stream
//! from the seed, so placement is a pure function of the hostname and the
//! vnode count. Rings built from the same host set route every key the same
//! way, whatever order the hosts were added and removed in, as long as no two
//! hosts draw the same position.
//!
//! Positions can collide, and hosts whose seeds are congruent modulo
//! `2^31 - 1` draw identical position sets. A shared position belongs to the
//! host registered last. When its owner is removed it passes to the most
//! recently registered host still drawing it. Routing of collided positions
//! therefore depends on registration order; it is never reseeded.
//!
//! `Ring` does no locking. Callers sharing one across threads should wrap it
//! in a reader/writer lock: `bucket` under the read side, `add` and `remove`
//! under the write side.
//!
//! ## Example
//!
//! ```
//! use hostring::Ring;
//!
//! let hosts = ["node01", "node02", "node03", "node04", "node05"];
//! let mut ring = Ring::new(hosts, 3).unwrap();
//!
//! assert_eq!(ring.bucket("default/pinger").unwrap(), "node01");
//! assert_eq!(ring.bucket("instana-agent/daemon").unwrap(), "node05");
//!
//! ring.remove("node01").unwrap();
//! assert_eq!(ring.bucket("default/pinger").unwrap(), "node05");
//! ```

use {
    log::{debug, warn},
    rand_core::{RngCore, SeedableRng},
    serde::Serialize,
    std::collections::{BTreeMap, HashMap},
};

pub mod hash;
pub mod range;
pub mod rng;

pub use {
    range::{KeyRange, KEYSPACE},
    rng::Alfg,
};

/// A reasonable vnode count for rings of a few dozen hosts.
pub const DEFAULT_VNODES: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Duplicate host: {0}")]
    DuplicateHost(String),

    #[error("Host not found: {0}")]
    HostNotFound(String),

    #[error("Empty ring")]
    EmptyRing,
}

/// Draws the positions of the host with `seed`, in placement order.
fn vnode_positions(seed: u64, vnodes: usize) -> impl Iterator<Item = u32> {
    let mut rng = Alfg::seed_from_u64(seed);
    (0..vnodes).map(move |_| rng.next_u32())
}

/// An arc of the keyspace and the host that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment<'a> {
    pub range: KeyRange,
    pub host: &'a str,
}

/// Hash Ring
///
/// Maps keys to hosts. Two rings are equal when they hold the same hosts at
/// the same positions with the same owners. Registration order only shows
/// through the owners of collided positions.
#[derive(Debug, Clone)]
pub struct Ring {
    vnodes: usize,
    seeds: HashMap<String, u64>,
    positions: Vec<u32>,
    index: HashMap<u32, String>,
    // Registration order, consulted when a collided position changes hands.
    ranks: HashMap<String, u64>,
    next_rank: u64,
}

impl PartialEq for Ring {
    fn eq(&self, other: &Self) -> bool {
        self.vnodes == other.vnodes
            && self.seeds == other.seeds
            && self.positions == other.positions
            && self.index == other.index
    }
}

impl Eq for Ring {}

impl Ring {
    /// Creates a ring holding `hosts`, each placed at `vnodes` positions.
    /// Returns an error if a hostname appears more than once.
    pub fn new<I>(hosts: I, vnodes: usize) -> Result<Self, Error>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut ring = Ring::with_vnodes(vnodes);
        for host in hosts {
            ring.insert(host.into())?;
        }
        ring.positions.sort_unstable();

        Ok(ring)
    }

    /// Creates an empty ring.
    pub fn with_vnodes(vnodes: usize) -> Self {
        Ring {
            vnodes,
            seeds: HashMap::new(),
            positions: Vec::new(),
            index: HashMap::new(),
            ranks: HashMap::new(),
            next_rank: 0,
        }
    }

    /// Number of hosts on the ring.
    #[inline]
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// Positions per host.
    #[inline]
    pub fn vnodes(&self) -> usize {
        self.vnodes
    }

    #[inline]
    pub fn contains(&self, host: &str) -> bool {
        self.seeds.contains_key(host)
    }

    /// Registered hostnames, in no particular order.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.seeds.keys().map(String::as_str)
    }

    /// Returns the placement seed of `host`.
    pub fn seed(&self, host: &str) -> Option<u64> {
        self.seeds.get(host).copied()
    }

    /// All virtual-node positions, ascending.
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Adds `host` to the ring. Returns an error, leaving the ring unchanged,
    /// if the host is already registered.
    pub fn add(&mut self, host: impl Into<String>) -> Result<(), Error> {
        self.insert(host.into())?;
        self.positions.sort_unstable();

        Ok(())
    }

    /// Places `host` without restoring the sort order of `positions`.
    fn insert(&mut self, host: String) -> Result<(), Error> {
        if self.seeds.contains_key(&host) {
            return Err(Error::DuplicateHost(host));
        }

        let seed = hash::fnv1a_64(host.as_bytes());
        for position in vnode_positions(seed, self.vnodes) {
            if let Some(previous) = self.index.insert(position, host.clone()) {
                warn!("position {position} of {host} collides with {previous}");
            }
            self.positions.push(position);
        }

        debug!("added host {host} with {} vnodes", self.vnodes);
        self.ranks.insert(host.clone(), self.next_rank);
        self.next_rank += 1;
        self.seeds.insert(host, seed);

        Ok(())
    }

    /// Removes `host` from the ring. Returns an error, leaving the ring
    /// unchanged, if the host is not registered.
    pub fn remove(&mut self, host: &str) -> Result<(), Error> {
        let seed = self
            .seeds
            .remove(host)
            .ok_or_else(|| Error::HostNotFound(host.to_owned()))?;
        self.ranks.remove(host);

        let mut contested = Vec::new();
        for position in vnode_positions(seed, self.vnodes) {
            if let Ok(idx) = self.positions.binary_search(&position) {
                self.positions.remove(idx);
            }

            if self.index.get(&position).is_some_and(|owner| owner == host) {
                self.index.remove(&position);
                contested.push(position);
            }
        }

        // A position still present after the replay was also drawn by
        // another host.
        contested.retain(|position| self.positions.binary_search(position).is_ok());
        for position in contested {
            self.reclaim(position);
        }

        debug!(
            "removed host {host}, {} positions remain",
            self.positions.len()
        );

        Ok(())
    }

    /// Hands an orphaned `position` to the most recently registered host that
    /// still draws it, the owner a fresh ring built in registration order
    /// would give it.
    fn reclaim(&mut self, position: u32) {
        let vnodes = self.vnodes;
        let owner = self
            .seeds
            .iter()
            .filter(|&(_, &seed)| vnode_positions(seed, vnodes).any(|p| p == position))
            .max_by_key(|&(host, _)| self.ranks.get(host).copied().unwrap_or_default())
            .map(|(host, _)| host.clone());

        match owner {
            Some(owner) => {
                warn!("position {position} reassigned to {owner}");
                self.index.insert(position, owner);
            }
            None => self.positions.retain(|&p| p != position),
        }
    }

    /// Hashes `key` to its point on the ring.
    #[inline]
    pub fn key<K: AsRef<[u8]>>(&self, key: K) -> u32 {
        hash::fnv1a_32(key.as_ref())
    }

    /// Returns the host that owns `key`, or an error if the ring has no
    /// positions.
    #[inline]
    pub fn bucket<K: AsRef<[u8]>>(&self, key: K) -> Result<&str, Error> {
        self.bucket_for_hash(self.key(key))
    }

    /// Returns the host that owns the point `hash`, or an error if the ring
    /// has no positions.
    pub fn bucket_for_hash(&self, hash: u32) -> Result<&str, Error> {
        let position = self.nearest(hash).ok_or(Error::EmptyRing)?;
        let owner = self.index.get(&position);
        debug_assert!(owner.is_some(), "position {position} has no owner");

        owner.map(String::as_str).ok_or(Error::EmptyRing)
    }

    /// Returns the first position at or after `hash`, wrapping to the lowest
    /// position, or `None` if the ring has no positions.
    pub fn nearest(&self, hash: u32) -> Option<u32> {
        let idx = self.positions.partition_point(|&position| position < hash);
        self.positions
            .get(idx)
            .or_else(|| self.positions.first())
            .copied()
    }

    /// Splits the keyspace into arcs ordered clockwise from the arc ending at
    /// the lowest position. Adjacent arcs with the same owner are merged,
    /// across the wrap-around as well.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments: Vec<Segment<'_>> = Vec::new();
        let Some(&last) = self.positions.last() else {
            return segments;
        };

        let mut previous = last;
        for &position in &self.positions {
            if position == previous && !segments.is_empty() {
                continue;
            }
            let Some(host) = self.index.get(&position).map(String::as_str) else {
                continue;
            };

            let start = previous.wrapping_add(1);
            previous = position;

            match segments.last_mut() {
                Some(segment) if segment.host == host => segment.range.end = position,
                _ => segments.push(Segment {
                    range: KeyRange::new(start, position),
                    host,
                }),
            }
        }

        if segments.len() > 1 && segments[0].host == segments[segments.len() - 1].host {
            if let Some(tail) = segments.pop() {
                segments[0].range.start = tail.range.start;
            }
        }

        segments
    }

    /// Returns the arcs owned by `host`, or an error if it is not registered.
    pub fn ranges(&self, host: &str) -> Result<Vec<KeyRange>, Error> {
        if !self.contains(host) {
            return Err(Error::HostNotFound(host.to_owned()));
        }

        Ok(self
            .segments()
            .into_iter()
            .filter(|segment| segment.host == host)
            .map(|segment| segment.range)
            .collect())
    }

    /// Number of keys owned by each host. Sums to the keyspace size on a
    /// non-empty ring.
    pub fn shares(&self) -> BTreeMap<&str, u64> {
        let mut shares: BTreeMap<&str, u64> = self.hosts().map(|host| (host, 0)).collect();
        for segment in self.segments() {
            *shares.entry(segment.host).or_default() += segment.range.size();
        }
        shares
    }
}
