// SPDX-License-Identifier: MIT OR Apache-2.0
//! Marker-chain detection.
//!
//! Consecutive routes whose endpoints join (the previous route's end is the
//! next route's start) and which share an icon form a chain: one marker
//! travels the whole way, so the render boundary can reuse a single cached
//! marker instead of creating one per leg. The chain key is a deterministic
//! function of the ordered endpoint/icon sequence.

use crate::route::{RouteAnimation, RouteAnimationId, RouteIcon};
use serde::{Deserialize, Serialize};

/// Deterministic identity of a marker chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerChainKey(pub u64);

/// A run of joined routes sharing one marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerChain {
    /// Cache key for this chain
    pub key: MarkerChainKey,
    /// Routes in the chain, in travel order
    pub route_ids: Vec<RouteAnimationId>,
    /// Icon shared by every leg
    pub icon: RouteIcon,
}

// FNV-1a. Std hashers make no cross-version stability promise, and the key
// must stay stable for the lifetime of a process-wide cache.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(hash: u64, bytes: &[u8]) -> u64 {
    let mut hash = hash;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Quantize a coordinate to ~1e-6 degrees so that endpoints which compare
/// approximately equal hash identically.
fn quantize(value: f64) -> i64 {
    (value * 1e6).round() as i64
}

/// Compute the chain key for an ordered run of routes
pub fn chain_key(routes: &[&RouteAnimation]) -> MarkerChainKey {
    let mut hash = FNV_OFFSET;
    for route in routes {
        hash = fnv1a(hash, route.icon.name().as_bytes());
        hash = fnv1a(hash, &quantize(route.from.lng).to_le_bytes());
        hash = fnv1a(hash, &quantize(route.from.lat).to_le_bytes());
        hash = fnv1a(hash, &quantize(route.to.lng).to_le_bytes());
        hash = fnv1a(hash, &quantize(route.to.lat).to_le_bytes());
    }
    MarkerChainKey(hash)
}

/// Group routes (already in engine order) into marker chains.
///
/// Every route lands in exactly one chain; an unjoined route forms a chain
/// of length one.
pub fn detect_chains(routes: &[RouteAnimation]) -> Vec<MarkerChain> {
    let mut chains = Vec::new();
    let mut current: Vec<&RouteAnimation> = Vec::new();

    for route in routes {
        let joins = current
            .last()
            .is_some_and(|prev| prev.to.approx_eq(&route.from) && prev.icon == route.icon);
        if !joins && !current.is_empty() {
            chains.push(finish_chain(&current));
            current.clear();
        }
        current.push(route);
    }
    if !current.is_empty() {
        chains.push(finish_chain(&current));
    }
    chains
}

fn finish_chain(routes: &[&RouteAnimation]) -> MarkerChain {
    MarkerChain {
        key: chain_key(routes),
        route_ids: routes.iter().map(|r| r.id).collect(),
        icon: routes[0].icon,
    }
}
