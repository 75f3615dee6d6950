//! Chunk-grid claims and per-world claim registries.
//!
//! Land is claimed in whole chunks (16x16 block columns). Each world that a
//! server hosts carries one [`ClaimWorld`] mapping town ids to the claims
//! that town holds in that world. A chunk can be claimed by at most one
//! town per world.

use crate::town::{Town, TownId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by claim registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// The chunk already holds a claim in this world.
    #[error("chunk ({x}, {z}) is already claimed")]
    AlreadyClaimed { x: i32, z: i32 },
}

/// A chunk coordinate on the world grid.
///
/// Identity is the coordinate pair; two `Chunk` values with equal `x` and
/// `z` are the same chunk regardless of how they were derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    pub x: i32,
    pub z: i32,
}

impl Chunk {
    /// Creates a chunk reference at the given grid coordinates.
    pub fn at(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Manhattan distance to another chunk, in chunks.
    ///
    /// Symmetric, and zero exactly when the chunks are equal. Used for
    /// adjacency rules and proximity checks.
    pub fn distance_between(&self, other: &Chunk) -> i32 {
        (self.x - other.x).abs() + (self.z - other.z).abs()
    }

    /// Whether the given position falls inside this chunk's block column.
    ///
    /// The chunk spans `[x * 16, (x + 1) * 16)` on both horizontal axes, so
    /// a position exactly on the upper edge belongs to the next chunk over.
    pub fn contains(&self, position: &Position) -> bool {
        let min_x = f64::from(self.x * 16);
        let min_z = f64::from(self.z * 16);
        position.x >= min_x
            && position.x < min_x + 16.0
            && position.z >= min_z
            && position.z < min_z + 16.0
    }
}

impl std::fmt::Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// A world hosted by some server in the cluster.
///
/// Worlds are identified by name; the environment tag travels along for
/// display purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct World {
    pub name: String,
    pub environment: String,
}

impl World {
    pub fn new(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environment: environment.into(),
        }
    }

    /// A world with the default overworld environment.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, "normal")
    }
}

/// An exact location in a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub world: World,
}

impl Position {
    pub fn at(x: f64, y: f64, z: f64, world: World) -> Self {
        Self { x, y, z, world }
    }

    /// The chunk containing this position.
    ///
    /// Uses floored division so negative coordinates resolve to the
    /// correct negative chunk (x = -0.5 lies in chunk -1, not chunk 0).
    pub fn chunk(&self) -> Chunk {
        Chunk::at(
            (self.x.floor() as i32).div_euclid(16),
            (self.z.floor() as i32).div_euclid(16),
        )
    }
}

/// What a claimed chunk is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    /// A regular town claim.
    #[default]
    Normal,
    /// A farm chunk, open to all town members.
    Farm,
}

/// A single claimed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub chunk: Chunk,
    #[serde(default)]
    pub kind: ClaimKind,
}

impl Claim {
    /// A regular claim over the given chunk.
    pub fn at(chunk: Chunk) -> Self {
        Self {
            chunk,
            kind: ClaimKind::Normal,
        }
    }
}

/// A claim resolved against the town that owns it.
///
/// This is a view assembled for map rendering and interaction checks, not
/// a stored aggregate; both halves are owned snapshots.
#[derive(Debug, Clone)]
pub struct TownClaim {
    pub town: Town,
    pub claim: Claim,
}

impl TownClaim {
    pub fn new(town: Town, claim: Claim) -> Self {
        Self { town, claim }
    }
}

/// All claims within one world, grouped by owning town.
///
/// One registry exists per world a server hosts. It is created when the
/// first claim lands in that world and lives for as long as the world is
/// registered. The registry upholds the one-claim-per-chunk rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimWorld {
    id: i64,
    claims: HashMap<TownId, Vec<Claim>>,
}

impl ClaimWorld {
    /// An empty registry with the given storage id.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            claims: HashMap::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Total number of claims across all towns in this world.
    pub fn claim_count(&self) -> usize {
        self.claims.values().map(Vec::len).sum()
    }

    /// Iterates every claim with its owning town id.
    pub fn claims(&self) -> impl Iterator<Item = (TownId, &Claim)> {
        self.claims
            .iter()
            .flat_map(|(town, claims)| claims.iter().map(move |claim| (*town, claim)))
    }

    /// Claims held by one town in this world.
    pub fn town_claims(&self, town: TownId) -> &[Claim] {
        self.claims.get(&town).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Looks up the claim covering a chunk, if any.
    pub fn claim_at(&self, chunk: Chunk) -> Option<(TownId, &Claim)> {
        self.claims().find(|(_, claim)| claim.chunk == chunk)
    }

    /// Registers a claim for a town.
    ///
    /// Fails when the chunk is already claimed, by this town or any other;
    /// at most one claim may cover a chunk in a given world.
    pub fn add_claim(&mut self, town: TownId, claim: Claim) -> Result<(), ClaimError> {
        if self.claim_at(claim.chunk).is_some() {
            return Err(ClaimError::AlreadyClaimed {
                x: claim.chunk.x,
                z: claim.chunk.z,
            });
        }
        self.claims.entry(town).or_default().push(claim);
        Ok(())
    }

    /// Removes a town's claim over a chunk. Returns whether one existed.
    pub fn remove_claim(&mut self, town: TownId, chunk: Chunk) -> bool {
        let Some(claims) = self.claims.get_mut(&town) else {
            return false;
        };
        let before = claims.len();
        claims.retain(|claim| claim.chunk != chunk);
        let removed = claims.len() < before;
        if claims.is_empty() {
            self.claims.remove(&town);
        }
        removed
    }

    /// Removes every claim a town holds in this world.
    ///
    /// Returns exactly how many claims were removed; zero when the town
    /// holds none here, which makes the town-deletion sweep across all
    /// cached worlds a cheap no-op for uninvolved worlds.
    pub fn remove_town_claims(&mut self, town: TownId) -> usize {
        self.claims.remove(&town).map(|claims| claims.len()).unwrap_or(0)
    }
}
