//! Track catalog: the static, read-only source of price and payee metadata.
//!
//! The catalog is loaded once at daemon startup, in priority order: a local
//! TOML file, a remote TOML URL, then the built-in demo catalog. After load
//! it never changes — every lookup and every next/prev computation goes
//! through [`CatalogIndex`].

use crate::money::Amount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Simulated track length used when a catalog entry does not specify one.
pub const DEFAULT_DURATION_SECS: u32 = 180;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    /// Listed pay-per-play price. Always positive.
    pub price: Amount,
    /// Address the settlement is paid to.
    pub payee_address: String,
    pub play_count: u64,
    pub duration_secs: u32,
}

/// Ordered track list plus id lookup. Track order is catalog order and
/// drives next/prev wraparound.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    tracks: Vec<Track>,
    by_id: HashMap<TrackId, usize>,
}

impl CatalogIndex {
    pub fn new(tracks: Vec<Track>) -> anyhow::Result<Self> {
        let mut by_id = HashMap::with_capacity(tracks.len());
        for (idx, track) in tracks.iter().enumerate() {
            validate_track(track)?;
            if by_id.insert(track.id, idx).is_some() {
                anyhow::bail!("duplicate track id {} in catalog", track.id);
            }
        }
        Ok(Self { tracks, by_id })
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.by_id.get(&id).map(|&idx| &self.tracks[idx])
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Next track in catalog order, wrapping at the end.
    pub fn next_after(&self, id: TrackId) -> Option<&Track> {
        let idx = self.position(id)?;
        let next = (idx + 1) % self.tracks.len();
        Some(&self.tracks[next])
    }

    /// Previous track in catalog order, wrapping at the start.
    pub fn prev_before(&self, id: TrackId) -> Option<&Track> {
        let idx = self.position(id)?;
        let prev = (idx + self.tracks.len() - 1) % self.tracks.len();
        Some(&self.tracks[prev])
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

fn validate_track(track: &Track) -> anyhow::Result<()> {
    if track.title.trim().is_empty() {
        anyhow::bail!("track {} has an empty title", track.id);
    }
    if track.artist.trim().is_empty() {
        anyhow::bail!("track {} has an empty artist", track.id);
    }
    if track.payee_address.trim().is_empty() {
        anyhow::bail!("track {} has an empty payee address", track.id);
    }
    if track.price.is_zero() {
        anyhow::bail!("track {} has a zero price", track.id);
    }
    Ok(())
}

// ── TOML catalog loader ───────────────────────────────────────────────────────

/// Intermediate struct that matches the TOML `[[track]]` table.
/// Kept separate from `Track` so the TOML schema can diverge from the wire
/// struct without breaking either.
#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    track: Vec<TomlTrack>,
}

#[derive(Debug, Deserialize)]
struct TomlTrack {
    id: u64,
    title: String,
    artist: String,
    /// Decimal coin string, e.g. "0.001".
    price: String,
    payee: String,
    #[serde(default)]
    play_count: u64,
    #[serde(default = "default_duration")]
    duration_secs: u32,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_SECS
}

pub fn parse_catalog_from_toml_str(content: &str) -> anyhow::Result<CatalogIndex> {
    let file: TomlCatalogFile = toml::from_str(content)?;
    let tracks = file
        .track
        .into_iter()
        .map(|t| {
            let price: Amount = t
                .price
                .parse()
                .map_err(|e| anyhow::anyhow!("track {}: {}", t.id, e))?;
            Ok(Track {
                id: TrackId(t.id),
                title: t.title,
                artist: t.artist,
                price,
                payee_address: t.payee,
                play_count: t.play_count,
                duration_secs: t.duration_secs,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    CatalogIndex::new(tracks)
}

pub fn load_catalog_from_toml(path: &std::path::Path) -> anyhow::Result<CatalogIndex> {
    let content = std::fs::read_to_string(path)?;
    parse_catalog_from_toml_str(&content)
}

pub async fn fetch_catalog_from_url(url: &str) -> anyhow::Result<CatalogIndex> {
    let content = reqwest::get(url).await?.error_for_status()?.text().await?;
    parse_catalog_from_toml_str(&content)
}

// ── built-in demo catalog ─────────────────────────────────────────────────────

const DEMO_CATALOG_TOML: &str = r#"
[[track]]
id = 1
title = "Neon Dreams"
artist = "CryptoBeats"
price = "0.001"
payee = "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb"
play_count = 1247

[[track]]
id = 2
title = "Blockchain Rhythm"
artist = "Web3 Collective"
price = "0.0015"
payee = "0x8ba1f109551bD432803012645Ac136ddd64DBA72"
play_count = 892

[[track]]
id = 3
title = "Decentralized Harmony"
artist = "NFT Sounds"
price = "0.002"
payee = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
play_count = 2341

[[track]]
id = 4
title = "Smart Contract Symphony"
artist = "DAO Musicians"
price = "0.0012"
payee = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
play_count = 1567

[[track]]
id = 5
title = "Ethereum Echoes"
artist = "Chain Melody"
price = "0.0018"
payee = "0x4B20993Bc481177ec7E8f571ceCaE8A9e22C02db"
play_count = 3421
"#;

/// The bundled five-track demo catalog, used when no catalog file or URL is
/// configured.
pub fn demo_catalog() -> anyhow::Result<CatalogIndex> {
    parse_catalog_from_toml_str(DEMO_CATALOG_TOML)
}
