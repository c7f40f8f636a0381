//! Picks the best file when several stream variants were downloaded.

use super::types::{MediaKind, ProbeInfo};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Files sharing a signature are byte-for-byte duplicates in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub duration_ms: Option<u64>,
    pub size: u64,
    pub height: Option<u32>,
}

impl Signature {
    pub fn of(info: &ProbeInfo) -> Self {
        Self {
            duration_ms: info.duration.map(|d| (d * 1000.0).round() as u64),
            size: info.size,
            height: info.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResolutionBand {
    Unknown,
    Sd,
    Hd,
    FullHd,
    Qhd,
    Uhd,
}

impl ResolutionBand {
    pub fn from_height(height: Option<u32>) -> Self {
        match height {
            None => ResolutionBand::Unknown,
            Some(h) if h >= 2160 => ResolutionBand::Uhd,
            Some(h) if h >= 1440 => ResolutionBand::Qhd,
            Some(h) if h >= 1080 => ResolutionBand::FullHd,
            Some(h) if h >= 720 => ResolutionBand::Hd,
            Some(_) => ResolutionBand::Sd,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResolutionBand::Unknown => "unknown",
            ResolutionBand::Sd => "SD",
            ResolutionBand::Hd => "HD 720p",
            ResolutionBand::FullHd => "Full HD 1080p",
            ResolutionBand::Qhd => "QHD 1440p",
            ResolutionBand::Uhd => "UHD 2160p",
        }
    }
}

/// Splits videos into first occurrences and later duplicates, preserving input order.
pub fn dedupe<'a>(videos: &[&'a ProbeInfo]) -> (Vec<&'a ProbeInfo>, Vec<&'a ProbeInfo>) {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut duplicates = Vec::new();

    for video in videos {
        if seen.insert(Signature::of(video)) {
            unique.push(*video);
        } else {
            duplicates.push(*video);
        }
    }

    (unique, duplicates)
}

fn compare(a: &ProbeInfo, b: &ProbeInfo) -> Ordering {
    ResolutionBand::from_height(b.height)
        .cmp(&ResolutionBand::from_height(a.height))
        .then_with(|| b.has_audio.cmp(&a.has_audio))
        .then_with(|| b.height.cmp(&a.height))
        .then_with(|| {
            b.duration
                .unwrap_or(0.0)
                .total_cmp(&a.duration.unwrap_or(0.0))
        })
        .then_with(|| b.size.cmp(&a.size))
}

/// Best first. The sort is stable, so ties keep download order.
pub fn rank<'a>(videos: &[&'a ProbeInfo]) -> Vec<&'a ProbeInfo> {
    let mut ranked = videos.to_vec();
    ranked.sort_by(|a, b| compare(a, b));
    ranked
}

#[derive(Debug)]
pub struct Selection<'a> {
    /// Ranked unique videos
    pub ranked: Vec<&'a ProbeInfo>,
    pub duplicates: Vec<&'a ProbeInfo>,
    pub top_band: ResolutionBand,
    /// How many leading entries of `ranked` share `top_band`
    pub contenders: usize,
}

impl<'a> Selection<'a> {
    pub fn build(results: &'a [Option<ProbeInfo>]) -> Option<Self> {
        let videos: Vec<&ProbeInfo> = results
            .iter()
            .flatten()
            .filter(|info| info.kind == MediaKind::Video)
            .collect();

        let (unique, duplicates) = dedupe(&videos);
        let ranked = rank(&unique);
        let top_band = ResolutionBand::from_height(ranked.first()?.height);
        let contenders = ranked
            .iter()
            .take_while(|v| ResolutionBand::from_height(v.height) == top_band)
            .count();

        Some(Self {
            ranked,
            duplicates,
            top_band,
            contenders,
        })
    }

    pub fn candidates(&self) -> &[&'a ProbeInfo] {
        &self.ranked[..self.contenders]
    }

    pub fn needs_choice(&self) -> bool {
        self.contenders > 1
    }
}
