use crate::foundation::core::FrameIndex;
use crate::foundation::error::{BridgeError, BridgeResult};

/// Kind of timed media a downstream muxer has to include.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio-only source.
    Audio,
    /// Video source (its audio track is muxed too).
    Video,
}

/// Timed-media reference emitted by the component tree for one frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderAsset {
    /// Stable id of the emitting media element.
    pub id: String,
    /// Audio or video.
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Source locator.
    pub src: String,
    /// Timeline frame the asset was rendered for.
    pub frame: FrameIndex,
    /// Source frame playing at `frame`.
    pub media_frame: u64,
    /// Volume multiplier at `frame`.
    pub volume: f64,
    /// Source playback rate multiplier.
    pub playback_rate: f64,
    /// Source frames skipped at the start.
    #[serde(default)]
    pub trim_before: u64,
    /// Source frame at which playback stops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_after: Option<u64>,
}

impl RenderAsset {
    fn validate(&self) -> BridgeResult<()> {
        if self.src.trim().is_empty() {
            return Err(BridgeError::validation(format!(
                "render asset '{}' has an empty src",
                self.id
            )));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(BridgeError::validation(format!(
                "render asset '{}' volume must be finite and >= 0, got {}",
                self.id, self.volume
            )));
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(BridgeError::validation(format!(
                "render asset '{}' playbackRate must be finite and > 0, got {}",
                self.id, self.playback_rate
            )));
        }
        Ok(())
    }
}

/// Append-only accumulator drained once per captured frame.
#[derive(Debug)]
pub struct AssetCollector {
    pending: Vec<RenderAsset>,
    audio_enabled: bool,
    video_enabled: bool,
}

impl Default for AssetCollector {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl AssetCollector {
    /// Create an empty collector. Disabled kinds are dropped on emission.
    pub fn new(audio_enabled: bool, video_enabled: bool) -> Self {
        Self {
            pending: Vec::new(),
            audio_enabled,
            video_enabled,
        }
    }

    /// Record an asset for the current render pass.
    ///
    /// Returns `Ok(false)` when the asset kind is disabled and the asset was discarded.
    pub fn emit(&mut self, asset: RenderAsset) -> BridgeResult<bool> {
        asset.validate()?;
        let enabled = match asset.kind {
            MediaKind::Audio => self.audio_enabled,
            MediaKind::Video => self.video_enabled,
        };
        if !enabled {
            tracing::debug!(id = %asset.id, kind = ?asset.kind, "asset kind disabled, dropped");
            return Ok(false);
        }
        self.pending.push(asset);
        Ok(true)
    }

    /// Take every asset emitted since the last collection, in emission order.
    pub fn collect(&mut self) -> Vec<RenderAsset> {
        let out = std::mem::take(&mut self.pending);
        tracing::debug!(count = out.len(), "assets collected");
        out
    }

    /// Drop uncollected assets. Returns how many were dropped.
    pub fn discard(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// Number of uncollected assets.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/collector.rs"]
mod tests;
