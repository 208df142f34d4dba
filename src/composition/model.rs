use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::{
    assets::collector::MediaKind,
    composition::schema::PropsSchema,
    foundation::core::{Canvas, Fps, FrameIndex, FrameRange, HandleId},
    foundation::error::{BridgeError, BridgeResult},
    readiness::registry::{ReadinessRegistry, ResolveOutcome},
};

/// Dimensions, duration and frame rate of a composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Timeline frame rate.
    pub fps: Fps,
    /// Total duration in frames.
    pub duration_in_frames: u64,
}

impl VideoConfig {
    /// Output canvas for this config.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Check the config describes something renderable.
    pub fn validate(&self, composition: &str) -> BridgeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BridgeError::validation(format!(
                "composition '{composition}' must have non-zero width and height, got {}x{}",
                self.width, self.height
            )));
        }
        if self.duration_in_frames == 0 {
            return Err(BridgeError::validation(format!(
                "composition '{composition}' durationInFrames must be >= 1"
            )));
        }
        Fps::new(self.fps.num, self.fps.den).map_err(|e| {
            BridgeError::validation(format!("composition '{composition}' has invalid fps: {e}"))
        })?;
        Ok(())
    }
}

/// Output of a computed metadata function.
#[derive(Clone, Debug, PartialEq)]
pub struct CalculatedMetadata {
    /// Resolved dimensions, duration and fps.
    pub config: VideoConfig,
    /// Replacement props. `None` keeps the merged input props.
    pub props: Option<Value>,
}

/// What a computed metadata function produced on one invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum CalculateStep {
    /// Waiting on handles registered through [`CalculateCtx::delay_render`]. The function is
    /// invoked again once they have all been continued.
    Pending,
    /// Final metadata.
    Ready(CalculatedMetadata),
}

impl From<CalculatedMetadata> for CalculateStep {
    fn from(meta: CalculatedMetadata) -> Self {
        Self::Ready(meta)
    }
}

/// Outcome of a calculation that may be waiting on page handles.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub enum Calculation<T = CompositionMetadata> {
    /// Handles are still outstanding; poll again once the page is ready.
    Pending,
    /// Settled result.
    Ready(T),
}

impl<T> Calculation<T> {
    /// `true` for [`Calculation::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The settled value, if any.
    pub fn into_ready(self) -> Option<T> {
        match self {
            Self::Ready(v) => Some(v),
            Self::Pending => None,
        }
    }

    /// Transform the settled value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Calculation<U> {
        match self {
            Self::Ready(v) => Calculation::Ready(f(v)),
            Self::Pending => Calculation::Pending,
        }
    }
}

/// Inputs handed to a computed metadata function.
///
/// A function that needs asynchronous data (e.g. probing external media) registers a handle,
/// returns [`CalculateStep::Pending`] and is invoked again with the same inputs once the handle
/// was continued.
pub struct CalculateCtx<'a> {
    /// Composition being calculated.
    pub composition: &'a str,
    /// Runtime props merged over declared defaults.
    pub props: &'a Value,
    /// Declared default props.
    pub default_props: &'a Value,
    readiness: &'a mut ReadinessRegistry,
}

impl<'a> CalculateCtx<'a> {
    pub(crate) fn new(
        composition: &'a str,
        props: &'a Value,
        default_props: &'a Value,
        readiness: &'a mut ReadinessRegistry,
    ) -> Self {
        Self {
            composition,
            props,
            default_props,
            readiness,
        }
    }

    /// Register a pending handle on the page registry.
    pub fn delay_render(&mut self, label: Option<&str>) -> HandleId {
        self.readiness.register(label)
    }

    /// Resolve a handle registered through [`CalculateCtx::delay_render`].
    pub fn continue_render(&mut self, id: HandleId) -> ResolveOutcome {
        self.readiness.resolve(id)
    }
}

/// Computation of metadata from resolved props, possibly in several invocations.
pub type CalculateMetadataFn =
    Arc<dyn Fn(&mut CalculateCtx<'_>) -> BridgeResult<CalculateStep> + Send + Sync>;

/// Where a composition's metadata comes from.
#[derive(Clone)]
pub enum MetadataSource {
    /// Literal values.
    Constant(VideoConfig),
    /// Computed from props on every calculation.
    Computed(CalculateMetadataFn),
}

impl fmt::Debug for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => f.debug_tuple("Constant").field(c).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Timed media a composition plays, declared as data.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDecl {
    /// Stable id, unique within the composition.
    pub id: String,
    /// Audio or video.
    pub kind: MediaKind,
    /// Source locator (URL or static file path).
    pub src: String,
    /// First timeline frame the media is mounted at.
    #[serde(default)]
    pub from: u64,
    /// Number of timeline frames the media stays mounted.
    pub duration_in_frames: u64,
    /// Source frames skipped at the start.
    #[serde(default)]
    pub trim_before: u64,
    /// Source frame at which playback stops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_after: Option<u64>,
    /// Volume multiplier.
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Source playback rate multiplier.
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f64,
    /// Muted media is never handed to the muxer.
    #[serde(default)]
    pub muted: bool,
}

fn default_volume() -> f64 {
    1.0
}

fn default_playback_rate() -> f64 {
    1.0
}

impl MediaDecl {
    /// Timeline frames during which the media is mounted.
    pub fn active_range(&self) -> FrameRange {
        FrameRange::from_len(self.from, self.duration_in_frames)
    }

    /// Source frame shown at timeline frame `frame`, or `None` when the media is not playing.
    pub fn media_frame_at(&self, frame: FrameIndex) -> Option<u64> {
        if !self.active_range().contains(frame) {
            return None;
        }
        let local = (frame.0 - self.from) as f64;
        // Float-to-int casts saturate; only the offset add can overflow.
        let media = self
            .trim_before
            .checked_add((local * self.playback_rate).floor() as u64)?;
        match self.trim_after {
            Some(end) if media >= end => None,
            _ => Some(media),
        }
    }

    fn validate(&self, composition: &str) -> BridgeResult<()> {
        if self.src.trim().is_empty() {
            return Err(BridgeError::validation(format!(
                "media '{}' in '{composition}' must have a non-empty src",
                self.id
            )));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(BridgeError::validation(format!(
                "media '{}' in '{composition}' volume must be finite and >= 0",
                self.id
            )));
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(BridgeError::validation(format!(
                "media '{}' in '{composition}' playbackRate must be finite and > 0",
                self.id
            )));
        }
        if let Some(end) = self.trim_after
            && end <= self.trim_before
        {
            return Err(BridgeError::validation(format!(
                "media '{}' in '{composition}' trimAfter must be > trimBefore",
                self.id
            )));
        }
        Ok(())
    }
}

/// Static declaration of a composition as registered by the bundle.
#[derive(Clone, Debug)]
pub struct CompositionDecl {
    /// Unique composition id.
    pub id: String,
    /// Constant or computed metadata.
    pub metadata: MetadataSource,
    /// Props used when the driver supplies none.
    pub default_props: Value,
    /// Optional validation schema for resolved props.
    pub schema: Option<PropsSchema>,
    /// Stills always resolve to a single frame.
    pub still: bool,
    /// Timed media played by the composition.
    pub media: Vec<MediaDecl>,
}

impl CompositionDecl {
    /// Declare a composition with literal metadata.
    pub fn constant(id: impl Into<String>, config: VideoConfig) -> Self {
        Self::with_source(id, MetadataSource::Constant(config))
    }

    /// Declare a composition whose metadata is computed from props.
    pub fn computed<F>(id: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut CalculateCtx<'_>) -> BridgeResult<CalculateStep> + Send + Sync + 'static,
    {
        Self::with_source(id, MetadataSource::Computed(Arc::new(f)))
    }

    fn with_source(id: impl Into<String>, metadata: MetadataSource) -> Self {
        Self {
            id: id.into(),
            metadata,
            default_props: Value::Object(Default::default()),
            schema: None,
            still: false,
            media: Vec::new(),
        }
    }

    /// Set default props.
    pub fn default_props(mut self, props: Value) -> Self {
        self.default_props = props;
        self
    }

    /// Attach a props schema.
    pub fn schema(mut self, schema: PropsSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Mark as a still (single frame).
    pub fn still(mut self) -> Self {
        self.still = true;
        self
    }

    /// Append a timed media declaration.
    pub fn media(mut self, media: MediaDecl) -> Self {
        self.media.push(media);
        self
    }

    /// Check id syntax and declared media.
    pub fn validate(&self) -> BridgeResult<()> {
        validate_composition_id(&self.id)?;
        if let MetadataSource::Constant(config) = &self.metadata {
            config.validate(&self.id)?;
        }
        let mut seen = std::collections::HashSet::new();
        for m in &self.media {
            if !seen.insert(m.id.as_str()) {
                return Err(BridgeError::validation(format!(
                    "duplicate media id '{}' in '{}'",
                    m.id, self.id
                )));
            }
            m.validate(&self.id)?;
        }
        Ok(())
    }
}

/// Composition ids may only contain ASCII letters, digits, `-` and CJK ideographs.
pub fn validate_composition_id(id: &str) -> BridgeResult<()> {
    if id.is_empty() {
        return Err(BridgeError::validation("composition id must be non-empty"));
    }
    let ok = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || ('\u{4E00}'..='\u{9FFF}').contains(&c));
    if !ok {
        return Err(BridgeError::validation(format!(
            "composition id '{id}' may only contain a-z, A-Z, 0-9 and '-'"
        )));
    }
    Ok(())
}

/// Serializable snapshot of a resolved composition. Crosses the process boundary.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionMetadata {
    /// Composition id.
    pub id: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate.
    pub fps: Fps,
    /// Duration in frames.
    pub duration_in_frames: u64,
    /// Declared default props as JSON text.
    pub serialized_default_props: String,
    /// Resolved props as JSON text.
    pub serialized_resolved_props: String,
}

impl CompositionMetadata {
    /// Dimensions, fps and duration without the props.
    pub fn config(&self) -> VideoConfig {
        VideoConfig {
            width: self.width,
            height: self.height,
            fps: self.fps,
            duration_in_frames: self.duration_in_frames,
        }
    }

    /// Parse the resolved props back into JSON.
    pub fn resolved_props(&self) -> BridgeResult<Value> {
        serde_json::from_str(&self.serialized_resolved_props)
            .map_err(|e| BridgeError::serde(format!("resolved props of '{}': {e}", self.id)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/model.rs"]
mod tests;
