use crate::composition::model::{CompositionMetadata, VideoConfig};
use crate::foundation::core::{Canvas, Fps, Rect};

/// Driver-selected operating mode of the page.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BundleState {
    /// No composition selected; used for discovery.
    #[default]
    Index,
    /// Compositions are listed and evaluated, no single target.
    Evaluation,
    /// One composition is mounted for rendering.
    Composition {
        /// Id of the mounted composition.
        composition_name: String,
        /// Resolved props as JSON text.
        serialized_resolved_props: String,
        /// Width in pixels.
        composition_width: u32,
        /// Height in pixels.
        composition_height: u32,
        /// Duration in frames.
        composition_duration_in_frames: u64,
        /// Frame rate.
        composition_fps: Fps,
    },
}

impl BundleState {
    /// Composition mode for a calculated composition.
    pub fn composition(meta: &CompositionMetadata) -> Self {
        Self::Composition {
            composition_name: meta.id.clone(),
            serialized_resolved_props: meta.serialized_resolved_props.clone(),
            composition_width: meta.width,
            composition_height: meta.height,
            composition_duration_in_frames: meta.duration_in_frames,
            composition_fps: meta.fps,
        }
    }

    /// Short mode name for diagnostics.
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Evaluation => "evaluation",
            Self::Composition { .. } => "composition",
        }
    }

    /// Selected composition id, if any.
    pub fn composition_name(&self) -> Option<&str> {
        match self {
            Self::Composition {
                composition_name, ..
            } => Some(composition_name),
            _ => None,
        }
    }

    /// Dimensions, fps and duration carried by composition mode.
    pub fn video_config(&self) -> Option<VideoConfig> {
        match *self {
            Self::Composition {
                composition_width,
                composition_height,
                composition_duration_in_frames,
                composition_fps,
                ..
            } => Some(VideoConfig {
                width: composition_width,
                height: composition_height,
                fps: composition_fps,
                duration_in_frames: composition_duration_in_frames,
            }),
            _ => None,
        }
    }
}

/// Capture-area override declared by the page for the current frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClipRegion {
    /// Capture nothing for this frame.
    Hide,
    /// Capture only this rectangle, in canvas pixels.
    Area {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
}

impl ClipRegion {
    /// Region covering `rect`.
    pub fn from_rect(rect: Rect) -> Self {
        let r = rect.abs();
        Self::Area {
            x: r.x0,
            y: r.y0,
            width: r.width(),
            height: r.height(),
        }
    }

    /// Rectangle for an area region.
    pub fn rect(&self) -> Option<Rect> {
        match *self {
            Self::Hide => None,
            Self::Area {
                x,
                y,
                width,
                height,
            } => Some(Rect::new(x, y, x + width, y + height)),
        }
    }

    /// Intersect with the canvas. A region entirely outside becomes [`ClipRegion::Hide`].
    pub fn clamp_to(self, canvas: Canvas) -> Self {
        let Some(r) = self.rect() else {
            return Self::Hide;
        };
        let clipped = r.abs().intersect(canvas.rect());
        if clipped.area() <= 0.0 {
            Self::Hide
        } else {
            Self::from_rect(clipped)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/state.rs"]
mod tests;
