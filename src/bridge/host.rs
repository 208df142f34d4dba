use std::collections::BTreeMap;
use std::time::Duration;

use crate::assets::collector::{AssetCollector, RenderAsset};
use crate::bridge::state::{BundleState, ClipRegion};
use crate::composition::model::MediaDecl;
use crate::composition::resolver::CompositionResolver;
use crate::foundation::core::{Canvas, FrameIndex, HandleId};
use crate::foundation::error::BridgeResult;
use crate::readiness::registry::{ReadinessRegistry, ResolveOutcome};

/// What the component tree is asked to render.
#[derive(Clone, Copy, Debug)]
pub enum RenderPass<'a> {
    /// A (re)mount after a bundle mode change.
    Mount(&'a BundleState),
    /// One frame of the mounted composition.
    Frame {
        /// Mounted composition id.
        composition: &'a str,
        /// Frame being rendered.
        frame: FrameIndex,
    },
}

/// Page services available to the component tree during a render pass.
pub struct RenderScope<'a> {
    pub(crate) readiness: &'a mut ReadinessRegistry,
    pub(crate) assets: &'a mut AssetCollector,
    pub(crate) clip_region: &'a mut Option<ClipRegion>,
    pub(crate) canvas: Option<Canvas>,
}

impl RenderScope<'_> {
    /// Block capture until the returned handle is continued.
    pub fn delay_render(&mut self, label: Option<&str>) -> HandleId {
        self.readiness.register(label)
    }

    /// [`RenderScope::delay_render`] with a per-handle budget.
    pub fn delay_render_with_timeout(
        &mut self,
        label: Option<&str>,
        timeout: Duration,
    ) -> HandleId {
        self.readiness.register_with_timeout(label, Some(timeout))
    }

    /// Clear a handle registered in this or an earlier pass.
    pub fn continue_render(&mut self, id: HandleId) -> ResolveOutcome {
        self.readiness.resolve(id)
    }

    /// Report an unrecoverable error; readiness stays false until reset.
    pub fn cancel_render(&mut self, message: impl Into<String>) {
        self.readiness.fail(message);
    }

    /// Record timed media active in this pass.
    pub fn emit_asset(&mut self, asset: RenderAsset) -> BridgeResult<bool> {
        self.assets.emit(asset)
    }

    /// Narrow (or hide) the captured area for this frame. Clamped to the canvas.
    pub fn set_clip_region(&mut self, region: Option<ClipRegion>) {
        *self.clip_region = match (region, self.canvas) {
            (Some(r), Some(canvas)) => Some(r.clamp_to(canvas)),
            (r, _) => r,
        };
    }
}

/// The component tree behind the bridge.
///
/// Implementations render synchronously; asynchronous work is expressed by registering handles
/// through the scope and continuing them later via [`crate::Bridge::continue_render`].
pub trait RenderHost {
    /// Run one render pass.
    fn render(&mut self, scope: &mut RenderScope<'_>, pass: RenderPass<'_>) -> BridgeResult<()>;
}

/// [`RenderHost`] backed by a closure.
pub struct FnHost<F>(F);

/// Wrap a closure as a [`RenderHost`].
pub fn host_fn<F>(f: F) -> FnHost<F>
where
    F: FnMut(&mut RenderScope<'_>, RenderPass<'_>) -> BridgeResult<()>,
{
    FnHost(f)
}

impl<F> RenderHost for FnHost<F>
where
    F: FnMut(&mut RenderScope<'_>, RenderPass<'_>) -> BridgeResult<()>,
{
    fn render(&mut self, scope: &mut RenderScope<'_>, pass: RenderPass<'_>) -> BridgeResult<()> {
        (self.0)(scope, pass)
    }
}

/// Data-driven host that emits each composition's declared media while it is playing.
#[derive(Clone, Debug, Default)]
pub struct DeclaredMediaHost {
    media: BTreeMap<String, Vec<MediaDecl>>,
}

impl DeclaredMediaHost {
    /// Snapshot the media declared by every registered composition.
    pub fn from_resolver(resolver: &CompositionResolver) -> Self {
        let media = resolver
            .names()
            .into_iter()
            .filter_map(|id| {
                let decl = resolver.get(&id)?;
                Some((id, decl.media.clone()))
            })
            .collect();
        Self { media }
    }
}

impl RenderHost for DeclaredMediaHost {
    fn render(&mut self, scope: &mut RenderScope<'_>, pass: RenderPass<'_>) -> BridgeResult<()> {
        let RenderPass::Frame { composition, frame } = pass else {
            return Ok(());
        };
        let Some(media) = self.media.get(composition) else {
            return Ok(());
        };
        for m in media.iter().filter(|m| !m.muted) {
            let Some(media_frame) = m.media_frame_at(frame) else {
                continue;
            };
            scope.emit_asset(RenderAsset {
                id: m.id.clone(),
                kind: m.kind,
                src: m.src.clone(),
                frame,
                media_frame,
                volume: m.volume,
                playback_rate: m.playback_rate,
                trim_before: m.trim_before,
                trim_after: m.trim_after,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/host.rs"]
mod tests;
