use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::assets::collector::{AssetCollector, RenderAsset};
use crate::bridge::env::{BRIDGE_VERSION, PageEnv};
use crate::bridge::host::{RenderHost, RenderPass, RenderScope};
use crate::bridge::state::{BundleState, ClipRegion};
use crate::composition::model::{Calculation, CompositionDecl, CompositionMetadata};
use crate::composition::resolver::CompositionResolver;
use crate::foundation::clock::Clock;
use crate::foundation::core::{Canvas, FrameIndex, HandleId};
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::readiness::registry::{
    PendingHandleInfo, ReadinessRegistry, RenderFailure, ResolveOutcome,
};

/// What [`Bridge::teardown`] cleaned up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Pending handles cancelled.
    pub cancelled_handles: usize,
    /// Emitted assets that were never collected.
    pub dropped_assets: usize,
}

/// A `calculateComposition` request waiting on the handles its computation registered.
#[derive(Debug)]
struct ParkedCalculation {
    name: String,
    props: Value,
    handles: Vec<HandleId>,
}

/// Process-wide bridge state for one page instance.
///
/// Created at page load with [`Bridge::new`], reset for a fresh attempt with [`Bridge::reset`]
/// and destroyed with [`Bridge::teardown`]. Every entry point takes `&mut self`, so one driver
/// call runs at a time and accumulators are never mutated by interleaved attempts.
///
/// Mode and frame changes while handles are pending are rejected with
/// [`BridgeError::ProtocolUsage`]; they are never queued.
pub struct Bridge {
    env: PageEnv,
    input_props: Value,
    env_variables: BTreeMap<String, String>,
    readiness: ReadinessRegistry,
    resolver: CompositionResolver,
    assets: AssetCollector,
    clip_region: Option<ClipRegion>,
    bundle: BundleState,
    frame: Option<FrameIndex>,
    cache_metadata: bool,
    parked: Option<ParkedCalculation>,
    host: Box<dyn RenderHost>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("bundle", &self.bundle)
            .field("frame", &self.frame)
            .field("readiness", &self.readiness)
            .field("assets", &self.assets.pending_len())
            .field("parked", &self.parked.as_ref().map(|p| p.name.as_str()))
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Page load: build the bridge from the injected environment.
    pub fn new(
        env: PageEnv,
        clock: Arc<dyn Clock>,
        host: impl RenderHost + 'static,
    ) -> BridgeResult<Self> {
        env.check_version(BRIDGE_VERSION);
        let input_props = env.input_props()?;
        let env_variables = env.env_variables()?;
        let readiness = ReadinessRegistry::new(clock, env.default_timeout());
        let assets = AssetCollector::new(env.audio_enabled, env.video_enabled);
        tracing::debug!(
            timeout_ms = env.timeout_in_milliseconds,
            audio = env.audio_enabled,
            video = env.video_enabled,
            "bridge created"
        );
        Ok(Self {
            env,
            input_props,
            env_variables,
            readiness,
            resolver: CompositionResolver::new(),
            assets,
            clip_region: None,
            bundle: BundleState::Index,
            frame: None,
            cache_metadata: false,
            parked: None,
            host: Box::new(host),
        })
    }

    /// Memoize [`Bridge::calculate_composition`] per `(name, props)`.
    pub fn with_metadata_cache(mut self, enabled: bool) -> Self {
        self.cache_metadata = enabled;
        self
    }

    /// Replace the component tree, e.g. after compositions were registered.
    pub fn set_host(&mut self, host: impl RenderHost + 'static) {
        self.host = Box::new(host);
    }

    /// Page environment.
    pub fn env(&self) -> &PageEnv {
        &self.env
    }

    /// Input props injected at page load.
    pub fn input_props(&self) -> &Value {
        &self.input_props
    }

    /// Environment variables visible to compositions.
    pub fn env_variables(&self) -> &BTreeMap<String, String> {
        &self.env_variables
    }

    /// Registered compositions.
    pub fn compositions(&self) -> &CompositionResolver {
        &self.resolver
    }

    /// Registered compositions, mutable.
    pub fn compositions_mut(&mut self) -> &mut CompositionResolver {
        &mut self.resolver
    }

    /// Register a composition.
    pub fn register_composition(&mut self, decl: CompositionDecl) -> BridgeResult<()> {
        self.resolver.register(decl)
    }

    /// Current mode.
    pub fn bundle_state(&self) -> &BundleState {
        &self.bundle
    }

    /// Frame position of the mounted composition.
    pub fn current_frame(&self) -> Option<FrameIndex> {
        self.frame
    }

    /// One cooperative event-loop turn: fire elapsed handle deadlines.
    pub fn pump_timers(&mut self) -> usize {
        self.readiness.poll_timeouts()
    }

    fn ensure_between_captures(&mut self, what: &str) -> BridgeResult<()> {
        self.pump_timers();
        let pending = self.readiness.pending_count();
        if pending > 0 {
            return Err(BridgeError::protocol(format!(
                "{what} while a capture is pending ({pending} handle(s) outstanding in {} mode)",
                self.bundle.mode_name()
            )));
        }
        Ok(())
    }

    fn ensure_not_rendering(&self, what: &str) -> BridgeResult<()> {
        if let BundleState::Composition {
            composition_name, ..
        } = &self.bundle
        {
            return Err(BridgeError::protocol(format!(
                "{what} is not available while '{composition_name}' is mounted"
            )));
        }
        Ok(())
    }

    /// Switch bundle mode and run a mount pass.
    ///
    /// Re-entering composition mode tears the previous mount down first: uncollected assets and
    /// the clip region are dropped and the registry is quiesced.
    #[tracing::instrument(skip(self), fields(from = self.bundle.mode_name()))]
    pub fn set_bundle_mode(&mut self, state: BundleState) -> BridgeResult<()> {
        self.ensure_between_captures(&format!(
            "cannot switch bundle mode to {}",
            state.mode_name()
        ))?;

        let mut frame = None;
        if let BundleState::Composition {
            composition_name,
            serialized_resolved_props,
            ..
        } = &state
        {
            self.resolver.require(composition_name)?;
            serde_json::from_str::<Value>(serialized_resolved_props).map_err(|e| {
                BridgeError::serde(format!("resolved props of '{composition_name}': {e}"))
            })?;
            if let Some(config) = state.video_config() {
                config.validate(composition_name)?;
                let last = config.duration_in_frames - 1;
                frame = Some(FrameIndex(self.env.initial_frame.min(last)));
                tracing::debug!(
                    fps = config.fps.as_f64(),
                    duration_secs = config.fps.frames_to_secs(config.duration_in_frames),
                    "mounting composition"
                );
            }
        }

        if let Some(parked) = self.parked.take() {
            tracing::debug!(name = %parked.name, "abandoning pending calculation on mode change");
        }
        self.readiness.cancel_all();
        let dropped = self.assets.discard();
        if dropped > 0 {
            tracing::warn!(dropped, "dropping uncollected assets on mode change");
        }
        self.clip_region = None;
        self.bundle = state;
        self.frame = frame;
        tracing::debug!(mode = self.bundle.mode_name(), "bundle mode set");

        self.run_pass(None)
    }

    /// Ids of the registered compositions. Not available in composition mode.
    pub fn get_composition_names(&self) -> BridgeResult<Vec<String>> {
        self.ensure_not_rendering("getCompositionNames")?;
        Ok(self.resolver.names())
    }

    /// Resolve one composition's metadata. `None` props use the page's input props.
    ///
    /// A computed composition may answer [`Calculation::Pending`]; the request is then parked
    /// until the handles it registered are continued. Finish it with
    /// [`Bridge::finish_calculation`], or by repeating the same call. A different request while
    /// one is parked is a [`BridgeError::ProtocolUsage`].
    pub fn calculate_composition(
        &mut self,
        name: &str,
        props: Option<&Value>,
    ) -> BridgeResult<Calculation> {
        self.ensure_not_rendering("calculateComposition")?;
        let props = props.unwrap_or(&self.input_props).clone();
        if let Some(parked) = &self.parked {
            if parked.name != name || parked.props != props {
                return Err(BridgeError::protocol(format!(
                    "calculateComposition for '{name}' while '{}' is still pending",
                    parked.name
                )));
            }
            return self.finish_calculation();
        }
        self.render_error()?;
        self.start_calculation(name.to_owned(), props)
    }

    /// Re-run a parked calculation once its handles have settled.
    ///
    /// Returns [`Calculation::Pending`] while any of them is outstanding. A page failure drops the
    /// parked request and is returned.
    pub fn finish_calculation(&mut self) -> BridgeResult<Calculation> {
        let Some(parked) = self.parked.take() else {
            return Err(BridgeError::protocol("finishCalculation without a pending calculation"));
        };
        self.render_error()?;
        if parked.handles.iter().any(|&id| self.readiness.is_pending(id)) {
            self.parked = Some(parked);
            return Ok(Calculation::Pending);
        }
        self.start_calculation(parked.name, parked.props)
    }

    fn start_calculation(&mut self, name: String, props: Value) -> BridgeResult<Calculation> {
        let mark = self.readiness.next_handle_id();
        let out = if self.cache_metadata {
            self.resolver.calculate_cached(&name, &props, &mut self.readiness)?
        } else {
            self.resolver.calculate(&name, &props, &mut self.readiness)?
        };
        if matches!(out, Calculation::Pending) {
            let handles = self.readiness.pending_since(mark);
            tracing::debug!(%name, handles = handles.len(), "calculation parked");
            self.parked = Some(ParkedCalculation {
                name,
                props,
                handles,
            });
        }
        Ok(out)
    }

    /// Resolve every registered composition with the page's input props.
    ///
    /// Answers [`Calculation::Pending`] without recomputing while any handle is outstanding, so a
    /// repeated call after readiness picks up the settled data.
    pub fn static_compositions(&mut self) -> BridgeResult<Calculation<Vec<CompositionMetadata>>> {
        self.ensure_not_rendering("getStaticCompositions")?;
        self.render_error()?;
        if self.readiness.pending_count() > 0 {
            return Ok(Calculation::Pending);
        }
        self.resolver.calculate_all(&self.input_props, &mut self.readiness)
    }

    /// Advance the mounted composition to `frame` and run a render pass.
    ///
    /// Follow with [`Bridge::is_render_ready`]: the pass may register new handles.
    #[tracing::instrument(skip(self))]
    pub fn set_frame(&mut self, frame: FrameIndex, composition: &str) -> BridgeResult<()> {
        let Some(mounted) = self.bundle.composition_name() else {
            return Err(BridgeError::protocol(format!(
                "setFrame requires composition mode, page is in {} mode",
                self.bundle.mode_name()
            )));
        };
        if mounted != composition {
            return Err(BridgeError::protocol(format!(
                "setFrame for '{composition}' but '{mounted}' is mounted"
            )));
        }
        self.ensure_between_captures("cannot set frame")?;
        self.readiness.check()?;

        let duration = self
            .bundle
            .video_config()
            .map(|c| c.duration_in_frames)
            .unwrap_or_default();
        if frame.0 >= duration {
            return Err(BridgeError::validation(format!(
                "frame {} is out of range for '{composition}' ({duration} frames)",
                frame.0
            )));
        }

        let stale = self.assets.discard();
        if stale > 0 {
            tracing::warn!(stale, "previous frame's assets were never collected");
        }
        self.clip_region = None;
        self.frame = Some(frame);
        self.run_pass(Some(frame))
    }

    fn run_pass(&mut self, frame: Option<FrameIndex>) -> BridgeResult<()> {
        let canvas = self.bundle.video_config().map(|c| c.canvas());
        let Self {
            readiness,
            assets,
            clip_region,
            bundle,
            host,
            ..
        } = self;
        let mut scope = RenderScope {
            readiness,
            assets,
            clip_region,
            canvas,
        };
        let pass = match (frame, bundle.composition_name()) {
            (Some(frame), Some(composition)) => RenderPass::Frame { composition, frame },
            _ => RenderPass::Mount(bundle),
        };
        if let Err(e) = host.render(&mut scope, pass) {
            self.readiness.fail(e.to_string());
            return Err(e);
        }
        Ok(())
    }

    /// Readiness predicate polled by the driver. Pumps timers first.
    pub fn is_render_ready(&mut self) -> bool {
        self.pump_timers();
        self.readiness.is_ready()
    }

    /// Recorded page failure as an error, for the driver to report.
    pub fn render_error(&mut self) -> BridgeResult<()> {
        self.pump_timers();
        self.readiness.check()
    }

    /// Recorded page failure.
    pub fn last_error(&self) -> Option<&RenderFailure> {
        self.readiness.last_error()
    }

    /// Drain the assets of the frame just rendered. Only valid once the page is ready.
    pub fn collect_assets(&mut self) -> BridgeResult<Vec<RenderAsset>> {
        self.render_error()?;
        let pending = self.readiness.pending_count();
        if pending > 0 {
            return Err(BridgeError::protocol(format!(
                "collectAssets called before render is ready ({pending} handle(s) pending)"
            )));
        }
        Ok(self.assets.collect())
    }

    /// Capture-area override for the current frame.
    pub fn get_clip_region(&self) -> Option<ClipRegion> {
        self.clip_region
    }

    /// Canvas of the mounted composition.
    pub fn canvas(&self) -> Option<Canvas> {
        self.bundle.video_config().map(|c| c.canvas())
    }

    /// Register a pending handle from outside a render pass.
    pub fn delay_render(&mut self, label: Option<&str>) -> HandleId {
        self.readiness.register(label)
    }

    /// [`Bridge::delay_render`] with a per-handle budget.
    pub fn delay_render_with_timeout(
        &mut self,
        label: Option<&str>,
        timeout: Duration,
    ) -> HandleId {
        self.readiness.register_with_timeout(label, Some(timeout))
    }

    /// Clear a pending handle. Duplicate or unknown ids are logged and ignored.
    pub fn continue_render(&mut self, id: HandleId) -> ResolveOutcome {
        self.readiness.resolve(id)
    }

    /// Clear a pending handle because its work was abandoned.
    pub fn cancel_handle(&mut self, id: HandleId) -> ResolveOutcome {
        self.readiness.cancel(id)
    }

    /// Report an unrecoverable page error.
    pub fn cancel_render(&mut self, message: impl Into<String>) {
        self.readiness.fail(message);
    }

    /// Pending handles, ordered by id.
    pub fn pending_handles(&self) -> Vec<PendingHandleInfo> {
        self.readiness.pending()
    }

    /// Navigation: start a fresh attempt in index mode. Compositions stay registered.
    pub fn reset(&mut self) {
        self.readiness.reset();
        self.parked = None;
        self.assets.discard();
        self.clip_region = None;
        self.bundle = BundleState::Index;
        self.frame = None;
        tracing::debug!("bridge reset");
    }

    /// Unmount: cancel every pending handle and drop all state.
    pub fn teardown(mut self) -> TeardownReport {
        let report = TeardownReport {
            cancelled_handles: self.readiness.cancel_all(),
            dropped_assets: self.assets.discard(),
        };
        tracing::debug!(
            cancelled = report.cancelled_handles,
            dropped = report.dropped_assets,
            "bridge torn down"
        );
        report
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/context.rs"]
mod tests;
