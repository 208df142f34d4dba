//! In-page synchronization layer for deterministic frame capture.
//!
//! An external capture driver (a headless browser controller) drives a page through the
//! [`Bridge`]. Between captures it:
//!
//! 1. selects a [`BundleState`] (index, evaluation or a single mounted composition)
//! 2. advances the frame with [`Bridge::set_frame`]
//! 3. polls [`Bridge::is_render_ready`] until every pending handle registered by the component
//!    tree has been continued
//! 4. drains the frame's timed media with [`Bridge::collect_assets`]
//!
//! Composition metadata (dimensions, duration, fps, resolved props) is computed on demand by the
//! [`CompositionResolver`] and returned as serializable [`CompositionMetadata`].
//!
//! Everything runs single-threaded and cooperatively. Handle deadlines live in a timer wheel that
//! only fires when the bridge pumps it, against an injectable [`Clock`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod bridge;
mod composition;
mod foundation;
mod readiness;

pub use assets::collector::{AssetCollector, MediaKind, RenderAsset};
pub use bridge::context::{Bridge, TeardownReport};
pub use bridge::env::{BRIDGE_VERSION, PageEnv, StaticFile, normalize_static_path};
pub use bridge::host::{DeclaredMediaHost, FnHost, RenderHost, RenderPass, RenderScope, host_fn};
pub use bridge::state::{BundleState, ClipRegion};
pub use composition::file::{CompositionDef, CompositionFile};
pub use composition::model::{
    CalculateCtx, CalculateMetadataFn, CalculateStep, CalculatedMetadata, Calculation,
    CompositionDecl, CompositionMetadata, MediaDecl, MetadataSource, VideoConfig,
    validate_composition_id,
};
pub use composition::resolver::{CompositionResolver, merge_props};
pub use composition::schema::{PropsSchema, SchemaError, SchemaErrors};
pub use foundation::clock::{Clock, ManualClock, SystemClock};
pub use foundation::core::{Canvas, Fps, FrameIndex, FrameRange, HandleId, Rect};
pub use foundation::error::{BridgeError, BridgeResult};
pub use readiness::registry::{
    DEFAULT_HANDLE_TIMEOUT, PendingHandleInfo, ReadinessRegistry, RenderFailure, ResolveOutcome,
};
