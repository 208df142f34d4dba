use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;

use crate::{
    composition::model::{CompositionDecl, MediaDecl, VideoConfig},
    composition::resolver::CompositionResolver,
    composition::schema::PropsSchema,
    foundation::core::Fps,
    foundation::error::{BridgeError, BridgeResult},
};

/// JSON-declared composition with constant metadata.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionDef {
    /// Unique id.
    pub id: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate.
    pub fps: Fps,
    /// Duration in frames.
    pub duration_in_frames: u64,
    /// Default props; `null` or absent means `{}`.
    #[serde(default)]
    pub default_props: Value,
    /// Optional props schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<PropsSchema>,
    /// Single-frame composition.
    #[serde(default)]
    pub still: bool,
    /// Timed media.
    #[serde(default)]
    pub media: Vec<MediaDecl>,
}

impl CompositionDef {
    /// Convert into a registrable declaration.
    pub fn into_decl(self) -> CompositionDecl {
        let config = VideoConfig {
            width: self.width,
            height: self.height,
            fps: self.fps,
            duration_in_frames: self.duration_in_frames,
        };
        let defaults = match self.default_props {
            Value::Null => Value::Object(Default::default()),
            v => v,
        };
        let mut decl = CompositionDecl::constant(self.id, config).default_props(defaults);
        decl.schema = self.schema;
        decl.still = self.still;
        decl.media = self.media;
        decl
    }
}

/// A bundle's composition list as a JSON document.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionFile {
    /// Compositions in registration order.
    pub compositions: Vec<CompositionDef>,
}

impl CompositionFile {
    /// Parse from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> BridgeResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| BridgeError::serde(format!("parse composition file: {e}")))
    }

    /// Parse from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            BridgeError::validation(format!("open composition file '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Register every composition, stopping at the first invalid one.
    pub fn register_into(self, resolver: &mut CompositionResolver) -> BridgeResult<usize> {
        let n = self.compositions.len();
        for def in self.compositions {
            resolver.register(def.into_decl())?;
        }
        Ok(n)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/file.rs"]
mod tests;
