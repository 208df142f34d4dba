use std::collections::HashMap;

use serde_json::Value;
use xxhash_rust::xxh3::Xxh3;

use crate::{
    composition::model::{
        CalculateCtx, CalculateStep, Calculation, CompositionDecl, CompositionMetadata,
        MetadataSource, VideoConfig,
    },
    foundation::error::{BridgeError, BridgeResult},
    readiness::registry::ReadinessRegistry,
};

const XXH3_SEED: u64 = 0x5f1d_c0a4_93b2_7e68;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PropsFingerprint {
    hi: u64,
    lo: u64,
}

fn fingerprint_props(composition: &str, props: &Value) -> BridgeResult<PropsFingerprint> {
    // serde_json maps are ordered, so the text is canonical for equal values.
    let text = serde_json::to_string(props)
        .map_err(|e| BridgeError::serde(format!("serialize props for fingerprint: {e}")))?;
    let mut h = Xxh3::with_seed(XXH3_SEED);
    h.update(composition.as_bytes());
    h.update(&[0]);
    h.update(text.as_bytes());
    let v = h.digest128();
    Ok(PropsFingerprint {
        hi: (v >> 64) as u64,
        lo: v as u64,
    })
}

/// Shallow merge: top-level keys of `runtime` override `defaults`.
///
/// A non-object `runtime` replaces the defaults wholesale; `null` keeps them.
pub fn merge_props(defaults: &Value, runtime: &Value) -> Value {
    match (defaults, runtime) {
        (_, Value::Null) => defaults.clone(),
        (Value::Object(d), Value::Object(r)) => {
            let mut out = d.clone();
            for (k, v) in r {
                out.insert(k.clone(), v.clone());
            }
            Value::Object(out)
        }
        (_, r) => r.clone(),
    }
}

/// Registered compositions plus on-demand metadata calculation.
#[derive(Debug, Default)]
pub struct CompositionResolver {
    decls: Vec<CompositionDecl>,
    generation: u64,
    cache: HashMap<(String, PropsFingerprint), (u64, CompositionMetadata)>,
}

impl CompositionResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a composition. Ids must be unique.
    pub fn register(&mut self, decl: CompositionDecl) -> BridgeResult<()> {
        decl.validate()?;
        if self.decls.iter().any(|d| d.id == decl.id) {
            return Err(BridgeError::validation(format!(
                "duplicate composition id '{}'",
                decl.id
            )));
        }
        tracing::debug!(id = %decl.id, "composition registered");
        self.decls.push(decl);
        self.generation += 1;
        Ok(())
    }

    /// Remove a composition. Returns `false` if it was not registered.
    pub fn unregister(&mut self, id: &str) -> bool {
        let before = self.decls.len();
        self.decls.retain(|d| d.id != id);
        let removed = self.decls.len() != before;
        if removed {
            self.generation += 1;
        }
        removed
    }

    /// Remove every composition.
    pub fn clear(&mut self) {
        self.decls.clear();
        self.cache.clear();
        self.generation += 1;
    }

    /// Registered ids in registration order.
    pub fn names(&self) -> Vec<String> {
        self.decls.iter().map(|d| d.id.clone()).collect()
    }

    /// Look up a declaration.
    pub fn get(&self, id: &str) -> Option<&CompositionDecl> {
        self.decls.iter().find(|d| d.id == id)
    }

    /// Look up a declaration or fail with [`BridgeError::CompositionNotFound`].
    pub fn require(&self, id: &str) -> BridgeResult<&CompositionDecl> {
        self.get(id).ok_or_else(|| BridgeError::CompositionNotFound {
            name: id.to_owned(),
            available: self.names(),
        })
    }

    /// Resolve metadata for `name` with `runtime_props` merged over the declared defaults.
    ///
    /// Always recomputes. A computed declaration may answer [`Calculation::Pending`] after
    /// registering handles on `readiness`; call again with the same inputs once they have been
    /// continued.
    #[tracing::instrument(skip(self, runtime_props, readiness))]
    pub fn calculate(
        &self,
        name: &str,
        runtime_props: &Value,
        readiness: &mut ReadinessRegistry,
    ) -> BridgeResult<Calculation> {
        let decl = self.require(name)?;
        let props = merge_props(&decl.default_props, runtime_props);
        validate_props(decl, &props)?;

        let (mut config, resolved) = match &decl.metadata {
            MetadataSource::Constant(config) => (*config, props),
            MetadataSource::Computed(f) => {
                let mark = readiness.next_handle_id();
                let mut ctx = CalculateCtx::new(&decl.id, &props, &decl.default_props, readiness);
                let out = match f(&mut ctx)? {
                    CalculateStep::Ready(out) => out,
                    CalculateStep::Pending => {
                        let waiting = readiness.pending_since(mark);
                        if waiting.is_empty() {
                            return Err(BridgeError::validation(format!(
                                "metadata of '{}' is pending but no handle is outstanding",
                                decl.id
                            )));
                        }
                        tracing::debug!(handles = waiting.len(), "metadata pending");
                        return Ok(Calculation::Pending);
                    }
                };
                let resolved = match out.props {
                    Some(p) => {
                        validate_props(decl, &p)?;
                        p
                    }
                    None => props,
                };
                (out.config, resolved)
            }
        };
        if decl.still {
            config.duration_in_frames = 1;
        }
        config.validate(&decl.id)?;

        metadata_from(decl, config, &resolved).map(Calculation::Ready)
    }

    /// Like [`CompositionResolver::calculate`] but memoized per `(name, props)`.
    ///
    /// Entries are dropped when the registered set changes. Only results computed without
    /// registering any handle are stored.
    pub fn calculate_cached(
        &mut self,
        name: &str,
        runtime_props: &Value,
        readiness: &mut ReadinessRegistry,
    ) -> BridgeResult<Calculation> {
        let key = (name.to_owned(), fingerprint_props(name, runtime_props)?);
        if let Some((generation, meta)) = self.cache.get(&key)
            && *generation == self.generation
        {
            tracing::trace!(name, "metadata cache hit");
            return Ok(Calculation::Ready(meta.clone()));
        }

        let mark = readiness.next_handle_id();
        let out = self.calculate(name, runtime_props, readiness)?;
        if let Calculation::Ready(meta) = &out
            && readiness.next_handle_id() == mark
        {
            self.cache.retain(|_, (g, _)| *g == self.generation);
            self.cache.insert(key, (self.generation, meta.clone()));
        }
        Ok(out)
    }

    /// Resolve every registered composition with the same input props, in registration order.
    ///
    /// Every composition is invoked even when an earlier one is pending, so all of their handles
    /// are registered in the same pass.
    pub fn calculate_all(
        &self,
        input_props: &Value,
        readiness: &mut ReadinessRegistry,
    ) -> BridgeResult<Calculation<Vec<CompositionMetadata>>> {
        let mut out = Vec::with_capacity(self.decls.len());
        let mut pending = false;
        for d in &self.decls {
            match self.calculate(&d.id, input_props, readiness)? {
                Calculation::Ready(meta) => out.push(meta),
                Calculation::Pending => pending = true,
            }
        }
        Ok(if pending {
            Calculation::Pending
        } else {
            Calculation::Ready(out)
        })
    }
}

fn validate_props(decl: &CompositionDecl, props: &Value) -> BridgeResult<()> {
    let Some(schema) = &decl.schema else {
        return Ok(());
    };
    schema
        .validate(props)
        .map_err(|errs| BridgeError::SchemaValidation {
            composition: decl.id.clone(),
            path: errs.errors.first().map(|e| e.path()).unwrap_or_default(),
            message: errs.to_string(),
        })
}

fn metadata_from(
    decl: &CompositionDecl,
    config: VideoConfig,
    resolved: &Value,
) -> BridgeResult<CompositionMetadata> {
    let ser = |v: &Value, what: &str| {
        serde_json::to_string(v)
            .map_err(|e| BridgeError::serde(format!("serialize {what} of '{}': {e}", decl.id)))
    };
    Ok(CompositionMetadata {
        id: decl.id.clone(),
        width: config.width,
        height: config.height,
        fps: config.fps,
        duration_in_frames: config.duration_in_frames,
        serialized_default_props: ser(&decl.default_props, "default props")?,
        serialized_resolved_props: ser(resolved, "resolved props")?,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/composition/resolver.rs"]
mod tests;
