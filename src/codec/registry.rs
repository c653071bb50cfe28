//! # Codec Registry
//!
//! Name to constructor table. The application builds one at startup with
//! [`CodecRegistry::with_builtin_codecs`], optionally registers more, and then
//! hands it to the pipelines by shared reference.

use std::collections::BTreeMap;

use tracing::debug;

use super::{Codec, DownsampleCodec, BILINEAR, GPU_BILINEAR, REFERENCE};
use crate::error::{VcError, VcResult};

/// Builds a fresh, uninitialized codec.
pub type CodecConstructor = Box<dyn Fn() -> Box<dyn Codec> + Send + Sync>;

/// Table of available codecs. `Default` is empty.
#[derive(Default)]
pub struct CodecRegistry {
    constructors: BTreeMap<String, CodecConstructor>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `Reference`, `Bilinear` and `GpuBilinear`.
    pub fn with_builtin_codecs() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        let builtins: [(&str, fn() -> Box<dyn Codec>); 3] = [
            (REFERENCE, || -> Box<dyn Codec> { Box::new(DownsampleCodec::reference()) }),
            (BILINEAR, || -> Box<dyn Codec> { Box::new(DownsampleCodec::bilinear()) }),
            (GPU_BILINEAR, || -> Box<dyn Codec> { Box::new(DownsampleCodec::gpu_bilinear()) }),
        ];
        for (name, ctor) in builtins {
            self.constructors.insert(name.to_string(), Box::new(ctor));
        }
    }

    /// Add a codec under `name`. Fails if the name is taken.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> VcResult<()>
    where
        F: Fn() -> Box<dyn Codec> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.constructors.contains_key(&name) {
            return Err(VcError::config(
                "algorithm",
                format!("codec '{name}' is already registered"),
            ));
        }
        debug!(codec = %name, "codec registered");
        self.constructors.insert(name, Box::new(constructor));
        Ok(())
    }

    /// Remove `name`. Returns whether it was present.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.constructors.remove(name).is_some()
    }

    /// Construct the codec registered as `name`.
    pub fn create(&self, name: &str) -> Option<Box<dyn Codec>> {
        self.constructors.get(name).map(|ctor| ctor())
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    pub fn available(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        let registry = CodecRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.create(REFERENCE).is_none());
    }

    #[test]
    fn builtins_are_listed_sorted() {
        let registry = CodecRegistry::with_builtin_codecs();
        assert_eq!(registry.list(), ["Bilinear", "GpuBilinear", "Reference"]);
        assert!(registry.available("Bilinear"));
        assert!(!registry.available("bilinear"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = CodecRegistry::with_builtin_codecs();
        let err = registry
            .register(BILINEAR, || -> Box<dyn Codec> { Box::new(DownsampleCodec::bilinear()) })
            .unwrap_err();
        assert_eq!(err.category(), "config");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn register_create_unregister() {
        let mut registry = CodecRegistry::new();
        registry
            .register("Custom", || -> Box<dyn Codec> {
                Box::new(DownsampleCodec::new(
                    "Custom",
                    42,
                    vc_resample::bilinear::BilinearResampler::new(),
                ))
            })
            .unwrap();

        let codec = registry.create("Custom").unwrap();
        assert_eq!(codec.name(), "Custom");
        assert_eq!(codec.algorithm_id(), 42);

        assert!(registry.unregister("Custom"));
        assert!(!registry.unregister("Custom"));
        assert!(!registry.available("Custom"));
    }
}
