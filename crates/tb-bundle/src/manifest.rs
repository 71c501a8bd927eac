//! Manifest capability the bundle codec depends on.
//!
//! The codec never looks inside the manifest beyond decode, encode and
//! "find module by name". [`TenantConfig`] is the stock implementation.

use tb_tenant::{Module, TenantConfig, TenantError, WasmModuleRef};

/// A decodable manifest whose modules can receive binary payloads.
pub trait TenantManifest: Sized {
    /// Module entry type returned by lookups.
    type Module: ModuleEntry;

    /// Decode/encode error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Decode manifest bytes as stored in the archive.
    fn decode(bytes: &[u8]) -> Result<Self, Self::Error>;

    /// Encode the manifest for writing into an archive.
    fn encode(&self) -> Result<Vec<u8>, Self::Error>;

    /// Find the module a binary entry's logical name refers to.
    fn find_module_mut(&mut self, name: &str) -> Option<&mut Self::Module>;
}

/// A manifest module that a binary payload can bind to.
pub trait ModuleEntry {
    /// Fully-qualified module name.
    fn fqmn(&self) -> &str;

    /// Attach the binary payload.
    fn attach(&mut self, module_ref: WasmModuleRef);

    /// The attached payload, if any.
    fn module_ref(&self) -> Option<&WasmModuleRef>;
}

impl TenantManifest for TenantConfig {
    type Module = Module;
    type Error = TenantError;

    fn decode(bytes: &[u8]) -> Result<Self, Self::Error> {
        TenantConfig::unmarshal(bytes)
    }

    fn encode(&self) -> Result<Vec<u8>, Self::Error> {
        self.marshal()
    }

    fn find_module_mut(&mut self, name: &str) -> Option<&mut Module> {
        TenantConfig::find_module_mut(self, name)
    }
}

impl ModuleEntry for Module {
    fn fqmn(&self) -> &str {
        &self.fqmn
    }

    fn attach(&mut self, module_ref: WasmModuleRef) {
        self.wasm_ref = Some(module_ref);
    }

    fn module_ref(&self) -> Option<&WasmModuleRef> {
        self.wasm_ref.as_ref()
    }
}
