//! Tenant manifest model for tenant bundles.
//!
//! A tenant manifest (`tenant.yaml`) declares an identifier, a version,
//! namespaces and the Wasm modules that make up the tenant. This crate
//! provides:
//! - Typed structs for the manifest document (YAML, JSON accepted)
//! - Module lookup by bare name, `namespace::name`, or FQMN
//! - [`WasmModuleRef`], the handle that binds raw module bytes to an entry
//!
//! Schema validation beyond "must decode" is deliberately absent; the
//! bundle codec only needs decode, encode and lookup.
//!
//! # Example
//!
//! ```
//! use tb_tenant::{TenantConfig, WasmModuleRef};
//!
//! let yaml = b"identifier: com.acme\ntenantVersion: 1\nmodules:\n  - name: hello\n";
//! let mut config = TenantConfig::unmarshal(yaml).unwrap();
//!
//! let module = config.find_module_mut("hello").unwrap();
//! assert_eq!(module.fqmn, "fqmn://com.acme/default/hello@v1");
//!
//! let fqmn = module.fqmn.clone();
//! module.wasm_ref = Some(WasmModuleRef::new("hello.wasm", fqmn, vec![0, 97, 115, 109]));
//! ```

pub mod config;
pub mod error;
pub mod module;

pub use config::{NamespaceConfig, TenantConfig, DEFAULT_NAMESPACE};
pub use error::{Result, TenantError};
pub use module::{Module, WasmModuleRef};
