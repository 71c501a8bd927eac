//! Tenant manifest document and module lookup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Module, Result, TenantError};

/// Namespace used when a module or manifest does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// A namespace declared in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Namespace name.
    pub name: String,

    /// Fields this model does not interpret (workflows, queries, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAMESPACE.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// The decoded `tenant.yaml` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    /// Tenant identifier, e.g. `com.acme.api`.
    pub identifier: String,

    /// Tenant version.
    #[serde(default)]
    pub tenant_version: i64,

    /// The namespace bare module names resolve against first.
    #[serde(default)]
    pub default_namespace: NamespaceConfig,

    /// Additional namespaces.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<NamespaceConfig>,

    /// Declared modules.
    #[serde(default)]
    pub modules: Vec<Module>,

    /// Fields this model does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl TenantConfig {
    /// Create an empty manifest.
    pub fn new(identifier: impl Into<String>, tenant_version: i64) -> Self {
        Self {
            identifier: identifier.into(),
            tenant_version,
            default_namespace: NamespaceConfig::default(),
            namespaces: Vec::new(),
            modules: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Add a module, computing its FQMN if it has none.
    pub fn with_module(mut self, mut module: Module) -> Self {
        if module.fqmn.is_empty() {
            module.fqmn = self.fqmn_for(&module);
        }
        self.modules.push(module);
        self
    }

    /// Decode a manifest from YAML (or JSON) bytes.
    ///
    /// Modules without an explicit FQMN get one computed from the
    /// identifier, namespace, name and reference.
    pub fn unmarshal(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        if text.trim().is_empty() {
            return Err(TenantError::Empty);
        }

        let mut config: Self = serde_yaml::from_str(text)?;
        config.fill_fqmns();
        Ok(config)
    }

    /// Encode the manifest as YAML.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        Ok(serde_yaml::to_string(self)?.into_bytes())
    }

    /// Compute the FQMN for a module of this tenant.
    ///
    /// Format: `fqmn://{identifier}/{namespace}/{name}@{ref}` where `ref`
    /// is the module's reference, or `v{tenant_version}` when absent.
    pub fn fqmn_for(&self, module: &Module) -> String {
        let reference = module
            .reference
            .clone()
            .unwrap_or_else(|| format!("v{}", self.tenant_version));
        format!(
            "fqmn://{}/{}/{}@{}",
            self.identifier, module.namespace, module.name, reference
        )
    }

    fn fill_fqmns(&mut self) {
        let computed: Vec<Option<String>> = self
            .modules
            .iter()
            .map(|m| m.fqmn.is_empty().then(|| self.fqmn_for(m)))
            .collect();

        for (module, fqmn) in self.modules.iter_mut().zip(computed) {
            if let Some(fqmn) = fqmn {
                module.fqmn = fqmn;
            }
        }
    }

    /// Find a module by name.
    ///
    /// Lookup order: exact FQMN, `namespace::name`, bare name in the
    /// default namespace, then a bare name that matches exactly one
    /// module across all namespaces.
    pub fn find_module(&self, name: &str) -> Option<&Module> {
        self.module_index(name).map(|i| &self.modules[i])
    }

    /// Mutable variant of [`find_module`](Self::find_module).
    pub fn find_module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.module_index(name).map(move |i| &mut self.modules[i])
    }

    fn module_index(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }

        if let Some(i) = self.modules.iter().position(|m| m.fqmn == name) {
            return Some(i);
        }

        if let Some((namespace, bare)) = name.split_once("::") {
            return self
                .modules
                .iter()
                .position(|m| m.namespace == namespace && m.name == bare);
        }

        let default_ns = self.default_namespace.name.as_str();
        if let Some(i) = self
            .modules
            .iter()
            .position(|m| m.name == name && m.namespace == default_ns)
        {
            return Some(i);
        }

        let mut matches = self
            .modules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.name == name);
        match (matches.next(), matches.next()) {
            (Some((i, _)), None) => Some(i),
            _ => None,
        }
    }

    /// Number of modules with a bound payload.
    pub fn resolved_module_count(&self) -> usize {
        self.modules.iter().filter(|m| m.is_resolved()).count()
    }
}
