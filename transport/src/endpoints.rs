//! Operation-name to URL-path mapping with layered overrides.
//!
//! # Design
//! `EndpointMap::initialize` starts from the compiled-in defaults and merges,
//! in order, each layer's `ctk.tgt.*` keys:
//!
//! 1. the named resource from the embedded table, then the same name from
//!    the filesystem (the file wins),
//! 2. environment variables,
//! 3. runtime properties supplied by the entry point (`-D key=value`).
//!
//! A later layer overwrites matching keys and adds new ones; nothing is ever
//! removed, so every default key keeps some value. The layers are gathered
//! in `EndpointSources` so tests can inject them without touching process
//! state. A map is built once and then shared read-only; mutation needs
//! `&mut`, so concurrent overrides during live traffic cannot compile.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::url::Url;

/// Prefix shared by every endpoint key in every layer.
pub const PREFIX: &str = "ctk.tgt.";

/// The key holding the server root URL.
pub const URL_ROOT_KEY: &str = "ctk.tgt.urlRoot";

/// Resource loaded when `initialize` is given a blank name.
pub const DEFAULT_RESOURCE: &str = "defaulttransport.properties";

pub const DEFAULT_URL_ROOT: &str = "http://localhost:8000/";

const DEFAULT_ENDPOINTS: &[(&str, &str)] = &[
    (URL_ROOT_KEY, DEFAULT_URL_ROOT),
    ("ctk.tgt.searchDatasets", "datasets/search"),
    ("ctk.tgt.getDataset", "datasets/{id}"),
    ("ctk.tgt.searchReads", "reads/search"),
    ("ctk.tgt.searchReadGroupSets", "readgroupsets/search"),
    ("ctk.tgt.getReadGroupSet", "readgroupsets/{id}"),
    ("ctk.tgt.getReadGroup", "readgroups/{id}"),
    ("ctk.tgt.searchReferences", "references/search"),
    ("ctk.tgt.searchReferencesets", "referencesets/search"),
    ("ctk.tgt.getReferences", "references/{id}"),
    ("ctk.tgt.getReferencesets", "referencesets/{id}"),
    ("ctk.tgt.getReferencesBases", "references/{id}/bases"),
    ("ctk.tgt.searchVariantSets", "variantsets/search"),
    ("ctk.tgt.getVariantSet", "variantsets/{id}"),
    ("ctk.tgt.searchVariants", "variants/search"),
    ("ctk.tgt.getVariant", "variants/{id}"),
    ("ctk.tgt.searchCallsets", "callsets/search"),
    ("ctk.tgt.getCallSet", "callsets/{id}"),
];

const BUNDLED_RESOURCES: &[(&str, &str)] = &[(
    DEFAULT_RESOURCE,
    include_str!("../resources/defaulttransport.properties"),
)];

/// The override layers consulted by [`EndpointMap::initialize`].
#[derive(Debug, Clone, Default)]
pub struct EndpointSources {
    /// Named resources compiled into the binary.
    pub embedded: BTreeMap<String, String>,
    /// Directory the filesystem lookup is relative to; the working directory when `None`.
    pub resource_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub properties: BTreeMap<String, String>,
}

impl EndpointSources {
    /// Bundled resources only: no environment, no properties.
    pub fn bundled() -> Self {
        Self {
            embedded: BUNDLED_RESOURCES
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Bundled resources plus the real process environment.
    pub fn from_process() -> Self {
        Self {
            env: std::env::vars().collect(),
            ..Self::bundled()
        }
    }

    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }

    pub fn with_embedded(mut self, name: &str, contents: &str) -> Self {
        self.embedded.insert(name.to_string(), contents.to_string());
        self
    }

    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    /// Load `name` from the embedded table, then from the filesystem.
    /// Filesystem entries overwrite embedded ones.
    fn load_resource(&self, name: &str) -> Result<BTreeMap<String, String>, ConfigError> {
        let mut props = BTreeMap::new();
        match self.embedded.get(name) {
            Some(text) => {
                debug!(resource = name, "loaded embedded endpoint resource");
                props.extend(parse_properties(text));
            }
            None => debug!(resource = name, "no embedded endpoint resource"),
        }

        let path = match &self.resource_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                debug!(path = %path.display(), "loaded endpoint file");
                props.extend(parse_properties(&text));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no endpoint file");
            }
            Err(source) => return Err(ConfigError::UnreadableResource { path, source }),
        }
        Ok(props)
    }
}

/// Merged mapping from endpoint key to path fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMap {
    endpoints: BTreeMap<String, String>,
}

impl Default for EndpointMap {
    fn default() -> Self {
        Self::defaults()
    }
}

impl EndpointMap {
    /// The compiled-in defaults, without any override layer.
    pub fn defaults() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Build and initialize a map in one step.
    pub fn load(resource_name: &str, sources: &EndpointSources) -> Result<Self, ConfigError> {
        let mut map = Self::defaults();
        map.initialize(resource_name, sources)?;
        Ok(map)
    }

    /// Reset to the defaults, then merge resource, environment and
    /// properties. A blank `resource_name` means [`DEFAULT_RESOURCE`].
    ///
    /// Fails when the resource exists but cannot be read, or when the merged
    /// server root is not a valid URL.
    pub fn initialize(
        &mut self,
        resource_name: &str,
        sources: &EndpointSources,
    ) -> Result<(), ConfigError> {
        *self = Self::defaults();

        let resource_name = match resource_name.trim() {
            "" => DEFAULT_RESOURCE,
            name => name,
        };

        let resource = sources.load_resource(resource_name)?;
        self.merge(resource, resource_name);
        self.merge(sources.env.iter().cloned(), "environment");
        self.merge(
            sources.properties.iter().map(|(k, v)| (k.clone(), v.clone())),
            "properties",
        );

        self.url_root()?;
        Ok(())
    }

    /// Overwrite matching `ctk.tgt.*` keys and add new ones. Other keys are ignored.
    pub fn merge<I>(&mut self, layer: I, source: &str)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = 0usize;
        for (key, value) in layer.into_iter().filter(|(k, _)| k.starts_with(PREFIX)) {
            debug!(source, key = %key, value = %value, "merging endpoint");
            self.endpoints.insert(key, value);
            merged += 1;
        }
        if merged > 0 {
            info!(source, keys = merged, "merged endpoint layer");
        }
    }

    /// Look up a path by full key (`ctk.tgt.searchReads`) or by operation
    /// name (`searchReads`).
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.endpoints.get(full_key(key).as_ref()).map(String::as_str)
    }

    /// Set one entry, by full key or operation name.
    pub fn set_endpoint(&mut self, key: &str, value: &str) {
        self.endpoints
            .insert(full_key(key).into_owned(), value.to_string());
    }

    /// The validated server root.
    pub fn url_root(&self) -> Result<&str, ConfigError> {
        let root = self
            .resolve(URL_ROOT_KEY)
            .ok_or_else(|| ConfigError::MissingUrlRoot(URL_ROOT_KEY.to_string()))?;
        Url::parse(root.trim()).map_err(|source| ConfigError::InvalidUrlRoot {
            value: root.to_string(),
            source,
        })?;
        Ok(root)
    }

    /// Set the server root, adding a trailing `/`. Blank input is ignored.
    pub fn set_url_root(&mut self, root: &str) {
        let root = root.trim();
        if root.is_empty() {
            debug!("ignoring blank server root");
            return;
        }
        let root = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{root}/")
        };
        self.endpoints.insert(URL_ROOT_KEY.to_string(), root);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.endpoints.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn full_key(key: &str) -> std::borrow::Cow<'_, str> {
    if key.starts_with(PREFIX) {
        std::borrow::Cow::Borrowed(key)
    } else {
        std::borrow::Cow::Owned(format!("{PREFIX}{key}"))
    }
}

/// Parse `key=value` lines. Accepts `:` as separator, `#`/`!` comments,
/// and a trailing `\` to continue a value on the next line. Later
/// duplicates win.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let mut logical = line.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }
        let (key, value) = match logical.find(['=', ':']) {
            Some(pos) => (&logical[..pos], &logical[pos + 1..]),
            None => (logical.as_str(), ""),
        };
        let key = key.trim();
        if !key.is_empty() {
            props.insert(key.to_string(), value.trim().to_string());
        }
    }
    props
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}
