//! Schema descriptors: which parameters a configuration accepts, their
//! defaults, aliases, and validation hook.
//!
//! Schemas form an inheritance chain. [`SchemaBuilder::build`] composes the
//! resolved declaration list ancestor-first, with a descendant's declaration
//! for the same name replacing the ancestor's. Schemas are immutable once
//! built and shared via `Arc`.

use std::{
    collections::HashMap,
    fmt,
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    error::{ConfigError, Result},
    instance::ConfigInstance,
    loader,
    value::Value,
};

/// Computes a parameter's default lazily against the instance. Never stored.
pub type DefaultFn = Arc<dyn Fn(&ConfigInstance) -> Value + Send + Sync>;

/// Pushes human-readable messages for unmet invariants.
pub type ValidateFn = Arc<dyn Fn(&ConfigInstance, &mut Vec<String>) + Send + Sync>;

/// How a parameter obtains its value when no file sets it.
#[derive(Clone, Default)]
pub enum ParamDefault {
    /// Stored as `Value::Null` at construction.
    #[default]
    None,
    /// Stored eagerly at construction.
    Literal(Value),
    /// Computed on read, only when the parameter was never set.
    Computed(DefaultFn),
}

impl fmt::Debug for ParamDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Literal(v) => write!(f, "Literal({v:?})"),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// A single parameter declaration on a schema.
#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub name: String,
    pub default: ParamDefault,
    /// Set for sub-configuration parameters that accept a nested block.
    pub nested: Option<Arc<Schema>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeprecationMode {
    /// Log a warning, then delegate to the target parameter.
    Warn,
    /// Fail the set with [`ConfigError::Deprecated`].
    Error,
}

/// An alternate name for a parameter, optionally marked deprecated.
#[derive(Clone, Debug)]
pub struct AliasDecl {
    pub name: String,
    pub target: String,
    pub deprecation: Option<DeprecationMode>,
    pub message: Option<String>,
}

impl AliasDecl {
    pub(crate) fn deprecation_message(&self) -> String {
        if let Some(custom) = &self.message {
            return custom.clone();
        }
        match self.deprecation {
            Some(DeprecationMode::Error) => format!(
                "Parameter is no longer supported: {}. Please use '{}'",
                self.name, self.target
            ),
            _ => format!(
                "Deprecated parameter: {}. Please use '{}'",
                self.name, self.target
            ),
        }
    }
}

/// An immutable, inheritable descriptor of a configuration's parameters.
pub struct Schema {
    name: String,
    parent: Option<Arc<Schema>>,
    own_params: Vec<ParamDecl>,
    /// Resolved declarations, ancestor-first, overrides replaced in place.
    params: Vec<ParamDecl>,
    index: HashMap<String, usize>,
    aliases: HashMap<String, AliasDecl>,
    usual_paths: Vec<PathBuf>,
    validator: Option<ValidateFn>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Schema {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Schema>> {
        self.parent.as_ref()
    }

    /// Resolved declarations visible to this schema (ancestors' + own).
    #[must_use]
    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    /// Declarations added by this schema itself.
    #[must_use]
    pub fn own_params(&self) -> &[ParamDecl] {
        &self.own_params
    }

    /// Looks up a declaration by its primary name (aliases not followed).
    #[must_use]
    pub fn decl(&self, name: &str) -> Option<&ParamDecl> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    #[must_use]
    pub fn alias(&self, name: &str) -> Option<&AliasDecl> {
        self.aliases.get(name)
    }

    /// Candidate file locations consulted by a pathless `load()`. Not
    /// inherited from the parent schema.
    #[must_use]
    pub fn usual_paths(&self) -> &[PathBuf] {
        &self.usual_paths
    }

    /// The nearest validator walking self then ancestors, or `None`.
    #[must_use]
    pub fn validator(&self) -> Option<&ValidateFn> {
        self.validator.as_ref()
    }

    pub(crate) fn unknown(&self, name: &str) -> ConfigError {
        ConfigError::UnknownParameter {
            name: name.to_string(),
            schema: self.name.clone(),
        }
    }

    /// Loads from the first existing usual path and validates.
    pub fn load(self: &Arc<Self>) -> Result<ConfigInstance> {
        let mut conf = ConfigInstance::new(self);
        loader::load(&mut conf)?;
        loader::validate(&conf)?;
        Ok(conf)
    }

    /// Loads one file and validates.
    pub fn load_path(self: &Arc<Self>, path: impl AsRef<Path>) -> Result<ConfigInstance> {
        self.load_paths(&[path])
    }

    /// Loads several files in order into one instance (later files override
    /// earlier ones), then validates.
    pub fn load_paths<P: AsRef<Path>>(self: &Arc<Self>, paths: &[P]) -> Result<ConfigInstance> {
        let mut conf = ConfigInstance::new(self);
        loader::load_paths(&mut conf, paths)?;
        loader::validate(&conf)?;
        Ok(conf)
    }

    /// Reads all content from an already-open input, evaluates, validates.
    pub fn load_reader(self: &Arc<Self>, reader: impl Read) -> Result<ConfigInstance> {
        let mut conf = ConfigInstance::new(self);
        loader::load_reader(&mut conf, reader)?;
        loader::validate(&conf)?;
        Ok(conf)
    }
}

/// Ties an application type to its configuration schema, the counterpart of
/// declaring a nested configuration class. Inheritance of a parent type's
/// schema is expressed by building the child schema with
/// [`SchemaBuilder::parent`].
pub trait Configurable {
    fn schema() -> Arc<Schema>;

    /// Loads from the schema's usual paths.
    fn load_config() -> Result<ConfigInstance> {
        Self::schema().load()
    }

    fn load_config_paths<P: AsRef<Path>>(paths: &[P]) -> Result<ConfigInstance> {
        Self::schema().load_paths(paths)
    }
}

/// Transient builder context; all registration happens here and is discarded
/// once [`SchemaBuilder::build`] returns the finished schema.
pub struct SchemaBuilder {
    name: String,
    parent: Option<Arc<Schema>>,
    params: Vec<ParamDecl>,
    aliases: Vec<AliasDecl>,
    usual_paths: Vec<PathBuf>,
    validator: Option<ValidateFn>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            params: Vec::new(),
            aliases: Vec::new(),
            usual_paths: Vec::new(),
            validator: None,
        }
    }

    /// Inherit every declaration of `parent`; own declarations for the same
    /// name override the inherited ones.
    #[must_use]
    pub fn parent(mut self, parent: &Arc<Schema>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Declares a parameter with no default (reads as `Value::Null` until
    /// set).
    #[must_use]
    pub fn param(self, name: impl Into<String>) -> Self {
        self.push_param(ParamDecl {
            name: name.into(),
            default: ParamDefault::None,
            nested: None,
        })
    }

    /// Declares a parameter with a literal default, applied eagerly at
    /// instance construction.
    #[must_use]
    pub fn param_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.push_param(ParamDecl {
            name: name.into(),
            default: ParamDefault::Literal(default.into()),
            nested: None,
        })
    }

    /// Declares a parameter whose default is computed against the instance
    /// at read time; the result is never stored.
    #[must_use]
    pub fn param_computed(
        self,
        name: impl Into<String>,
        default: impl Fn(&ConfigInstance) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.push_param(ParamDecl {
            name: name.into(),
            default: ParamDefault::Computed(Arc::new(default)),
            nested: None,
        })
    }

    /// Declares a sub-configuration parameter accepting a nested block.
    #[must_use]
    pub fn nested(self, name: impl Into<String>, schema: &Arc<Schema>) -> Self {
        self.push_param(ParamDecl {
            name: name.into(),
            default: ParamDefault::None,
            nested: Some(Arc::clone(schema)),
        })
    }

    /// Plain alternate name: setting or reading `alias` targets `target`.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.push(AliasDecl {
            name: alias.into(),
            target: target.into(),
            deprecation: None,
            message: None,
        });
        self
    }

    /// Legacy name that still works but logs a warning when set.
    #[must_use]
    pub fn deprecated_warn(
        mut self,
        old: impl Into<String>,
        target: impl Into<String>,
        message: Option<&str>,
    ) -> Self {
        self.aliases.push(AliasDecl {
            name: old.into(),
            target: target.into(),
            deprecation: Some(DeprecationMode::Warn),
            message: message.map(str::to_string),
        });
        self
    }

    /// Legacy name whose use fails the set with an error naming the
    /// replacement. Reads still return the target's value.
    #[must_use]
    pub fn deprecated_error(
        mut self,
        old: impl Into<String>,
        target: impl Into<String>,
        message: Option<&str>,
    ) -> Self {
        self.aliases.push(AliasDecl {
            name: old.into(),
            target: target.into(),
            deprecation: Some(DeprecationMode::Error),
            message: message.map(str::to_string),
        });
        self
    }

    /// Ordered candidate paths for a pathless `load()`.
    #[must_use]
    pub fn usual_paths<P: Into<PathBuf>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.usual_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Validation hook run on every instance of this schema during the
    /// validation walk. Overrides any inherited validator.
    #[must_use]
    pub fn validate(
        mut self,
        f: impl Fn(&ConfigInstance, &mut Vec<String>) + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(f));
        self
    }

    fn push_param(mut self, decl: ParamDecl) -> Self {
        // Redeclaring a name in the same builder replaces, keeping position.
        if let Some(existing) = self.params.iter_mut().find(|p| p.name == decl.name) {
            *existing = decl;
        } else {
            self.params.push(decl);
        }
        self
    }

    /// Composes the resolved declaration set and finishes the schema.
    ///
    /// Fails with [`ConfigError::Argument`] if an alias targets a parameter
    /// that is not declared anywhere in the chain.
    pub fn build(self) -> Result<Arc<Schema>> {
        let mut params: Vec<ParamDecl> = self
            .parent
            .as_ref()
            .map(|p| p.params.clone())
            .unwrap_or_default();
        let mut index: HashMap<String, usize> = params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i))
            .collect();

        for decl in &self.params {
            match index.get(&decl.name) {
                Some(&i) => params[i] = decl.clone(),
                None => {
                    index.insert(decl.name.clone(), params.len());
                    params.push(decl.clone());
                },
            }
        }

        let mut aliases: HashMap<String, AliasDecl> = self
            .parent
            .as_ref()
            .map(|p| p.aliases.clone())
            .unwrap_or_default();
        for alias in self.aliases {
            if !index.contains_key(&alias.target) {
                return Err(ConfigError::Argument(format!(
                    "alias '{}' on schema '{}' targets undeclared parameter '{}'",
                    alias.name, self.name, alias.target
                )));
            }
            aliases.insert(alias.name.clone(), alias);
        }

        let validator = self
            .validator
            .or_else(|| self.parent.as_ref().and_then(|p| p.validator.clone()));

        Ok(Arc::new(Schema {
            name: self.name,
            parent: self.parent,
            own_params: self.params,
            params,
            index,
            aliases,
            usual_paths: self.usual_paths,
            validator,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn resolved_params_compose_ancestor_first() {
        let base = Schema::builder("base")
            .param("param1")
            .param("param2")
            .build()
            .unwrap();
        let sub = Schema::builder("sub")
            .parent(&base)
            .param("param3")
            .build()
            .unwrap();

        let names: Vec<_> = sub.params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["param1", "param2", "param3"]);
        assert_eq!(sub.own_params().len(), 1);
    }

    #[test]
    fn descendant_declaration_replaces_in_place() {
        let base = Schema::builder("base")
            .param_default("timeout", 10)
            .param("host")
            .build()
            .unwrap();
        let sub = Schema::builder("sub")
            .parent(&base)
            .param_default("timeout", 60)
            .build()
            .unwrap();

        let names: Vec<_> = sub.params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["timeout", "host"]);
        match &sub.decl("timeout").unwrap().default {
            ParamDefault::Literal(v) => assert_eq!(v, &Value::Int(60)),
            other => panic!("unexpected default: {other:?}"),
        }
    }

    #[test]
    fn redeclaring_in_same_builder_overwrites() {
        let schema = Schema::builder("s")
            .param_default("p", 1)
            .param_default("p", 2)
            .build()
            .unwrap();
        assert_eq!(schema.params().len(), 1);
        match &schema.decl("p").unwrap().default {
            ParamDefault::Literal(v) => assert_eq!(v, &Value::Int(2)),
            other => panic!("unexpected default: {other:?}"),
        }
    }

    #[test]
    fn alias_to_undeclared_parameter_is_rejected() {
        let err = Schema::builder("s")
            .param("new_name")
            .alias("old_name", "missing")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Argument(_)), "got {err:?}");
    }

    #[test]
    fn validator_is_inherited_unless_overridden() {
        let base = Schema::builder("base")
            .param("p")
            .validate(|_, errors| errors.push("from base".into()))
            .build()
            .unwrap();
        let sub = Schema::builder("sub").parent(&base).build().unwrap();
        let overridden = Schema::builder("sub2")
            .parent(&base)
            .validate(|_, errors| errors.push("from sub2".into()))
            .build()
            .unwrap();

        let conf = ConfigInstance::new(&sub);
        let mut errors = Vec::new();
        conf.run_validate(&mut errors);
        assert_eq!(errors, ["from base"]);

        let conf = ConfigInstance::new(&overridden);
        let mut errors = Vec::new();
        conf.run_validate(&mut errors);
        assert_eq!(errors, ["from sub2"]);
    }

    #[test]
    fn usual_paths_are_not_inherited() {
        let base = Schema::builder("base")
            .param("p")
            .usual_paths(["/etc/base.conf"])
            .build()
            .unwrap();
        let sub = Schema::builder("sub").parent(&base).build().unwrap();
        assert!(sub.usual_paths().is_empty());
    }
}
