//! Runtime value store for one schema instance.

use std::{collections::HashMap, sync::Arc};

use {
    serde::ser::{Serialize, SerializeMap, Serializer},
    tracing::warn,
};

use crate::{
    error::{ConfigError, Result},
    schema::{DeprecationMode, ParamDefault, Schema},
    value::Value,
};

/// Holds the resolved parameter values for one schema, plus optional parent
/// context. Created once per load call (or explicitly), mutated in place by
/// zero or more file loads.
#[derive(Clone, Debug)]
pub struct ConfigInstance {
    schema: Arc<Schema>,
    values: HashMap<String, Value>,
    /// Advisory context only; never traversed by the validation walk.
    parent: Option<Box<ConfigInstance>>,
}

impl ConfigInstance {
    /// Constructs an instance with every static default applied in resolved
    /// declaration order. Computed defaults are left unset.
    #[must_use]
    pub fn new(schema: &Arc<Schema>) -> Self {
        let mut values = HashMap::new();
        for decl in schema.params() {
            match &decl.default {
                ParamDefault::None => {
                    values.insert(decl.name.clone(), Value::Null);
                },
                ParamDefault::Literal(v) => {
                    values.insert(decl.name.clone(), v.clone());
                },
                ParamDefault::Computed(_) => {},
            }
        }
        Self {
            schema: Arc::clone(schema),
            values,
            parent: None,
        }
    }

    /// Like [`ConfigInstance::new`] with parent context attached.
    ///
    /// Fails with [`ConfigError::Argument`] unless `parent` is a
    /// configuration value.
    pub fn with_parent(schema: &Arc<Schema>, parent: Value) -> Result<Self> {
        match parent {
            Value::Config(parent) => Ok(Self::new_child(schema, *parent)),
            other => Err(ConfigError::Argument(format!(
                "parent must be a configuration instance, got {}",
                other.kind()
            ))),
        }
    }

    pub(crate) fn new_child(schema: &Arc<Schema>, parent: ConfigInstance) -> Self {
        let mut conf = Self::new(schema);
        conf.parent = Some(Box::new(parent));
        conf
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[must_use]
    pub fn parent(&self) -> Option<&ConfigInstance> {
        self.parent.as_deref()
    }

    /// Whether a value is currently stored under `name` (aliases followed).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name)
            .is_ok_and(|resolved| self.values.contains_key(resolved))
    }

    /// Returns the stored value, else the computed default, else fails with
    /// [`ConfigError::UnknownParameter`] for undeclared names.
    pub fn get(&self, name: &str) -> Result<Value> {
        let resolved = self.resolve(name)?;
        if let Some(v) = self.values.get(resolved) {
            return Ok(v.clone());
        }
        match self.schema.decl(resolved).map(|d| &d.default) {
            Some(ParamDefault::Computed(f)) => Ok(f(self)),
            _ => Ok(Value::Null),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<String> {
        let v = self.get(name)?;
        v.as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(name, "a string", &v))
    }

    pub fn get_i64(&self, name: &str) -> Result<i64> {
        let v = self.get(name)?;
        v.as_i64().ok_or_else(|| mismatch(name, "an integer", &v))
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        let v = self.get(name)?;
        v.as_f64().ok_or_else(|| mismatch(name, "a number", &v))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let v = self.get(name)?;
        v.as_bool().ok_or_else(|| mismatch(name, "a boolean", &v))
    }

    pub fn get_config(&self, name: &str) -> Result<ConfigInstance> {
        let v = self.get(name)?;
        v.as_config()
            .cloned()
            .ok_or_else(|| mismatch(name, "a configuration", &v))
    }

    /// Stores `value` under `name`, overwriting any previous value. Later
    /// writes win, whether they come from defaults, a first file, or a
    /// later file.
    ///
    /// Deprecated aliases either warn and delegate to their target, or fail
    /// with [`ConfigError::Deprecated`].
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let target = if self.schema.decl(name).is_some() {
            name.to_string()
        } else if let Some(alias) = self.schema.alias(name) {
            match alias.deprecation {
                Some(DeprecationMode::Error) => {
                    return Err(ConfigError::Deprecated(alias.deprecation_message()));
                },
                Some(DeprecationMode::Warn) => {
                    warn!(
                        parameter = %alias.name,
                        replacement = %alias.target,
                        "{}",
                        alias.deprecation_message()
                    );
                },
                None => {},
            }
            alias.target.clone()
        } else {
            return Err(self.schema.unknown(name));
        };
        self.values.insert(target, value.into());
        Ok(())
    }

    /// Stored values in declaration order. Computed defaults that were never
    /// set do not appear.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .params()
            .iter()
            .filter_map(|d| self.values.get(&d.name).map(|v| (d.name.as_str(), v)))
    }

    /// Runs the schema's validator (nearest in the inheritance chain),
    /// pushing messages for unmet invariants. No-op when none is set.
    pub fn run_validate(&self, errors: &mut Vec<String>) {
        if let Some(validator) = self.schema.validator() {
            validator(self, errors);
        }
    }

    /// Exports the stored values (and nested configurations) as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries()
                .map(|(name, v)| (name.to_string(), v.to_json()))
                .collect(),
        )
    }

    fn resolve<'a>(&'a self, name: &'a str) -> Result<&'a str> {
        if self.schema.decl(name).is_some() {
            Ok(name)
        } else if let Some(alias) = self.schema.alias(name) {
            Ok(alias.target.as_str())
        } else {
            Err(self.schema.unknown(name))
        }
    }
}

impl Serialize for ConfigInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.entries() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn mismatch(name: &str, expected: &'static str, actual: &Value) -> ConfigError {
    ConfigError::TypeMismatch {
        name: name.to_string(),
        expected,
        actual: actual.kind(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn schema() -> Arc<Schema> {
        Schema::builder("test")
            .param("param1")
            .param_default("param2", 2)
            .param_computed("derived", |c| {
                let n = c.get_i64("param2").unwrap_or(0);
                Value::Int(n * 10)
            })
            .build()
            .unwrap()
    }

    #[test]
    fn static_defaults_applied_at_construction() {
        let conf = ConfigInstance::new(&schema());
        assert_eq!(conf.get("param1").unwrap(), Value::Null);
        assert_eq!(conf.get("param2").unwrap(), Value::Int(2));
    }

    #[test]
    fn computed_default_reads_through_without_storing() {
        let mut conf = ConfigInstance::new(&schema());
        assert_eq!(conf.get("derived").unwrap(), Value::Int(20));
        assert!(!conf.contains("derived"));

        conf.set("derived", 7).unwrap();
        assert_eq!(conf.get("derived").unwrap(), Value::Int(7));
    }

    #[test]
    fn later_set_wins() {
        let mut conf = ConfigInstance::new(&schema());
        conf.set("param1", 1).unwrap();
        conf.set("param1", "two").unwrap();
        assert_eq!(conf.get("param1").unwrap(), Value::Str("two".into()));
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let mut conf = ConfigInstance::new(&schema());
        assert!(matches!(
            conf.get("nope"),
            Err(ConfigError::UnknownParameter { .. })
        ));
        assert!(matches!(
            conf.set("nope", 1),
            Err(ConfigError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn parent_must_be_a_configuration() {
        let s = schema();
        let err = ConfigInstance::with_parent(&s, Value::Int(1)).unwrap_err();
        assert!(matches!(err, ConfigError::Argument(_)), "got {err:?}");

        let parent = ConfigInstance::new(&s);
        let child = ConfigInstance::with_parent(&s, Value::from(parent)).unwrap();
        assert!(child.parent().is_some());
    }

    #[test]
    fn alias_reads_and_writes_target() {
        let s = Schema::builder("s")
            .param("new_name")
            .alias("old_name", "new_name")
            .build()
            .unwrap();
        let mut conf = ConfigInstance::new(&s);
        conf.set("old_name", 5).unwrap();
        assert_eq!(conf.get("new_name").unwrap(), Value::Int(5));
        assert_eq!(conf.get("old_name").unwrap(), Value::Int(5));
    }

    #[test]
    fn deprecated_error_alias_refuses_writes_but_reads() {
        let s = Schema::builder("s")
            .param_default("new_name", 1)
            .deprecated_error("old_name", "new_name", None)
            .build()
            .unwrap();
        let mut conf = ConfigInstance::new(&s);
        let err = conf.set("old_name", 2).unwrap_err();
        assert!(matches!(err, ConfigError::Deprecated(_)), "got {err:?}");
        assert_eq!(conf.get("old_name").unwrap(), Value::Int(1));
    }

    #[test]
    fn deprecated_warn_alias_delegates() {
        let s = Schema::builder("s")
            .param("new_name")
            .deprecated_warn("old_name", "new_name", None)
            .build()
            .unwrap();
        let mut conf = ConfigInstance::new(&s);
        conf.set("old_name", 3).unwrap();
        assert_eq!(conf.get("new_name").unwrap(), Value::Int(3));
    }

    #[test]
    fn typed_getter_mismatch() {
        let mut conf = ConfigInstance::new(&schema());
        conf.set("param1", "text").unwrap();
        let err = conf.get_i64("param1").unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { .. }), "got {err:?}");
        assert_eq!(conf.get_str("param1").unwrap(), "text");
    }

    #[test]
    fn entries_follow_declaration_order() {
        let conf = ConfigInstance::new(&schema());
        let names: Vec<_> = conf.entries().map(|(n, _)| n).collect();
        assert_eq!(names, ["param1", "param2"]);
    }

    #[test]
    fn json_export_shape() {
        let mut conf = ConfigInstance::new(&schema());
        conf.set("param1", "x").unwrap();
        assert_eq!(
            conf.to_json(),
            serde_json::json!({"param1": "x", "param2": 2})
        );
    }
}
