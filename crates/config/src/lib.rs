//! Hierarchical configuration schema engine.
//!
//! Applications declare typed parameters on [`Schema`]s (which may inherit
//! from one another), then load script-like configuration files into
//! [`ConfigInstance`]s of those schemas:
//!
//! ```
//! use strata_config::{Schema, ConfigInstance, evaluate};
//!
//! let schema = Schema::builder("app")
//!     .param_default("host", "localhost")
//!     .param("port")
//!     .build()?;
//!
//! let mut conf = ConfigInstance::new(&schema);
//! evaluate(&mut conf, "port 8080\n", None)?;
//! assert_eq!(conf.get_i64("port")?, 8080);
//! assert_eq!(conf.get_str("host")?, "localhost");
//! # Ok::<(), strata_config::ConfigError>(())
//! ```
//!
//! Files use a small declarative statement grammar (see [`parser`]): setter
//! calls, `load` directives for nested includes, and nested blocks for
//! sub-configurations. After loading, [`loader::validate`] walks the whole
//! tree and reports every validation message at once.

pub mod error;
pub mod eval;
pub mod instance;
pub mod loader;
pub mod parser;
pub mod schema;
pub mod value;
pub mod walk;

pub use {
    error::{ConfigError, Result},
    eval::evaluate,
    instance::ConfigInstance,
    schema::{
        AliasDecl, Configurable, DeprecationMode, ParamDecl, ParamDefault, Schema, SchemaBuilder,
    },
    value::Value,
    walk::walk_tree,
};
