//! Executes parsed statements against an instance's setter surface.
//!
//! The path of the file being evaluated travels down the call stack, so it
//! scopes itself to that file's statements and drops away on every exit
//! path, including failures. Programmatic evaluation passes no path.

use std::path::{Path, PathBuf};

use crate::{
    error::{ConfigError, Result},
    instance::ConfigInstance,
    loader,
    parser::{self, Statement, StatementKind},
};

/// Parses `script` and executes its statements strictly in order against
/// `conf`. `source` is the file the script came from, used to resolve
/// relative nested includes and to attribute syntax errors.
///
/// Failures stemming from script structure (malformed statements, unknown
/// setters) are reclassified as [`ConfigError::Syntax`] carrying the source
/// path and 1-based line; everything else propagates unchanged.
pub fn evaluate(conf: &mut ConfigInstance, script: &str, source: Option<&Path>) -> Result<()> {
    let statements = parser::parse_script(script).map_err(|e| {
        syntax(source, e.line, ConfigError::Parse { message: e.message })
    })?;
    exec_all(conf, &statements, source)
}

fn exec_all(conf: &mut ConfigInstance, statements: &[Statement], source: Option<&Path>) -> Result<()> {
    for statement in statements {
        exec(conf, statement, source)?;
    }
    Ok(())
}

fn exec(conf: &mut ConfigInstance, statement: &Statement, source: Option<&Path>) -> Result<()> {
    match &statement.kind {
        StatementKind::Set { name, value } => conf
            .set(name, value.clone())
            .map_err(|e| reclassify(e, source, statement.line)),
        StatementKind::Load { paths } => {
            for path in paths {
                let resolved = resolve_include(path, source)?;
                loader::load_path(conf, &resolved)?;
            }
            Ok(())
        },
        StatementKind::Block { name, body } => {
            let decl = conf
                .schema()
                .decl(name)
                .cloned()
                .ok_or_else(|| reclassify(conf.schema().unknown(name), source, statement.line))?;
            let Some(nested) = decl.nested else {
                return Err(syntax(
                    source,
                    statement.line,
                    ConfigError::Parse {
                        message: format!("parameter '{name}' does not accept a nested block"),
                    },
                ));
            };
            let mut child = ConfigInstance::new_child(&nested, conf.clone());
            exec_all(&mut child, body, source)?;
            conf.set(name, child)
                .map_err(|e| reclassify(e, source, statement.line))
        },
    }
}

/// Absolute include paths are taken verbatim; relative ones resolve against
/// the including file's directory, falling back to the working directory for
/// top-level programmatic evaluation.
fn resolve_include(path: &str, source: Option<&Path>) -> Result<PathBuf> {
    let path = Path::new(path);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    match source.and_then(Path::parent) {
        Some(dir) => Ok(dir.join(path)),
        None => {
            let cwd = std::env::current_dir().map_err(|e| ConfigError::Io {
                path: PathBuf::from("."),
                source: e,
            })?;
            Ok(cwd.join(path))
        },
    }
}

fn reclassify(err: ConfigError, source: Option<&Path>, line: usize) -> ConfigError {
    if err.is_script_structure() {
        syntax(source, line, err)
    } else {
        err
    }
}

fn syntax(source: Option<&Path>, line: usize, cause: ConfigError) -> ConfigError {
    ConfigError::Syntax {
        source: source.map(Path::to_path_buf).unwrap_or_default(),
        line,
        cause: Box::new(cause),
    }
}
