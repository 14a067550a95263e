//! Shared helpers for command handlers.

use oidscope_core::{CoreError, Oid, Schema, StaticSchema};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The bundled MIB-2 subset, extended with `--schema` if given.
pub fn load_schema(global: &GlobalOpts) -> Result<StaticSchema, CliError> {
    let mut schema = StaticSchema::mib2()?;
    if let Some(path) = &global.schema {
        let invalid = |message: String| CliError::InvalidSchema {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let extra = StaticSchema::from_yaml(&text).map_err(|e| invalid(e.to_string()))?;
        tracing::debug!(nodes = extra.len(), path = %path.display(), "loaded extra schema");
        schema.extend(extra);
    }
    Ok(schema)
}

/// Turn user input into an OID: a numeric OID, a schema name, or a name
/// followed by an instance suffix (`ifDescr.3`).
pub fn resolve_oid(schema: &dyn Schema, text: &str) -> Result<Oid, CliError> {
    let text = text.trim();
    if text.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return text.parse::<Oid>().map_err(|e| CoreError::from(e).into());
    }

    let (name, suffix) = text.split_once('.').unwrap_or((text, ""));
    let node = schema.find(name).ok_or_else(|| CliError::UnknownObject {
        name: name.into(),
    })?;
    if suffix.is_empty() {
        return Ok(node.oid.clone());
    }
    let suffix = suffix
        .parse::<Oid>()
        .map_err(|e| CliError::from(CoreError::from(e)))?;
    Ok(node.oid.join(suffix.arcs()))
}
