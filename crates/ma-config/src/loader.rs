//! YAML loading and validation for area configuration

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::options::AreaOptions;

/// Top-level configuration file shape
#[derive(Debug, Deserialize)]
struct AreasFile {
    /// Areas keyed by slug, in file order
    areas: IndexMap<String, AreaOptions>,
}

/// Load and validate area configuration from a YAML file
///
/// Returns areas keyed by slug, preserving file order.
pub fn load_areas(path: &Path) -> ConfigResult<IndexMap<String, AreaOptions>> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let areas = parse_areas(&contents)?;
    info!(path = %path.display(), count = areas.len(), "Loaded area configuration");
    Ok(areas)
}

/// Parse and validate area configuration from a YAML string
pub fn parse_areas(contents: &str) -> ConfigResult<IndexMap<String, AreaOptions>> {
    let file: AreasFile =
        serde_yaml::from_str(contents).map_err(|source| ConfigError::ParseYaml { source })?;

    for (slug, options) in &file.areas {
        validate_area(slug, options)?;
    }

    Ok(file.areas)
}

fn validate_area(slug: &str, options: &AreaOptions) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::InvalidArea {
        area: slug.to_string(),
        reason: reason.to_string(),
    };

    if slug.is_empty() {
        return Err(invalid("area slug cannot be empty"));
    }

    if options.is_meta() {
        if options.child_areas.is_empty() {
            return Err(invalid("meta areas must list child_areas"));
        }
    } else if !options.child_areas.is_empty() {
        return Err(invalid("only meta areas may list child_areas"));
    }

    if options.update_interval == 0 {
        return Err(invalid("update_interval must be greater than zero"));
    }

    if options.on_states.is_empty() {
        return Err(invalid("on_states cannot be empty"));
    }

    Ok(())
}
