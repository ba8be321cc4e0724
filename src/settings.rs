//! Generation settings and config file loading.
//!
//! ```toml
//! dialect = "sqlserver"
//! update-exclusions = ["CreatedAt"]
//!
//! [defaults]
//! render-strategy = "literal-block"
//! paging = false
//!
//! [relations."dbo.Order"]
//! render-strategy = "incremental-append"
//! paging = true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{CrudError, CrudResult};
use crate::schema::Relation;

/// File looked up in the working directory.
pub const LOCAL_CONFIG: &str = "crudgen.toml";

/// How statement text is constructed in a generated body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStrategy {
    /// One append call per fragment.
    IncrementalAppend,
    /// One multi-line literal.
    #[default]
    LiteralBlock,
}

/// Settings that apply to one relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GenerationSettings {
    pub render_strategy: RenderStrategy,
    /// Add `pageSize`/`pageNumber` paging to table read-all.
    pub paging: bool,
}

/// Per-relation override; unset fields fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RelationOverride {
    pub render_strategy: Option<RenderStrategy>,
    pub paging: Option<bool>,
}

/// Project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub dialect: Dialect,
    pub defaults: GenerationSettings,
    /// Keyed by plain or qualified relation name.
    pub relations: BTreeMap<String, RelationOverride>,
    /// Columns never written by insert.
    pub insert_exclusions: Vec<String>,
    /// Columns never written by update.
    pub update_exclusions: Vec<String>,
}

impl Settings {
    /// Create a new settings builder.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Effective settings for a relation.
    pub fn for_relation(&self, relation: &Relation<'_>) -> GenerationSettings {
        let over = self
            .relations
            .get(&relation.full_name())
            .or_else(|| self.relations.get(relation.name()));

        match over {
            Some(o) => GenerationSettings {
                render_strategy: o.render_strategy.unwrap_or(self.defaults.render_strategy),
                paging: o.paging.unwrap_or(self.defaults.paging),
            },
            None => self.defaults,
        }
    }

    /// Parse settings from TOML.
    pub fn from_toml(input: &str) -> CrudResult<Self> {
        toml::from_str(input).map_err(|e| CrudError::Config(e.to_string()))
    }

    /// Load settings from a file.
    pub fn from_file(path: &Path) -> CrudResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CrudError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let settings = Self::from_toml(&content)?;
        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// `<config dir>/crudgen/config.toml`.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("crudgen").join("config.toml"))
    }

    /// Load from `explicit`, else `crudgen.toml`, else the user config,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> CrudResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.is_file() {
            return Self::from_file(&local);
        }

        if let Some(user) = Self::user_config_path().filter(|p| p.is_file()) {
            return Self::from_file(&user);
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }
}

/// Builder for Settings
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Set the dialect
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.settings.dialect = dialect;
        self
    }

    /// Set the default render strategy
    pub fn render_strategy(mut self, strategy: RenderStrategy) -> Self {
        self.settings.defaults.render_strategy = strategy;
        self
    }

    /// Enable or disable paging by default
    pub fn paging(mut self, paging: bool) -> Self {
        self.settings.defaults.paging = paging;
        self
    }

    /// Override settings for one relation
    pub fn relation(mut self, name: impl Into<String>, over: RelationOverride) -> Self {
        self.settings.relations.insert(name.into(), over);
        self
    }

    /// Exclude a column from insert
    pub fn exclude_from_insert(mut self, column: impl Into<String>) -> Self {
        self.settings.insert_exclusions.push(column.into());
        self
    }

    /// Exclude a column from update
    pub fn exclude_from_update(mut self, column: impl Into<String>) -> Self {
        self.settings.update_exclusions.push(column.into());
        self
    }

    /// Build the settings
    pub fn build(self) -> Settings {
        self.settings
    }
}
