//! Template image loader.

use std::path::{Path, PathBuf};

use bot_core::{BotConfig, StrategyKind, Template, TemplateSet};

use crate::loaders::LoadResult;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Loads template bitmaps, resolving relative paths against a base directory
/// (normally the directory holding the config file).
pub struct TemplateLoader {
    base_dir: PathBuf,
}

impl TemplateLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Loader resolving paths relative to the config file's directory.
    pub fn for_config(config_path: &Path) -> Self {
        let base = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Self::new(base)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Load one image as an RGB template.
    pub fn load(&self, name: &str, path: &Path) -> LoadResult<Template> {
        let path = self.resolve(path);
        let image = image::open(&path).map_err(|e| {
            anyhow::anyhow!("Failed to load {} template {}: {}", name, path.display(), e)
        })?;
        let template = Template::new(name, image.to_rgb8());
        tracing::debug!(
            "Loaded template '{}' ({}x{}) from {}",
            name,
            template.width(),
            template.height(),
            path.display()
        );
        Ok(template)
    }

    /// Load every png/jpg/jpeg in `dir`, named by file stem, sorted by file
    /// name.
    pub fn load_dir(&self, dir: &Path) -> LoadResult<Vec<Template>> {
        let dir = self.resolve(dir);
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            anyhow::anyhow!("Failed to read template directory {}: {}", dir.display(), e)
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| anyhow::anyhow!("Failed to list {}: {}", dir.display(), e))?
                .path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    IMAGE_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                });
            if is_image && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .iter()
            .map(|path| {
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.load(&name, path)
            })
            .collect()
    }

    /// Load every template the config names.
    ///
    /// Explicit `monsters` come first, then the contents of `monsters_dir`.
    pub fn load_set(&self, config: &BotConfig) -> LoadResult<TemplateSet> {
        let paths = &config.templates;
        let mut set = TemplateSet::new(self.load("character", &paths.character)?);

        if let (Some(left), Some(right)) = (&paths.left_boundary, &paths.right_boundary) {
            set = set.with_boundaries(
                self.load("left_boundary", left)?,
                self.load("right_boundary", right)?,
            );
        }

        let mut monsters = Vec::new();
        for path in &paths.monsters {
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("monster{}", monsters.len()));
            monsters.push(self.load(&name, path)?);
        }
        if let Some(dir) = &paths.monsters_dir {
            monsters.extend(self.load_dir(dir)?);
        }

        if config.navigation.strategy == StrategyKind::TargetPresence && monsters.is_empty() {
            anyhow::bail!(
                "The target-presence strategy needs at least one monster template, found none"
            );
        }

        let set = set.with_monsters(monsters);
        tracing::info!(
            "Loaded {} templates ({} monsters) from {}",
            set.template_count(),
            set.monsters.len(),
            self.base_dir.display()
        );
        Ok(set)
    }
}
