//! Loads content and assembles the bot around the selected backends.
use std::time::Duration;

use anyhow::{Context, Result};
use bot_content::{ConfigLoader, TemplateLoader};
use bot_core::{Bot, BotConfig, Clock, DebugSink, FrameSource, InputDevice, StopSignal, TemplateSet};

use crate::config::LaunchConfig;

/// OS-facing capabilities chosen by the binary.
pub struct Backends {
    pub frames: Box<dyn FrameSource>,
    pub input: Box<dyn InputDevice>,
    pub stop: Box<dyn StopSignal>,
    pub clock: Box<dyn Clock>,
}

/// Builder that loads config and templates, then wires them into a [`Bot`].
pub struct BotAssembler {
    launch: LaunchConfig,
}

impl BotAssembler {
    pub fn new(launch: LaunchConfig) -> Self {
        Self { launch }
    }

    pub fn launch(&self) -> &LaunchConfig {
        &self.launch
    }

    /// Read the config file and apply environment overrides.
    pub fn load_config(&self) -> Result<BotConfig> {
        let path = &self.launch.config_path;
        let mut config = ConfigLoader::load(path)?;
        self.launch.overrides.apply(&mut config);
        config
            .validate()
            .with_context(|| format!("Invalid settings after environment overrides ({})", path.display()))?;
        Ok(config)
    }

    /// Load templates and the debug sink for `config`.
    pub fn load_content(&self, config: &BotConfig) -> Result<(TemplateSet, Option<DebugSink>)> {
        let loader = TemplateLoader::for_config(&self.launch.config_path);
        let templates = loader.load_set(config)?;

        let debug = if config.debug.enabled {
            let dir = loader.resolve(&config.debug.output_dir);
            let sink = DebugSink::new(&dir)
                .with_context(|| format!("Failed to prepare debug output in {}", dir.display()))?;
            tracing::info!("Debug screenshots will be written to {}", dir.display());
            Some(sink)
        } else {
            None
        };
        Ok((templates, debug))
    }

    pub fn build(self, config: BotConfig, backends: Backends) -> Result<BotSetup> {
        let (templates, debug) = self.load_content(&config)?;

        let bot = Bot::builder()
            .with_config(&config)?
            .templates(templates)
            .debug(debug)
            .frame_source(backends.frames)
            .input(backends.input)
            .stop_signal(backends.stop)
            .clock(backends.clock)
            .build()?;

        let start_delay = config.timing.start_delay()?;
        Ok(BotSetup {
            config,
            start_delay,
            bot,
        })
    }
}

pub struct BotSetup {
    pub config: BotConfig,
    pub start_delay: Duration,
    pub bot: Bot,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use bot_core::{
        CaptureError, Frame, InputError, Key, ManualClock, StopAfterTicks, StrategyKind,
    };
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::config::ConfigOverrides;

    struct Blank;

    impl FrameSource for Blank {
        fn capture(&mut self) -> std::result::Result<Frame, CaptureError> {
            Ok(RgbImage::new(32, 32))
        }
    }

    struct Silent;

    impl InputDevice for Silent {
        fn press(&mut self, _key: Key) -> std::result::Result<(), InputError> {
            Ok(())
        }

        fn release(&mut self, _key: Key) -> std::result::Result<(), InputError> {
            Ok(())
        }
    }

    fn write_png(path: &Path) {
        RgbImage::from_pixel(4, 4, Rgb([10, 200, 10])).save(path).unwrap();
    }

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("resources")).unwrap();
        for name in ["character", "left_boundary", "right_boundary"] {
            write_png(&dir.path().join(format!("resources/{name}.png")));
        }
        std::fs::write(
            dir.path().join("farmbot.toml"),
            "seed = 3\n\n[debug]\noutput_dir = \"shots\"\n\n[timing]\nstart_delay = 0.5\n",
        )
        .unwrap();
        dir
    }

    fn launch(dir: &Path, overrides: ConfigOverrides) -> LaunchConfig {
        LaunchConfig {
            config_path: dir.join("farmbot.toml"),
            overrides,
            ..LaunchConfig::default()
        }
    }

    fn backends() -> Backends {
        Backends {
            frames: Box::new(Blank),
            input: Box::new(Silent),
            stop: Box::new(StopAfterTicks::new(1)),
            clock: Box::new(ManualClock::new()),
        }
    }

    #[test]
    fn test_build_resolves_templates_next_to_config() {
        let dir = workspace();
        let assembler = BotAssembler::new(launch(dir.path(), ConfigOverrides::default()));

        let config = assembler.load_config().unwrap();
        let setup = assembler.build(config, backends()).unwrap();

        assert_eq!(setup.start_delay, Duration::from_millis(500));
        assert_eq!(setup.bot.tracker().templates().template_count(), 3);
        assert!(!dir.path().join("shots").exists());
    }

    #[test]
    fn test_debug_override_creates_output_dir() {
        let dir = workspace();
        let overrides = ConfigOverrides {
            debug: Some(true),
            ..ConfigOverrides::default()
        };
        let assembler = BotAssembler::new(launch(dir.path(), overrides));

        let config = assembler.load_config().unwrap();
        assembler.build(config, backends()).unwrap();

        assert!(dir.path().join("shots").is_dir());
    }

    #[test]
    fn test_overrides_are_validated() {
        let dir = workspace();
        let overrides = ConfigOverrides {
            strategy: Some(StrategyKind::TargetPresence),
            ..ConfigOverrides::default()
        };
        let assembler = BotAssembler::new(launch(dir.path(), overrides));

        let err = assembler.load_config().unwrap_err();
        assert!(format!("{err:#}").contains("monster"), "{err:#}");
    }
}
