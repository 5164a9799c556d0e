//! Server configuration: CLI flags override an optional TOML file, which
//! overrides built-in defaults. Merging is a pure function over three
//! partial structs so it's testable without touching the filesystem.

use {
    clap::Parser,
    serde::Deserialize,
    std::path::{Path, PathBuf},
};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7878";
const DEFAULT_DATA_DIR: &str = "./parlor-data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub listen_addr: String,
    pub data_dir: PathBuf,
    pub message_page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            message_page_size: parlor_sdk::model::CHAT_PAGE_SIZE_DEFAULT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    listen_addr: Option<String>,
    data_dir: Option<PathBuf>,
    message_page_size: Option<usize>,
}

#[derive(Parser, Debug)]
#[command(name = "parlord", version, about = "Parlor relay server")]
pub struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub listen_addr: Option<String>,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long)]
    pub message_page_size: Option<usize>,
}

impl Cli {
    /// Load the config file (if any) and merge it with these CLI flags.
    pub fn resolve(&self) -> anyhow::Result<Settings> {
        let file = match &self.config {
            Some(path) => read_file_settings(path)?,
            None => FileSettings::default(),
        };
        Ok(merge(Settings::default(), file, self))
    }
}

fn read_file_settings(path: &Path) -> anyhow::Result<FileSettings> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

fn merge(defaults: Settings, file: FileSettings, cli: &Cli) -> Settings {
    Settings {
        listen_addr: cli
            .listen_addr
            .clone()
            .or(file.listen_addr)
            .unwrap_or(defaults.listen_addr),
        data_dir: cli.data_dir.clone().or(file.data_dir).unwrap_or(defaults.data_dir),
        message_page_size: cli
            .message_page_size
            .or(file.message_page_size)
            .unwrap_or(defaults.message_page_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(config: Option<&str>) -> Cli {
        Cli {
            config: config.map(PathBuf::from),
            listen_addr: None,
            data_dir: None,
            message_page_size: None,
        }
    }

    #[test]
    fn defaults_apply_with_no_file_or_flags() {
        let settings = merge(Settings::default(), FileSettings::default(), &cli(None));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn cli_flag_overrides_file_value() {
        let file = FileSettings { listen_addr: Some("0.0.0.0:1".into()), ..Default::default() };
        let mut c = cli(None);
        c.listen_addr = Some("0.0.0.0:2".into());
        let settings = merge(Settings::default(), file, &c);
        assert_eq!(settings.listen_addr, "0.0.0.0:2");
    }

    #[test]
    fn file_value_overrides_default() {
        let file = FileSettings { message_page_size: Some(20), ..Default::default() };
        let settings = merge(Settings::default(), file, &cli(None));
        assert_eq!(settings.message_page_size, 20);
    }
}
