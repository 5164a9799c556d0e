//! Client configuration: CLI flags override an optional TOML file, which
//! overrides built-in defaults. Mirrors the server's settings layering.

use {
    clap::Parser,
    serde::Deserialize,
    std::path::{Path, PathBuf},
};

const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:7878";
const DEFAULT_DATA_DIR: &str = "./parlor-client-data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_addr: String,
    pub data_dir: PathBuf,
    pub username: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            username: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_addr: Option<String>,
    data_dir: Option<PathBuf>,
    username: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "parlor", version, about = "Parlor client")]
pub struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub server_addr: Option<String>,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long)]
    pub username: Option<String>,
}

impl Cli {
    pub fn resolve(&self) -> anyhow::Result<ClientSettings> {
        let file = match &self.config {
            Some(path) => read_file_settings(path)?,
            None => FileSettings::default(),
        };
        Ok(merge(ClientSettings::default(), file, self))
    }
}

fn read_file_settings(path: &Path) -> anyhow::Result<FileSettings> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

fn merge(defaults: ClientSettings, file: FileSettings, cli: &Cli) -> ClientSettings {
    ClientSettings {
        server_addr: cli.server_addr.clone().or(file.server_addr).unwrap_or(defaults.server_addr),
        data_dir: cli.data_dir.clone().or(file.data_dir).unwrap_or(defaults.data_dir),
        username: cli.username.clone().or(file.username).or(defaults.username),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(config: Option<&str>) -> Cli {
        Cli { config: config.map(PathBuf::from), server_addr: None, data_dir: None, username: None }
    }

    #[test]
    fn defaults_apply_with_no_file_or_flags() {
        let settings = merge(ClientSettings::default(), FileSettings::default(), &cli(None));
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn cli_flag_overrides_file_value() {
        let file = FileSettings { server_addr: Some("0.0.0.0:1".into()), ..Default::default() };
        let mut c = cli(None);
        c.server_addr = Some("0.0.0.0:2".into());
        let settings = merge(ClientSettings::default(), file, &c);
        assert_eq!(settings.server_addr, "0.0.0.0:2");
    }

    #[test]
    fn file_value_overrides_default() {
        let file = FileSettings { username: Some("alice".into()), ..Default::default() };
        let settings = merge(ClientSettings::default(), file, &cli(None));
        assert_eq!(settings.username, Some("alice".to_string()));
    }
}
