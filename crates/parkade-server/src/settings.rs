//! Settings file and environment overrides

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use eyre::{eyre, Result, WrapErr};
use parkade_core::Config;
use serde::Deserialize;

/// Name of the settings file searched for from the working directory upwards
pub const SETTINGS_FILE: &str = "parkade.toml";

#[derive(Clone, Deserialize, Default, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Where the settings were read from, `None` for built-in defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,

    #[serde(default)]
    pub facility: Config,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Number of threads receiving and handling HTTP requests
    pub handler_threads: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8585,
            handler_threads: 16,
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct LogSettings {
    /// Directive for [`tracing_subscriber::EnvFilter`], `RUST_LOG` wins if set
    pub filter: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: String::from("info"),
            json: false,
        }
    }
}

impl Settings {
    /// Look for [`SETTINGS_FILE`] in the working directory and its ancestors
    ///
    /// Falls back to the defaults if there is none. Environment overrides are
    /// applied in both cases.
    pub fn load() -> Result<Self> {
        let mut path = std::env::current_dir()?;
        let mut settings = loop {
            path.push(SETTINGS_FILE);

            match std::fs::read_to_string(&path) {
                Ok(s) => break Self::parse(&s, path)?,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }

            path.pop();
            if !path.pop() {
                break Settings::default();
            }
        };
        settings.apply_env(|key| std::env::var_os(key))?;
        Ok(settings)
    }

    /// Read the settings from an explicitly given file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Could not read {}", path.display()))?;
        let mut settings = Self::parse(&contents, path.to_path_buf())?;
        settings.apply_env(|key| std::env::var_os(key))?;
        Ok(settings)
    }

    fn parse(contents: &str, path: PathBuf) -> Result<Self> {
        let mut settings: Settings = toml::from_str(contents)
            .wrap_err_with(|| format!("Invalid settings in {}", path.display()))?;
        settings.source = Some(path);
        Ok(settings)
    }

    fn apply_env<V, F>(&mut self, var: F) -> Result<()>
    where
        V: AsRef<OsStr>,
        F: Fn(&str) -> Option<V>,
    {
        if let Some(v) = var("PARKADE_CAPACITY") {
            let v = v.as_ref().to_string_lossy();
            self.facility.capacity = v
                .parse()
                .map_err(|_| eyre!("PARKADE_CAPACITY takes a decimal u32, got {v:?}"))?;
        }

        if let Some(v) = var("PARKADE_LOG") {
            self.log.filter = v.as_ref().to_string_lossy().into_owned();
        }

        if let Some(v) = var("PARKADE_JSON_LOGS") {
            let v = v.as_ref();
            self.log.json = v != OsStr::new("0")
                && !v.eq_ignore_ascii_case("false")
                && !v.eq_ignore_ascii_case("no")
                && !v.eq_ignore_ascii_case("off")
                && !v.eq_ignore_ascii_case("n")
                && !v.eq_ignore_ascii_case("f");
        }

        Ok(())
    }
}
