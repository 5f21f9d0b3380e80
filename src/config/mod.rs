use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, trace};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::config_error;
use crate::core::{
    error::{ErrorContext, LoadResult},
    request::Request,
    settings::Settings,
};

/// Environment variable consulted for the base URL when none is configured.
pub const BASE_URL_ENV: &str = "SCRIPTLOAD_BASE_URL";

/// Command-line options.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "scriptload", version, about = "Load labelled script groups")]
pub struct Opt {
    /// Manifest file (YAML, or JSON by extension)
    #[arg(short, long)]
    pub conf: Option<String>,

    /// Directory scripts are read from
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Override the manifest base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Override the manifest query string
    #[arg(long)]
    pub querystring: Option<String>,
}

#[derive(Default, Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[validate(length(min = 1))]
    pub base_url: Option<String>,

    #[validate(custom(function = "validate_querystring"))]
    pub querystring: Option<String>,

    #[validate(nested)]
    pub log: Option<Log>,

    #[serde(default)]
    pub preload: Vec<Request>,

    #[validate(nested)]
    #[serde(default)]
    pub gates: Vec<Gate>,
}

// Config file load and validation
impl Config {
    pub fn load_from_file<P>(path: P) -> LoadResult<Self>
    where
        P: AsRef<Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path)
            .with_context(&format!("Unable to read conf file from {path}"))?;
        debug!("Conf file read from {path}");

        let is_json = path
            .as_ref()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&conf_str)
        } else {
            Self::from_yaml(&conf_str)
        }
    }

    // config file load entry point
    pub fn load_with_opt_override(opt: &Opt) -> LoadResult<Self> {
        if let Some(path) = &opt.conf {
            let mut conf = Self::load_from_file(path)?;
            conf.merge_with_opt(opt);
            conf.validate()?;
            Ok(conf)
        } else {
            Err(config_error!("No path specified"))
        }
    }

    pub fn from_yaml(conf_str: &str) -> LoadResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str)
            .with_context(&format!("Unable to parse yaml conf {conf_str}"))?;
        trace!("Loaded conf: {conf:?}");

        conf.validate()?;
        Ok(conf)
    }

    pub fn from_json(conf_str: &str) -> LoadResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_json::from_str(conf_str)
            .with_context(&format!("Unable to parse json conf {conf_str}"))?;
        trace!("Loaded conf: {conf:?}");

        conf.validate()?;
        Ok(conf)
    }

    /// Command-line values win; the environment fills an unset base URL.
    pub fn merge_with_opt(&mut self, opt: &Opt) {
        if let Some(base_url) = &opt.base_url {
            self.base_url = Some(base_url.clone());
        }
        if let Some(querystring) = &opt.querystring {
            self.querystring = Some(querystring.clone());
        }
        if self.base_url.is_none() {
            self.base_url = bootstrap_base_url();
        }
    }

    pub fn settings(&self) -> Settings {
        Settings::new(self.base_url.clone(), self.querystring.clone())
    }
}

/// Base URL from the environment, if set and non-empty.
pub fn bootstrap_base_url() -> Option<String> {
    std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|value| !value.is_empty())
}

fn validate_querystring(querystring: &str) -> Result<(), ValidationError> {
    if querystring.starts_with('?') || querystring.starts_with('&') {
        return Err(ValidationError::new("querystring_without_separator"));
    }
    Ok(())
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct Log {
    #[validate(length(min = 1))]
    pub path: String,
    #[serde(default = "Log::default_level")]
    #[validate(custom(function = "Log::validate_level"))]
    pub level: String,
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }

    fn validate_level(level: &str) -> Result<(), ValidationError> {
        level
            .parse::<log::LevelFilter>()
            .map(|_| ())
            .map_err(|_| ValidationError::new("invalid_log_level"))
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

/// Load `load` once every label in `when` is satisfied.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct Gate {
    #[validate(length(min = 1))]
    pub when: Vec<String>,
    #[serde(default)]
    pub load: Request,
}
