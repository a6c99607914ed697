//! Run configuration: a YAML file, overlaid with command-line flags, turned into a [`Filter`].
//!
//! ```yaml
//! include: [Fast]
//! exclude: [Slow]
//! include_nested_suites: true
//! parallel: false
//! format: console
//! color: auto
//! dyna_tags:
//!   suite_tags:
//!     StackSpec: [Smoke]
//!   test_tags:
//!     StackSpec:
//!       "A Stack pops": [Slow]
//! ```

use crate::cli::args::SuiteArgs;
use crate::dyna_tags::DynaTags;
use crate::errors::{Result, SuiteError};
use crate::filter::Filter;
use crate::tags::{tag_set, IGNORE_TAG};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Resolves `Auto` against whether stdout is a terminal.
    pub fn use_colors(self) -> bool {
        match self {
            ColorMode::Auto => atty::is(atty::Stream::Stdout),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// `None` includes every test that is not excluded.
    pub include: Option<Vec<String>>,
    pub exclude: Vec<String>,
    pub include_nested_suites: bool,
    pub parallel: bool,
    pub format: OutputFormat,
    pub color: ColorMode,
    pub dyna_tags: DynaTags,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            include: None,
            exclude: Vec::new(),
            include_nested_suites: true,
            parallel: false,
            format: OutputFormat::default(),
            color: ColorMode::default(),
            dyna_tags: DynaTags::empty(),
        }
    }
}

impl RunConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: RunConfig = serde_yaml::from_str(text).map_err(|e| SuiteError::Config {
            message: e.to_string(),
        })?;
        config.dyna_tags.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text).map_err(|e| match e {
            SuiteError::Config { message } => SuiteError::Config {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    /// Reads the file named by `--config`, if any, and applies the remaining flags on top.
    pub fn resolve(args: &SuiteArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.merge_args(args);
        Ok(config)
    }

    /// Flags win over file values. `--include` replaces the file's include list, `--exclude`
    /// adds to its exclude list.
    pub fn merge_args(&mut self, args: &SuiteArgs) {
        if !args.include.is_empty() {
            self.include = Some(args.include.clone());
        }
        for tag in &args.exclude {
            if !self.exclude.contains(tag) {
                self.exclude.push(tag.clone());
            }
        }
        if args.no_nested {
            self.include_nested_suites = false;
        }
        if args.parallel {
            self.parallel = true;
        }
        if let Some(format) = args.format {
            self.format = format;
        }
        if let Some(color) = args.color {
            self.color = color;
        }
    }

    /// The ignore tag is always part of the exclude set.
    pub fn to_filter(&self) -> Result<Filter> {
        let mut exclude = tag_set(self.exclude.iter().cloned());
        exclude.insert(IGNORE_TAG.to_string());
        Filter::new(
            self.include.as_ref().map(|tags| tag_set(tags.iter().cloned())),
            exclude,
            self.include_nested_suites,
            self.dyna_tags.clone(),
        )
    }
}
