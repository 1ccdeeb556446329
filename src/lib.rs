//! Build-time localization generator for hybrid mobile projects.
//!
//! Reads per-language JSON translation files and produces the native string
//! resources each platform build expects: merged Android `strings.xml` files
//! and regenerated Apple `.strings` tables, registered as localized variant
//! groups in the Xcode project manifest.
//!
//! ```no_run
//! use std::sync::Arc;
//! use locsynth::{HookConfig, HookContext};
//!
//! # async fn example() -> Result<(), locsynth::Error> {
//! let config = HookConfig::load(".", None).await?;
//! let context = HookContext::discover(".").await?;
//! let report = locsynth::run(&context, Arc::new(config)).await?;
//! println!("{} file(s) written", report.files_written());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod android;
pub mod config;
pub mod error;
pub mod formats;
pub mod hook;
pub mod ios;
pub mod resolver;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    config::HookConfig,
    error::Error,
    hook::{HookContext, RunReport, run},
    ios::IosReport,
    resolver::{TranslationPattern, discover},
    traits::Parser,
    types::{Locale, Platform, ResourceTarget, Section, TranslationDocument},
};
