//! # tolmach-translate
//!
//! Translation pipeline for Tolmach: credentials, URL shielding, HTML
//! escaping, language detection, the supported-language catalog, and the
//! translate call itself.

pub mod catalog;
pub mod client;
pub mod credentials;
pub mod detect;
pub mod html;
pub mod shield;
pub mod translator;

pub use catalog::LanguageCatalog;
pub use client::BackendClient;
pub use credentials::{Credential, TokenCache, TokenSource};
pub use detect::Detector;
pub use translator::{TranslationRequest, TranslationResult, Translator};
