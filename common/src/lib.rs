pub mod config;

/// Configuration shared by the storefront executables.
///
/// Every binary loads one YAML file through [`config::Config::load`] and
/// takes its own section from it, so a deployment carries a single config
/// artifact for the whole workspace.
pub use config::Config;
