
pub mod aes;
pub mod base64;
pub mod exec;
pub mod raw;

use async_trait::async_trait;
use bytes::Bytes;
use clap::{App, ArgMatches};

use crate::error::{Error, Result};

/// Module is a transform applied by the pipeline between the input and
/// the output channel. Modules see buffers, never channels.
#[async_trait]
pub trait Module {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Contributes the module's own command line options, if any.
    fn register<'a>(&self, app: App<'a>) -> App<'a> {
        app
    }

    fn setup(&mut self, _matches: &ArgMatches) -> Result<()> {
        Ok(())
    }

    /// Transforms one buffer. Modules are pure with respect to their
    /// argument and may return a new buffer of any size.
    async fn run(&mut self, buf: &[u8]) -> Result<Bytes>;
}

/// The immutable table of available modules, freshly constructed.
pub fn registry() -> Vec<Box<dyn Module + Send + Sync>> {
    vec![
        Box::new(raw::Raw::new()),
        Box::new(base64::Base64::new()),
        Box::new(aes::Aes::new()),
        Box::new(exec::Exec::new()),
    ]
}

/// Folds every module's command line options into `app`.
pub fn register_all(mut app: App<'_>) -> App<'_> {
    for module in registry() {
        app = module.register(app);
    }
    app
}

/// Builds and configures the module named `name`.
pub fn factory(name: &str, matches: &ArgMatches) -> Result<Box<dyn Module + Send + Sync>> {
    if name.is_empty() {
        return Err(Error::ErrModuleNameEmpty);
    }

    let mut module = registry()
        .into_iter()
        .find(|m| m.name() == name)
        .ok_or_else(|| Error::ErrModuleNotRegistered(name.to_owned()))?;

    module.setup(matches)?;

    Ok(module)
}

/// Builds the ordered transform chain from a comma separated list.
pub fn chain(names: &str, matches: &ArgMatches) -> Result<Vec<Box<dyn Module + Send + Sync>>> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| factory(name, matches))
        .collect()
}
