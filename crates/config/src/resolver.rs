//! Pluggable lookup of a workspace's per-task configuration

use async_trait::async_trait;
use monoflow_core::Result;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

/// Produces the task-specific configuration a workspace exports.
///
/// The engine calls `resolve` only after it has checked that the
/// configuration file exists. `Ok(None)` means the file has no export for
/// the task, which the engine reports as a `null` outcome; an `Err` is
/// reported as an `error` outcome for that workspace alone.
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    /// Payload forwarded unchanged to every workspace's lookup
    type Params: Default + Send + Sync;
    /// Configuration handed to the task's execute callback
    type Config: Send + 'static;

    async fn resolve(
        &self,
        config_file: &Path,
        task: &str,
        params: &Self::Params,
    ) -> Result<Option<Self::Config>>;
}

/// Resolver backed by a plain function, for embedding and tests
pub struct FnResolver<P, C, F> {
    resolve: F,
    _marker: PhantomData<fn(&P) -> C>,
}

impl<P, C, F> FnResolver<P, C, F>
where
    F: Fn(&Path, &str, &P) -> Result<Option<C>> + Send + Sync,
{
    pub fn new(resolve: F) -> Self {
        Self {
            resolve,
            _marker: PhantomData,
        }
    }
}

impl<P, C, F> fmt::Debug for FnResolver<P, C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver").finish_non_exhaustive()
    }
}

#[async_trait]
impl<P, C, F> ConfigResolver for FnResolver<P, C, F>
where
    P: Default + Send + Sync,
    C: Send + 'static,
    F: Fn(&Path, &str, &P) -> Result<Option<C>> + Send + Sync,
{
    type Params = P;
    type Config = C;

    async fn resolve(&self, config_file: &Path, task: &str, params: &P) -> Result<Option<C>> {
        (self.resolve)(config_file, task, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monoflow_core::Error;

    #[tokio::test]
    async fn test_fn_resolver_forwards_arguments() {
        let resolver = FnResolver::new(|file: &Path, task: &str, params: &u32| {
            Ok(Some(format!("{}:{task}:{params}", file.display())))
        });

        let config = resolver
            .resolve(Path::new("/ws/.workflow.json"), "build", &7)
            .await
            .unwrap();
        assert_eq!(config.as_deref(), Some("/ws/.workflow.json:build:7"));
    }

    #[tokio::test]
    async fn test_fn_resolver_propagates_errors() {
        let resolver = FnResolver::new(|file: &Path, _: &str, _: &()| -> Result<Option<()>> {
            Err(Error::config_load(file, "factory threw"))
        });

        let err = resolver
            .resolve(Path::new("/ws/.workflow.json"), "build", &())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("factory threw"));
    }
}
