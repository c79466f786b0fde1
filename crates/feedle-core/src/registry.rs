//! Explicit registry of source clients.
//!
//! The registry is built once at start-up and handed to the
//! [`RunService`](crate::run::RunService). Registration order is the default
//! run order when no sources are selected.

use crate::config::SourceKind;
use crate::error::AppError;
use crate::traits::SourceClient;

/// Ordered mapping from [`SourceKind`] to a client.
#[derive(Clone)]
pub struct SourceRegistry<C: SourceClient> {
    clients: Vec<(SourceKind, C)>,
}

impl<C: SourceClient> Default for SourceRegistry<C> {
    fn default() -> Self {
        Self {
            clients: Vec::new(),
        }
    }
}

impl<C: SourceClient> SourceRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client under its own [`SourceClient::source`] kind,
    /// replacing any previous client for that kind.
    pub fn register(&mut self, client: C) -> &mut Self {
        let kind = client.source();
        match self.clients.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = client,
            None => self.clients.push((kind, client)),
        }
        self
    }

    pub fn with(mut self, client: C) -> Self {
        self.register(client);
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<&C> {
        self.clients
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, c)| c)
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> Vec<SourceKind> {
        self.clients.iter().map(|(k, _)| *k).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Resolves the effective source list for a run.
    ///
    /// An empty selection means every registered source. Names that are not
    /// a [`SourceKind`] at all are rejected with
    /// [`AppError::UnsupportedSource`]. Known kinds are kept even without a
    /// registered client; the run reports those per source. Repeated names
    /// are collapsed.
    pub fn resolve(&self, selected: &[String]) -> Result<Vec<SourceKind>, AppError> {
        if selected.is_empty() {
            return Ok(self.kinds());
        }

        let mut kinds = Vec::with_capacity(selected.len());
        for name in selected {
            let kind: SourceKind = name.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}
