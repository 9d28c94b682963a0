use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::watch;

use crate::config::Config;
use crate::engine::Engine;
use crate::events::EventWriter;
use crate::store::Store;

#[derive(Clone, Debug)]
pub struct State(Arc<StateInner>);

impl State {
    pub fn new(
        config: Config,
        store: Box<dyn Store>,
        events: EventWriter,
        shutdown_rx: watch::Receiver<()>,
    ) -> Self {
        Self(Arc::new(StateInner {
            engine: Engine::new(store, events),
            config,
            shutdown_rx,
        }))
    }
}

impl Deref for State {
    type Target = StateInner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct StateInner {
    pub engine: Engine,
    pub config: Config,
    pub shutdown_rx: watch::Receiver<()>,
}
