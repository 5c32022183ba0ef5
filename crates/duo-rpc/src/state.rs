//! Shared application state handed to every handler.

use std::sync::Arc;

use duo_chain::ChainStore;

use crate::events::{EventSink, TracingEventSink};

#[derive(Clone)]
pub struct RpcState {
    pub store: Arc<ChainStore>,
    pub events: Arc<dyn EventSink>,
}

impl RpcState {
    pub fn new(store: Arc<ChainStore>) -> Self {
        Self {
            store,
            events: Arc::new(TracingEventSink),
        }
    }
}
