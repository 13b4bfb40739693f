use std::sync::Arc;

use services::services::{
    config::GatewayConfig,
    fetch::WebFetcher,
    llm::LlmProvider,
    owner::{AgentSwitch, CommandRunner, OwnerConsole, Terminator},
    storage::FileStorage,
};

/// Shared handles passed to every handler. Only the agent switch and the
/// fetch allow-list change after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub llm: Arc<dyn LlmProvider>,
    pub fetcher: Arc<WebFetcher>,
    pub owner: Arc<OwnerConsole>,
    pub storage: Arc<dyn FileStorage>,
    pub switch: Arc<AgentSwitch>,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        llm: Arc<dyn LlmProvider>,
        fetcher: WebFetcher,
        storage: Arc<dyn FileStorage>,
        runner: Arc<dyn CommandRunner>,
        terminator: Arc<dyn Terminator>,
    ) -> Self {
        let config = Arc::new(config);
        let switch = Arc::new(AgentSwitch::new());
        let owner = OwnerConsole::new(
            config.clone(),
            storage.clone(),
            runner,
            terminator,
            fetcher.domains().clone(),
            switch.clone(),
        );
        Self {
            config,
            llm,
            fetcher: Arc::new(fetcher),
            owner: Arc::new(owner),
            storage,
            switch,
        }
    }
}
