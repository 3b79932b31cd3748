//! Service Kit - Research Tools
//!
//! Domain-specific tools that implement `agent_core::Tool` for the research
//! assistant's gather phase.

mod fear_greed;
mod futures_data;
mod price_lookup;
mod snapshot;
mod technical;
mod web_search;

pub use fear_greed::FearGreedTool;
pub use futures_data::FuturesDataTool;
pub use price_lookup::PriceLookupTool;
pub use snapshot::MarketSnapshotTool;
pub use technical::TechnicalIndicatorTool;
pub use web_search::WebSearchTool;
