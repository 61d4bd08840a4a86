//! GTM pipeline & ROI projection engine.
//!
//! A pure calculator: channel configuration + static knowledge base in,
//! funnel forecast, infrastructure cost, scenario series and ROI timelines
//! out. Nothing here performs I/O except `KnowledgeBase::load`.

pub mod channel;
pub mod error;
pub mod funnel;
pub mod infrastructure;
pub mod knowledge_base;
pub mod planner;
pub mod roi;
pub mod scenario;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use planner::{GtmEngine, GtmPlan, PlanRequest};
