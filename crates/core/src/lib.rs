pub mod catalog;
pub mod engine;
pub mod event;
pub mod executor;
pub mod frame;
pub mod geom;
pub mod logger;
pub mod matcher;
pub mod runner;
pub mod scenario;
pub mod settings;
pub mod sleep;

pub use engine::ScenarioEngine;
pub use event::{EngineEvent, EventRecord, ScrollAction, TapAction};
pub use frame::{FrameSnapshot, TemplateMatch};
pub use geom::{DelayRange, Point, Rect};
pub use scenario::{Scenario, ScrollDirection, ScrollStage, Stage, TemplateTapStage};
