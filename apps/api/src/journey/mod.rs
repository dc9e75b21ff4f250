// Career journey orchestration.
// The controller owns stage sequencing; remote work goes through `StageExecutor`
// and persisted flags are read through `JourneyStore`.

pub mod controller;
pub mod executor;
pub mod handlers;
pub mod notify;
pub mod registry;
pub mod selection;
pub mod stage;
pub mod state;
pub mod step;
pub mod store;

#[cfg(test)]
pub mod testing;
