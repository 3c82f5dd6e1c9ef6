mod frame;
mod last_child;
mod stepping;

pub use frame::{FrameInfo, ValueInfo};
pub use last_child::{last_child, LastChild};
pub use stepping::{completes_parent, completion_chain, evaluation_order, step_foci, StepFocus};
