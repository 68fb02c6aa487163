pub mod board;
pub mod logging;
pub mod model;
pub mod page;
pub mod poll;
pub mod sequence;
pub mod source;
pub mod state;
pub mod sync;
pub mod template;
