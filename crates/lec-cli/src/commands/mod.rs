pub mod assemble;
pub mod clean;
pub mod dedupe;
pub mod dispatch;
pub mod hook;
pub mod run;
pub mod schema;
pub mod status;
pub mod validate;

mod shared;
