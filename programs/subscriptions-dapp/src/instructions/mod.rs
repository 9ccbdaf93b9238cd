#![allow(ambiguous_glob_reexports)]

pub mod check_subscription;
pub mod create_plan;
pub mod subscribe;

pub use check_subscription::*;
pub use create_plan::*;
pub use subscribe::*;
