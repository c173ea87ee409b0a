pub mod coldstart;
pub mod invoke;
