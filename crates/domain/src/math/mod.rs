pub mod fixed_point;

pub use fixed_point::{accrued_fees, growth_increment};
