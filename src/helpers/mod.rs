pub mod calendar;
pub mod harvest;
pub mod quota;
pub mod reconcile;
pub mod salary;
