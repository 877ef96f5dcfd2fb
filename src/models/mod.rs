pub mod harvest;
pub mod report;
