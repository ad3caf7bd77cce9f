pub mod judge;
pub mod submission;
pub mod test_case;
