pub mod correlation_entry;
pub mod submission;
pub mod test_case;
