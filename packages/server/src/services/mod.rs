pub mod admin;
pub mod submission;

pub use admin::AdminService;
pub use submission::SubmissionService;
