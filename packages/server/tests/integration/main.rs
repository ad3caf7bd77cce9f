mod admin;
mod callback;
mod common;
mod judging;
mod submission;
mod test_case;
