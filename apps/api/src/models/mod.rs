pub mod candidate;
pub mod evaluation;
pub mod job_description;
pub mod rubric;
pub mod user;
