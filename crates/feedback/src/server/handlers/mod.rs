pub mod feedback;
pub mod jobs;
pub mod status;
