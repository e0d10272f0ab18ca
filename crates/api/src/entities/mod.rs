pub mod comment;
pub mod invitation;
pub mod membership;
pub mod project;
pub mod task;
pub mod user;
