pub mod auth;
pub mod comments;
pub mod invitations;
pub mod memberships;
pub mod projects;
pub mod tasks;
pub mod users;
