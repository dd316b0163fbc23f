pub mod add_user;
pub mod login;
