pub mod connections;
pub mod players;
pub mod teams;
