pub mod connect;
pub mod index;
pub mod place;
pub mod recruit;
