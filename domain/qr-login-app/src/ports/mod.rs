pub mod challenge;
pub mod clock;
pub mod credential;
pub mod identity;
