pub mod gigs;
pub mod identity;
pub mod orders;
