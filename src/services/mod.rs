pub mod admission;
pub mod audit_trail;
pub mod directory;
