pub mod holding;
pub mod normalize;
pub mod price;
pub mod realized;
pub mod report;
pub mod settings;
pub mod transaction;
