/// Membership curve for one word: coverage histogram over the fixed axis,
/// then mode of maximum and spread.
pub mod histogram;
pub mod summary;
