pub mod average;
pub mod convert;
pub mod inspect;
