pub mod user;
pub mod otp;
pub mod two_factor;
pub mod company;
pub mod service;
pub mod appointment;

pub use user::*;
pub use otp::*;
pub use two_factor::*;
pub use company::*;
pub use service::*;
pub use appointment::*;
