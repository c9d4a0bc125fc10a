pub mod availability;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod slots;
pub mod totp;
pub mod whatsapp;

pub use availability::AvailabilityService;
pub use jwt::{JwtService, TokenKind};
pub use otp::{OtpCheck, OtpError, OtpService};
pub use password::PasswordService;
pub use slots::SlotService;
pub use totp::TotpService;
pub use whatsapp::{DeliveryError, MessageSender, WhatsAppService};
