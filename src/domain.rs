mod coupon;
mod email_address;
mod inquiry;
mod newsletter;
mod order;
mod person_name;
mod role;
mod slug;
mod visit;

pub use coupon::{normalize_code, round_cents, CouponError, CouponKind, CouponTerms, Discount};
pub use email_address::EmailAddress;
pub use inquiry::{ContactStatus, InquiryStatus};
pub use newsletter::JobStatus;
pub use order::{OrderNumber, OrderStatus, PaymentMethod};
pub use person_name::PersonName;
pub use role::Role;
pub use slug::Slug;
pub use visit::{blog_view_window, DayWindow, DeviceInfo, DeviceParser};
