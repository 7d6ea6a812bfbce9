mod analytics;
mod blogs;
mod catalog;
mod content;
mod coupons;
mod inquiries;
mod newsletter;
mod orders;
mod users;

pub use analytics::{BlogView, BlogViewCount, DeviceCount, NewBlogView, NewVisitor, Visitor};
pub use blogs::{Blog, BlogInput};
pub use catalog::{Category, CategoryInput, Product, ProductInput};
pub use content::ContentSection;
pub use coupons::{Coupon, CouponInput};
pub use inquiries::{CateringInquiry, ContactRequest, NewCateringInquiry, NewContactRequest};
pub use newsletter::{JobLease, NewNewsletterJob, NewsletterJob, NewsletterLog, Subscriber};
pub use orders::{CustomerDetails, NewOrder, NewOrderItem, Order, OrderItem, OrderWithItems};
pub use users::{NewUser, User, UserCredentials};
