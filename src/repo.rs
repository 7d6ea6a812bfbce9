mod analytics;
mod blogs;
mod catalog;
mod content;
mod coupons;
mod inquiries;
mod newsletter;
mod orders;
mod subscribers;
mod users;

pub use analytics::{AnalyticsRepo, AnalyticsTotals};
pub use blogs::BlogsRepo;
pub use catalog::{CategoriesRepo, ProductsRepo};
pub use content::ContentRepo;
pub use coupons::CouponsRepo;
pub use inquiries::{CateringRepo, ContactsRepo};
pub use newsletter::{NewsletterJobsRepo, NewsletterLogsRepo};
pub use orders::{OrderPricing, OrdersRepo};
pub use subscribers::SubscribersRepo;
pub use users::UsersRepo;
