mod checkout;
mod newsletter;
mod tracking;

pub use checkout::{
    apply_coupon, change_status, delete_order, load_order, place_order, CheckoutError, CouponQuote,
};
pub use newsletter::{process_next_job, DispatchError, DispatchOutcome, Mailer};
pub use tracking::{
    record_blog_view, record_visit, BlogViewOutcome, ClientInfo, TrackingError, VisitOutcome,
};
