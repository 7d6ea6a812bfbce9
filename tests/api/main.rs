mod admin;
mod content;
mod coupons;
mod health_check;
mod helpers;
mod newsletters;
mod orders;
mod subscribers;
mod tracking;
