pub mod fragment;
pub mod notification;
